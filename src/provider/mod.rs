//! Host boundary.
//!
//! [`Provider`] owns the configured [`DuoClient`] and exposes each lifecycle
//! operation over untyped JSON state. Desired state gets its schema defaults
//! and is validated before any remote call; the typed record is then handed
//! to the matching [`Resource`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lifecycle;
pub mod schema;

pub use self::{
    config::ProviderConfig,
    diagnostics::{Diagnostic, Severity},
    error::ProviderError,
    lifecycle::{Kind, LifecycleRequest, LifecycleResponse, Operation},
    schema::{Attribute, ProviderSchema, Schema},
};

use crate::{
    duo::DuoClient,
    resources::{
        group::{self, GroupResource},
        policy::{self, PolicyResource},
        user::{self, UserLookup, UserResource},
        user_group_association::{self, UserGroupAssociationResource},
        Model, Resource,
    },
    APP_USER_AGENT,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Resolve `$type_name` to a resource value bound to `$resource` and evaluate
/// `$body` with it. Unknown names produce an error response.
macro_rules! with_resource {
    ($type_name:expr, $resource:ident => $body:expr) => {
        match $type_name {
            user::TYPE_NAME => {
                let $resource = &UserResource;
                $body
            }
            group::TYPE_NAME => {
                let $resource = &GroupResource;
                $body
            }
            policy::TYPE_NAME => {
                let $resource = &PolicyResource;
                $body
            }
            user_group_association::TYPE_NAME => {
                let $resource = &UserGroupAssociationResource;
                $body
            }
            other => LifecycleResponse::from(ProviderError::UnknownType {
                kind: Kind::Resource.as_str(),
                type_name: other.to_string(),
            }),
        }
    };
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: DuoClient,
}

impl Provider {
    /// # Errors
    /// Returns an error if the API hostname is invalid or the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self::with_client(DuoClient::new(config, APP_USER_AGENT)?))
    }

    /// Build from a provider configuration block, with environment fallback.
    ///
    /// # Errors
    /// Returns an error if a credential is missing or the hostname is invalid.
    pub fn configure(config: &Value) -> Result<Self, ProviderError> {
        let config = ProviderConfig::from_value(config)?;
        info!("Configuring Duo provider for {}", config.api_hostname);
        Self::new(&config)
    }

    #[must_use]
    pub fn with_client(client: DuoClient) -> Self {
        Self { client }
    }

    /// Schema of the provider block, every resource and every data source.
    #[must_use]
    pub fn schema() -> ProviderSchema {
        let provider = Schema::new("Duo Security Admin API provider.")
            .attribute(
                config::ATTR_INTEGRATION_KEY,
                Attribute::optional_string(
                    "Admin API integration key. Defaults to `DUO_INTEGRATION_KEY`.",
                ),
            )
            .attribute(
                config::ATTR_SECRET_KEY,
                Attribute::optional_string("Admin API secret key. Defaults to `DUO_SECRET_KEY`.")
                    .sensitive(),
            )
            .attribute(
                config::ATTR_API_HOSTNAME,
                Attribute::optional_string("Admin API hostname. Defaults to `DUO_API_HOSTNAME`."),
            );

        let resources = BTreeMap::from([
            (user::TYPE_NAME, UserResource.schema()),
            (group::TYPE_NAME, GroupResource.schema()),
            (policy::TYPE_NAME, PolicyResource.schema()),
            (
                user_group_association::TYPE_NAME,
                UserGroupAssociationResource.schema(),
            ),
        ]);

        let data_sources = BTreeMap::from([(user::TYPE_NAME, user::data_source_schema())]);

        ProviderSchema {
            provider,
            resources,
            data_sources,
        }
    }

    /// Route one host request to the matching operation.
    #[instrument(skip(self, request), fields(kind = request.kind.as_str(), type_name = %request.type_name, operation = %request.operation))]
    pub async fn handle(&self, request: LifecycleRequest) -> LifecycleResponse {
        let LifecycleRequest {
            kind,
            type_name,
            operation,
            prior_state,
            planned_state,
            id,
        } = request;

        let response = match (kind, operation) {
            (Kind::DataSource, Operation::Read) => {
                self.read_data_source(&type_name, planned_state.unwrap_or(Value::Null))
                    .await
            }
            (Kind::DataSource, _) => LifecycleResponse::from(ProviderError::validation(
                "operation",
                format!("data sources only support read, got: {operation}"),
            )),
            (Kind::Resource, Operation::Create) => {
                self.create(&type_name, planned_state.unwrap_or(Value::Null))
                    .await
            }
            (Kind::Resource, Operation::Read) => {
                self.read(&type_name, prior_state.unwrap_or(Value::Null))
                    .await
            }
            (Kind::Resource, Operation::Update) => {
                self.update(
                    &type_name,
                    prior_state.unwrap_or(Value::Null),
                    planned_state.unwrap_or(Value::Null),
                )
                .await
            }
            (Kind::Resource, Operation::Delete) => {
                self.delete(&type_name, prior_state.unwrap_or(Value::Null))
                    .await
            }
            (Kind::Resource, Operation::Import) => match id {
                Some(id) => self.import(&type_name, &id).await,
                None => LifecycleResponse::from(ProviderError::validation(
                    "id",
                    "import requires an identifier",
                )),
            },
        };

        if response.has_errors() {
            debug!("{} {} finished with errors", operation, type_name);
        } else {
            info!("{} {} completed", operation, type_name);
        }

        response
    }

    pub async fn create(&self, type_name: &str, planned: Value) -> LifecycleResponse {
        with_resource!(type_name, resource => self.create_with(resource, planned).await)
    }

    pub async fn read(&self, type_name: &str, state: Value) -> LifecycleResponse {
        with_resource!(type_name, resource => self.read_with(resource, state).await)
    }

    pub async fn update(&self, type_name: &str, prior: Value, planned: Value) -> LifecycleResponse {
        with_resource!(type_name, resource => self.update_with(resource, prior, planned).await)
    }

    pub async fn delete(&self, type_name: &str, state: Value) -> LifecycleResponse {
        with_resource!(type_name, resource => self.delete_with(resource, state).await)
    }

    /// Adopt an existing remote object: a state holding only `id`, then Read.
    pub async fn import(&self, type_name: &str, id: &str) -> LifecycleResponse {
        with_resource!(type_name, resource => self.import_with(resource, id).await)
    }

    pub async fn read_data_source(&self, type_name: &str, config: Value) -> LifecycleResponse {
        if type_name != user::TYPE_NAME {
            return LifecycleResponse::from(ProviderError::UnknownType {
                kind: Kind::DataSource.as_str(),
                type_name: type_name.to_string(),
            });
        }

        let lookup: UserLookup = match desired(&user::data_source_schema(), config) {
            Ok(lookup) => lookup,
            Err(response) => return response,
        };

        match user::read_data_source(&self.client, &lookup).await {
            Ok(data) => encode(&data),
            Err(err) => LifecycleResponse::from(err),
        }
    }

    async fn create_with<R: Resource>(&self, resource: &R, planned: Value) -> LifecycleResponse {
        let plan: R::Model = match desired(&resource.schema(), planned) {
            Ok(plan) => plan,
            Err(response) => return response,
        };

        match resource.create(&self.client, &plan).await {
            Ok(Some(state)) => encode(&state),
            Ok(None) => LifecycleResponse::failed(vec![Diagnostic::error(format!(
                "{} was created but could not be read back",
                R::TYPE_NAME
            ))]),
            Err(err) => LifecycleResponse::from(err),
        }
    }

    async fn read_with<R: Resource>(&self, resource: &R, state: Value) -> LifecycleResponse {
        let state: R::Model = match recorded(&resource.schema(), state) {
            Ok(state) => state,
            Err(response) => return response,
        };

        match resource.read(&self.client, &state).await {
            Ok(Some(current)) => encode(&current),
            Ok(None) => gone(state),
            Err(err) => LifecycleResponse::from(err),
        }
    }

    async fn update_with<R: Resource>(
        &self,
        resource: &R,
        prior: Value,
        planned: Value,
    ) -> LifecycleResponse {
        let prior: R::Model = match recorded(&resource.schema(), prior) {
            Ok(prior) => prior,
            Err(response) => return response,
        };
        let plan: R::Model = match desired(&resource.schema(), planned) {
            Ok(plan) => plan,
            Err(response) => return response,
        };

        match resource.update(&self.client, &prior, &plan).await {
            Ok(Some(current)) => encode(&current),
            Ok(None) => gone(prior),
            Err(err) => LifecycleResponse::from(err),
        }
    }

    async fn delete_with<R: Resource>(&self, resource: &R, state: Value) -> LifecycleResponse {
        let state: R::Model = match recorded(&resource.schema(), state) {
            Ok(state) => state,
            Err(response) => return response,
        };

        match resource.delete(&self.client, &state).await {
            Ok(()) => LifecycleResponse::empty(),
            Err(err) => LifecycleResponse::from(err),
        }
    }

    async fn import_with<R: Resource>(&self, resource: &R, id: &str) -> LifecycleResponse {
        let mut state = R::Model::default();
        state.set_id(Some(id.to_string()));

        match resource.read(&self.client, &state).await {
            Ok(Some(current)) => encode(&current),
            Ok(None) => LifecycleResponse::failed(vec![Diagnostic::error(format!(
                "Cannot import non-existent remote object: {} {id}",
                R::TYPE_NAME
            ))]),
            Err(err) => LifecycleResponse::from(err),
        }
    }
}

/// Apply defaults, validate, then decode a desired-state document.
fn desired<M: serde::de::DeserializeOwned>(
    schema: &Schema,
    mut value: Value,
) -> Result<M, LifecycleResponse> {
    if value.is_null() {
        value = Value::Object(serde_json::Map::new());
    }
    schema.apply_defaults(&mut value);

    let diagnostics = schema.validate(&value);
    if diagnostics.iter().any(Diagnostic::is_error) {
        return Err(LifecycleResponse::failed(diagnostics));
    }

    serde_json::from_value(value).map_err(|err| LifecycleResponse::from(ProviderError::from(err)))
}

/// Decode a state document previously produced by this provider.
///
/// Declared defaults replace missing or null attributes; no validation runs.
fn recorded<M: Model>(schema: &Schema, mut value: Value) -> Result<M, LifecycleResponse> {
    schema.apply_defaults(&mut value);
    serde_json::from_value(value).map_err(|err| LifecycleResponse::from(ProviderError::from(err)))
}

fn encode<T: serde::Serialize>(state: &T) -> LifecycleResponse {
    match serde_json::to_value(state) {
        Ok(state) => LifecycleResponse::state(state),
        Err(err) => LifecycleResponse::from(ProviderError::from(err)),
    }
}

/// Prior state with a cleared identifier: the remote object no longer exists.
fn gone<M: Model>(mut state: M) -> LifecycleResponse {
    debug!("remote object not found, clearing identifier");
    state.set_id(None);
    encode(&state)
}
