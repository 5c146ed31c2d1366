//! Resource implementations.
//!
//! Each resource is a typed record plus a [`Resource`] implementation that
//! maps its lifecycle onto Admin API calls through an injected [`DuoClient`].

pub mod group;
pub mod policy;
pub mod user;
pub mod user_group_association;

use crate::{
    duo::{DuoClient, Params},
    provider::{schema::Schema, ProviderError},
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Typed state record with a host-visible identifier.
pub trait Model: Serialize + DeserializeOwned + Default + Clone + Send + Sync {
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: Option<String>);

    /// Identifier or an error naming the resource type.
    ///
    /// # Errors
    /// Returns an error if the record has no identifier.
    fn require_id(&self, type_name: &'static str) -> Result<&str, ProviderError> {
        self.id()
            .filter(|id| !id.is_empty())
            .ok_or(ProviderError::MissingId { type_name })
    }
}

/// Lifecycle of one resource type.
///
/// `create`, `read` and `update` return `None` when the remote object is gone,
/// which tells the host to drop the resource from state.
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Model;

    const TYPE_NAME: &'static str;

    fn schema(&self) -> Schema;

    async fn create(
        &self,
        client: &DuoClient,
        plan: &Self::Model,
    ) -> Result<Option<Self::Model>, ProviderError>;

    async fn read(
        &self,
        client: &DuoClient,
        state: &Self::Model,
    ) -> Result<Option<Self::Model>, ProviderError>;

    async fn update(
        &self,
        _client: &DuoClient,
        _prior: &Self::Model,
        _plan: &Self::Model,
    ) -> Result<Option<Self::Model>, ProviderError> {
        Err(ProviderError::ReplaceRequired {
            type_name: Self::TYPE_NAME,
        })
    }

    async fn delete(&self, client: &DuoClient, state: &Self::Model) -> Result<(), ProviderError>;
}

/// Empty strings are how the host and Duo both spell "unset".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

pub(crate) fn set_if_present(params: &mut Params, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        params.insert(key.to_string(), value.to_string());
    }
}

/// Add `key` when the planned value differs from the prior one.
///
/// An attribute that became unset is sent as an empty string.
pub(crate) fn set_if_changed(
    params: &mut Params,
    key: &str,
    prior: Option<&str>,
    plan: Option<&str>,
) {
    let prior = prior.unwrap_or_default();
    let plan = plan.unwrap_or_default();
    if prior != plan {
        params.insert(key.to_string(), plan.to_string());
    }
}
