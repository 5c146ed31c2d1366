//! `duo_policy` resource.
//!
//! Only creation reaches Duo: `name` and `new_user_policy` are sent to
//! `POST /policies`. Every other setting is declared and kept in state but
//! never transmitted. Read returns state unchanged; update and delete log a
//! warning and leave the remote policy alone.

use super::{non_empty, set_if_present, Model, Resource};
use crate::{
    duo::{DuoClient, Params},
    provider::{
        schema::{Attribute, Schema},
        ProviderError,
    },
};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, trace, warn};

pub const TYPE_NAME: &str = "duo_policy";

const POLICIES_PATH: &str = "/policies";

/// Wire name of `new_user_policy` on create.
const NEW_USER_POLICY_PARAM: &str = "new-user-policy-activated";

macro_rules! policy_settings {
    ($($field:ident),+ $(,)?) => {
        /// Policy settings besides `name` and `new_user_policy`.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct PolicySettings {
            $(
                #[serde(default)]
                pub $field: Option<String>,
            )+
        }

        impl PolicySettings {
            pub const NAMES: &'static [&'static str] = &[$(stringify!($field)),+];

            fn declare(schema: Schema) -> Schema {
                schema
                    $(.attribute(
                        stringify!($field),
                        Attribute::optional_string(stringify!($field)),
                    ))+
            }
        }
    };
}

policy_settings!(
    enroll_policy,
    auth_status_activated,
    auth_status,
    user_locations_activated,
    user_locations_default_action,
    endpoint_health_activated,
    endpoint_health_policy_macos,
    endpoint_health_enroll_policy_macos,
    endpoint_health_policy_windows,
    endpoint_health_enroll_policy_windows,
    trusted_sessions_activated,
    trusted_devices_activated,
    platforms_activated,
    android_allowed,
    android_warn_policy_version,
    android_block_policy_version,
    blackberry_allowed,
    chrome_os_allowed,
    ios_allowed,
    ios_warn_policy_version,
    ios_block_policy_version,
    linux_allowed,
    macos_allowed,
    macos_warn_policy_version,
    macos_block_policy_version,
    windows_allowed,
    windows_warn_policy_version,
    windows_block_policy_version,
    windows_phone_allowed,
    other_os_allowed,
    browsers_activated,
    plugins_activated,
    flash_remediation,
    java_remediation,
    networks_activated,
    networks_allow,
    networks_2fa,
    anonymous_ip_policy,
    anonymous_ip_policy_activated,
    risk_based_factor_selection_activated,
    auth_methods_activated,
    allow_factor_push,
    allow_factor_mobile_otp,
    allow_factor_sms,
    allow_factor_web_auth,
    web_auth_policies,
    allow_factor_hard_token,
    duo_mobile_app_activated,
    require_updated_duo_mobile,
    mobile_rooted_devices_activated,
    allow_rooted_devices,
    mobile_lock_activated,
    require_lock,
    mobile_encryption_activated,
    require_encryption,
    mobile_touch_id_activated,
    require_touch_id,
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub new_user_policy: Option<String>,
    #[serde(flatten)]
    pub settings: PolicySettings,
}

impl Model for Policy {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

impl Policy {
    #[must_use]
    pub fn create_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("name".to_string(), self.name.clone());
        set_if_present(
            &mut params,
            NEW_USER_POLICY_PARAM,
            self.new_user_policy.as_deref(),
        );
        params
    }
}

/// Create a policy and return its identifier.
///
/// Duo answers with a string payload; when it is empty the policy name is
/// used as the identifier.
///
/// # Errors
/// Returns an error if the call fails or Duo rejects the policy.
#[instrument(skip(client, plan), fields(name = %plan.name))]
pub async fn create_policy(client: &DuoClient, plan: &Policy) -> Result<String, ProviderError> {
    let result = client
        .call::<Value>(Method::POST, POLICIES_PATH, &plan.create_params())
        .await?;

    if !result.is_ok() {
        let stat = result.stat.clone();
        return Err(result.into_error("create policy", stat));
    }

    let policy_id = result
        .response
        .and_then(|response| match response {
            Value::String(id) => non_empty(Some(id)),
            _ => None,
        })
        .unwrap_or_else(|| plan.name.clone());

    trace!("Successfully created policy {}", policy_id);

    Ok(policy_id)
}

pub struct PolicyResource;

#[async_trait]
impl Resource for PolicyResource {
    type Model = Policy;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        PolicySettings::declare(
            Schema::new("Provides a Duo Policy resource.")
                .attribute("name", Attribute::required_string("The name of the policy."))
                .attribute(
                    "new_user_policy",
                    Attribute::optional_string("Enable policy for new users."),
                ),
        )
    }

    async fn create(&self, client: &DuoClient, plan: &Policy) -> Result<Option<Policy>, ProviderError> {
        let mut state = plan.clone();
        state.set_id(Some(create_policy(client, plan).await?));

        self.read(client, &state).await
    }

    async fn read(&self, _client: &DuoClient, state: &Policy) -> Result<Option<Policy>, ProviderError> {
        state.require_id(TYPE_NAME)?;

        Ok(Some(state.clone()))
    }

    async fn update(
        &self,
        _client: &DuoClient,
        prior: &Policy,
        plan: &Policy,
    ) -> Result<Option<Policy>, ProviderError> {
        let policy_id = prior.require_id(TYPE_NAME)?;
        warn!(
            "policy {} updated in state only, Duo policies cannot be modified by this provider",
            policy_id
        );

        let mut state = plan.clone();
        state.set_id(Some(policy_id.to_string()));

        Ok(Some(state))
    }

    async fn delete(&self, _client: &DuoClient, state: &Policy) -> Result<(), ProviderError> {
        let policy_id = state.require_id(TYPE_NAME)?;
        warn!(
            "policy {} removed from state only, Duo policies cannot be deleted by this provider",
            policy_id
        );

        Ok(())
    }
}
