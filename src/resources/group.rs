//! `duo_group` resource, backed by `/admin/v1/groups`.
//!
//! Group statuses are capitalized (`Active`, `Bypass`, `Disabled`) while user
//! statuses are lowercase. Both sets are validated exactly as declared.

use super::{non_empty, set_if_changed, set_if_present, Model, Resource};
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
use tracing::{debug, instrument, trace};

pub const TYPE_NAME: &str = "duo_group";

const GROUPS_PATH: &str = "/admin/v1/groups";

pub const GROUP_STATUSES: &[&str] = &["Active", "Bypass", "Disabled"];
pub const DEFAULT_GROUP_STATUS: &str = "Active";

fn default_status() -> String {
    DEFAULT_GROUP_STATUS.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            desc: None,
            status: default_status(),
        }
    }
}

impl Model for Group {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuoGroup {
    pub group_id: String,
    #[serde(default)]
    pub name: String,
    pub desc: Option<String>,
    pub status: Option<String>,
}

impl From<DuoGroup> for Group {
    fn from(group: DuoGroup) -> Self {
        Self {
            id: Some(group.group_id),
            name: group.name,
            desc: non_empty(group.desc),
            status: non_empty(group.status).unwrap_or_else(default_status),
        }
    }
}

impl Group {
    #[must_use]
    pub fn create_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("name".to_string(), self.name.clone());
        set_if_present(&mut params, "desc", self.desc.as_deref());
        set_if_present(&mut params, "status", Some(self.status.as_str()));
        params
    }

    #[must_use]
    pub fn update_params(&self, prior: &Self) -> Params {
        let mut params = Params::new();
        set_if_changed(
            &mut params,
            "name",
            Some(prior.name.as_str()),
            Some(self.name.as_str()),
        );
        set_if_changed(&mut params, "desc", prior.desc.as_deref(), self.desc.as_deref());
        set_if_changed(
            &mut params,
            "status",
            Some(prior.status.as_str()),
            Some(self.status.as_str()),
        );
        params
    }
}

fn group_path(group_id: &str) -> String {
    format!("{GROUPS_PATH}/{group_id}")
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the group.
#[instrument(skip(client, plan), fields(name = %plan.name))]
pub async fn create_group(client: &DuoClient, plan: &Group) -> Result<String, ProviderError> {
    let result = client
        .call::<DuoGroup>(Method::POST, GROUPS_PATH, &plan.create_params())
        .await?;

    if !result.is_ok() {
        let stat = result.stat.clone();
        return Err(result.into_error("create group", stat));
    }

    let group = result.into_response()?;
    trace!("Successfully created group {}", group.group_id);

    Ok(group.group_id)
}

/// Fetch a group; `None` when Duo reports `Resource not found`.
///
/// # Errors
/// Returns an error if the call fails or Duo reports any other failure.
#[instrument(skip(client))]
pub async fn get_group(client: &DuoClient, group_id: &str) -> Result<Option<Group>, ProviderError> {
    let result = client
        .call::<DuoGroup>(Method::GET, &group_path(group_id), &Params::new())
        .await?;

    if result.is_not_found() {
        debug!("group {} not found", group_id);
        return Ok(None);
    }

    if !result.is_ok() {
        let stat = result.stat.clone();
        return Err(result.into_error("read group", stat));
    }

    Ok(Some(Group::from(result.into_response()?)))
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the update.
#[instrument(skip(client, params))]
pub async fn update_group(
    client: &DuoClient,
    group_id: &str,
    params: &Params,
) -> Result<(), ProviderError> {
    let result = client
        .call::<serde_json::Value>(Method::POST, &group_path(group_id), params)
        .await?;

    if !result.is_ok() {
        return Err(result.into_error("update group", group_id));
    }

    Ok(())
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the deletion.
#[instrument(skip(client))]
pub async fn delete_group(client: &DuoClient, group_id: &str) -> Result<(), ProviderError> {
    let result = client
        .call::<serde_json::Value>(Method::DELETE, &group_path(group_id), &Params::new())
        .await?;

    if !result.is_ok() {
        return Err(result.into_error("delete group", group_id));
    }

    Ok(())
}

pub struct GroupResource;

#[async_trait]
impl Resource for GroupResource {
    type Model = Group;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::new("Provides a Duo Group resource.")
            .attribute("name", Attribute::required_string("The name of the group."))
            .attribute(
                "desc",
                Attribute::optional_string("The description of the group."),
            )
            .attribute(
                "status",
                Attribute::optional_string(
                    "The authentication status of the group. Must be one of: `Active` `Bypass` `Disabled`.",
                )
                .with_default(DEFAULT_GROUP_STATUS)
                .one_of(GROUP_STATUSES),
            )
    }

    async fn create(&self, client: &DuoClient, plan: &Group) -> Result<Option<Group>, ProviderError> {
        let group_id = create_group(client, plan).await?;
        get_group(client, &group_id).await
    }

    async fn read(&self, client: &DuoClient, state: &Group) -> Result<Option<Group>, ProviderError> {
        get_group(client, state.require_id(TYPE_NAME)?).await
    }

    async fn update(
        &self,
        client: &DuoClient,
        prior: &Group,
        plan: &Group,
    ) -> Result<Option<Group>, ProviderError> {
        let group_id = prior.require_id(TYPE_NAME)?;
        let params = plan.update_params(prior);

        if params.is_empty() {
            debug!("group {} has no changes to send", group_id);
        } else {
            update_group(client, group_id, &params).await?;
        }

        get_group(client, group_id).await
    }

    async fn delete(&self, client: &DuoClient, state: &Group) -> Result<(), ProviderError> {
        delete_group(client, state.require_id(TYPE_NAME)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_is_case_sensitive() {
        let schema = GroupResource.schema();
        for status in GROUP_STATUSES {
            assert!(schema
                .validate(&json!({"name": "ops", "status": status}))
                .is_empty());
        }
        for status in ["active", "bypass", "disabled", "ACTIVE"] {
            assert_eq!(
                schema
                    .validate(&json!({"name": "ops", "status": status}))
                    .len(),
                1,
                "{status} should be rejected"
            );
        }
    }

    #[test]
    fn default_status_is_capitalized() -> Result<(), serde_json::Error> {
        let group: Group = serde_json::from_value(json!({"name": "ops"}))?;
        assert_eq!(group.status, "Active");
        Ok(())
    }

    #[test]
    fn update_params_only_changed_fields() {
        let prior = Group {
            id: Some("DG1".to_string()),
            name: "ops".to_string(),
            desc: Some("operators".to_string()),
            status: "Active".to_string(),
        };
        let plan = Group {
            status: "Bypass".to_string(),
            ..prior.clone()
        };
        let params = plan.update_params(&prior);
        let keys: Vec<_> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["status"]);
    }

    #[test]
    fn create_params_always_send_name() {
        let params = Group {
            name: "ops".to_string(),
            ..Group::default()
        }
        .create_params();
        assert_eq!(params.get("name").map(String::as_str), Some("ops"));
        assert_eq!(params.get("status").map(String::as_str), Some("Active"));
        assert!(!params.contains_key("desc"));
    }
}
