//! `duo_user_group_association` resource: membership of one user in one group.
//!
//! Duo has no identifier for a membership, so the state identifier is the
//! composite `"{group_id}-{user_id}"`. Read never calls Duo: it only splits
//! the identifier back into its two halves.

use super::{Model, Resource};
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
use std::{fmt, str::FromStr};
use tracing::{instrument, trace};

pub const TYPE_NAME: &str = "duo_user_group_association";

const SEPARATOR: char = '-';

/// Structured membership key.
///
/// Rendered as `"{group_id}-{user_id}"`. A `%` or `-` inside either half is
/// escaped as `%25` / `%2D`, so keys made of plain Duo IDs render exactly as
/// `"DG...-DU..."` and every key parses back unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssociationId {
    pub group_id: String,
    pub user_id: String,
}

impl AssociationId {
    #[must_use]
    pub fn new(group_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            user_id: user_id.into(),
        }
    }
}

fn escape(part: &str) -> String {
    part.replace('%', "%25").replace(SEPARATOR, "%2D")
}

fn unescape(id: &str, part: &str) -> Result<String, ProviderError> {
    let invalid = |reason| ProviderError::InvalidId {
        id: id.to_string(),
        reason,
    };

    let mut out = String::with_capacity(part.len());
    let mut rest = part;
    while let Some(index) = rest.find('%') {
        out.push_str(&rest[..index]);
        let escaped = rest.get(index..index + 3).unwrap_or_default();
        match escaped {
            "%25" => out.push('%'),
            "%2D" | "%2d" => out.push(SEPARATOR),
            _ => return Err(invalid("unknown escape sequence")),
        }
        rest = &rest[index + 3..];
    }
    out.push_str(rest);

    if out.is_empty() {
        return Err(invalid("expected non-empty group_id and user_id"));
    }

    Ok(out)
}

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}",
            escape(&self.group_id),
            escape(&self.user_id)
        )
    }
}

impl FromStr for AssociationId {
    type Err = ProviderError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let mut parts = id.split(SEPARATOR);
        let (Some(group_id), Some(user_id), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ProviderError::InvalidId {
                id: id.to_string(),
                reason: "expected <group_id>-<user_id>",
            });
        };

        Ok(Self {
            group_id: unescape(id, group_id)?,
            user_id: unescape(id, user_id)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupAssociation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl Model for UserGroupAssociation {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

impl UserGroupAssociation {
    #[must_use]
    pub fn key(&self) -> AssociationId {
        AssociationId::new(self.group_id.clone(), self.user_id.clone())
    }
}

impl From<AssociationId> for UserGroupAssociation {
    fn from(key: AssociationId) -> Self {
        Self {
            id: Some(key.to_string()),
            group_id: key.group_id,
            user_id: key.user_id,
        }
    }
}

fn memberships_path(user_id: &str) -> String {
    format!("/admin/v1/users/{user_id}/groups")
}

fn membership_path(key: &AssociationId) -> String {
    format!("/admin/v1/users/{}/groups/{}", key.user_id, key.group_id)
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the membership.
#[instrument(skip(client))]
pub async fn add_user_to_group(client: &DuoClient, key: &AssociationId) -> Result<(), ProviderError> {
    let mut params = Params::new();
    params.insert("group_id".to_string(), key.group_id.clone());

    let result = client
        .call::<serde_json::Value>(Method::POST, &memberships_path(&key.user_id), &params)
        .await?;

    if !result.is_ok() {
        let stat = result.stat.clone();
        return Err(result.into_error("add user to group", stat));
    }

    trace!("Successfully added user to group");

    Ok(())
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the removal.
#[instrument(skip(client))]
pub async fn remove_user_from_group(
    client: &DuoClient,
    key: &AssociationId,
) -> Result<(), ProviderError> {
    let result = client
        .call::<serde_json::Value>(Method::DELETE, &membership_path(key), &Params::new())
        .await?;

    if !result.is_ok() {
        return Err(result.into_error("remove user from group", key.group_id.clone()));
    }

    Ok(())
}

pub struct UserGroupAssociationResource;

#[async_trait]
impl Resource for UserGroupAssociationResource {
    type Model = UserGroupAssociation;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::new("Provides a Duo user group membership resource.")
            .attribute(
                "group_id",
                Attribute::required_string("The ID of the group to associate with the user.")
                    .force_new(),
            )
            .attribute(
                "user_id",
                Attribute::required_string("The ID of the user to associate with the group.")
                    .force_new(),
            )
    }

    async fn create(
        &self,
        client: &DuoClient,
        plan: &UserGroupAssociation,
    ) -> Result<Option<UserGroupAssociation>, ProviderError> {
        let key = plan.key();
        add_user_to_group(client, &key).await?;

        let mut state = plan.clone();
        state.set_id(Some(key.to_string()));

        self.read(client, &state).await
    }

    async fn read(
        &self,
        _client: &DuoClient,
        state: &UserGroupAssociation,
    ) -> Result<Option<UserGroupAssociation>, ProviderError> {
        let key: AssociationId = state.require_id(TYPE_NAME)?.parse()?;

        Ok(Some(UserGroupAssociation::from(key)))
    }

    async fn delete(
        &self,
        client: &DuoClient,
        state: &UserGroupAssociation,
    ) -> Result<(), ProviderError> {
        let key: AssociationId = state.require_id(TYPE_NAME)?.parse()?;

        remove_user_from_group(client, &key).await
    }
}
