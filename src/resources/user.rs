//! `duo_user` resource and data source, backed by `/admin/v1/users`.

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

pub const TYPE_NAME: &str = "duo_user";

const USERS_PATH: &str = "/admin/v1/users";

/// Accepted user statuses. Lowercase, unlike group statuses.
pub const USER_STATUSES: &[&str] = &["active", "bypass", "disabled"];
pub const DEFAULT_USER_STATUS: &str = "active";

fn default_status() -> String {
    DEFAULT_USER_STATUS.to_string()
}

/// Desired/actual state of a Duo user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            username: String::new(),
            realname: None,
            email: None,
            status: default_status(),
            notes: None,
            firstname: None,
            lastname: None,
        }
    }
}

impl Model for User {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }
}

/// User object as returned by the Admin API (only the fields we manage).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuoUser {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub realname: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl From<DuoUser> for User {
    fn from(user: DuoUser) -> Self {
        Self {
            id: Some(user.user_id),
            username: user.username,
            realname: non_empty(user.realname),
            email: non_empty(user.email),
            status: non_empty(user.status).unwrap_or_else(default_status),
            notes: non_empty(user.notes),
            firstname: non_empty(user.firstname),
            lastname: non_empty(user.lastname),
        }
    }
}

impl User {
    /// Parameters for `POST /admin/v1/users`: `username` plus every optional field that is set.
    #[must_use]
    pub fn create_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("username".to_string(), self.username.clone());
        set_if_present(&mut params, "realname", self.realname.as_deref());
        set_if_present(&mut params, "email", self.email.as_deref());
        set_if_present(&mut params, "status", Some(self.status.as_str()));
        set_if_present(&mut params, "notes", self.notes.as_deref());
        set_if_present(&mut params, "firstname", self.firstname.as_deref());
        set_if_present(&mut params, "lastname", self.lastname.as_deref());
        params
    }

    /// Parameters for `POST /admin/v1/users/{id}`: only the fields that changed.
    #[must_use]
    pub fn update_params(&self, prior: &Self) -> Params {
        let mut params = Params::new();
        set_if_changed(
            &mut params,
            "username",
            Some(prior.username.as_str()),
            Some(self.username.as_str()),
        );
        set_if_changed(&mut params, "realname", prior.realname.as_deref(), self.realname.as_deref());
        set_if_changed(&mut params, "email", prior.email.as_deref(), self.email.as_deref());
        set_if_changed(
            &mut params,
            "status",
            Some(prior.status.as_str()),
            Some(self.status.as_str()),
        );
        set_if_changed(&mut params, "notes", prior.notes.as_deref(), self.notes.as_deref());
        set_if_changed(
            &mut params,
            "firstname",
            prior.firstname.as_deref(),
            self.firstname.as_deref(),
        );
        set_if_changed(&mut params, "lastname", prior.lastname.as_deref(), self.lastname.as_deref());
        params
    }
}

fn user_path(user_id: &str) -> String {
    format!("{USERS_PATH}/{user_id}")
}

/// Create a user and return the identifier Duo assigned.
///
/// # Errors
/// Returns an error if the call fails or Duo rejects the user.
#[instrument(skip(client, plan), fields(username = %plan.username))]
pub async fn create_user(client: &DuoClient, plan: &User) -> Result<String, ProviderError> {
    let result = client
        .call::<DuoUser>(Method::POST, USERS_PATH, &plan.create_params())
        .await?;

    if !result.is_ok() {
        let stat = result.stat.clone();
        return Err(result.into_error("create user", stat));
    }

    let user = result.into_response()?;
    trace!("Successfully created user {}", user.user_id);

    Ok(user.user_id)
}

/// Fetch a user; `None` when Duo reports `Resource not found`.
///
/// # Errors
/// Returns an error if the call fails or Duo reports any other failure.
#[instrument(skip(client))]
pub async fn get_user(client: &DuoClient, user_id: &str) -> Result<Option<User>, ProviderError> {
    let result = client
        .call::<DuoUser>(Method::GET, &user_path(user_id), &Params::new())
        .await?;

    if result.is_not_found() {
        debug!("user {} not found", user_id);
        return Ok(None);
    }

    if !result.is_ok() {
        let stat = result.stat.clone();
        return Err(result.into_error("read user", stat));
    }

    Ok(Some(User::from(result.into_response()?)))
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the update.
#[instrument(skip(client, params))]
pub async fn update_user(
    client: &DuoClient,
    user_id: &str,
    params: &Params,
) -> Result<(), ProviderError> {
    let result = client
        .call::<serde_json::Value>(Method::POST, &user_path(user_id), params)
        .await?;

    if !result.is_ok() {
        return Err(result.into_error("update user", user_id));
    }

    Ok(())
}

/// # Errors
/// Returns an error if the call fails or Duo rejects the deletion.
#[instrument(skip(client))]
pub async fn delete_user(client: &DuoClient, user_id: &str) -> Result<(), ProviderError> {
    let result = client
        .call::<serde_json::Value>(Method::DELETE, &user_path(user_id), &Params::new())
        .await?;

    if !result.is_ok() {
        return Err(result.into_error("delete user", user_id));
    }

    Ok(())
}

pub struct UserResource;

#[async_trait]
impl Resource for UserResource {
    type Model = User;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::new("Provides a Duo User resource.")
            .attribute(
                "username",
                Attribute::required_string("The name of the user to create."),
            )
            .attribute(
                "realname",
                Attribute::optional_string("The real name (or full name) of this user."),
            )
            .attribute(
                "email",
                Attribute::optional_string("The email address of this user."),
            )
            .attribute(
                "status",
                Attribute::optional_string(
                    "The user's status. Must be one of: `active` `bypass` `disabled`.",
                )
                .with_default(DEFAULT_USER_STATUS)
                .one_of(USER_STATUSES),
            )
            .attribute(
                "notes",
                Attribute::optional_string(
                    "An optional description or notes field. Can be viewed in the Duo Admin Panel.",
                ),
            )
            .attribute(
                "firstname",
                Attribute::optional_string("The user's given name."),
            )
            .attribute("lastname", Attribute::optional_string("The user's surname."))
    }

    async fn create(&self, client: &DuoClient, plan: &User) -> Result<Option<User>, ProviderError> {
        let user_id = create_user(client, plan).await?;
        get_user(client, &user_id).await
    }

    async fn read(&self, client: &DuoClient, state: &User) -> Result<Option<User>, ProviderError> {
        get_user(client, state.require_id(TYPE_NAME)?).await
    }

    async fn update(
        &self,
        client: &DuoClient,
        prior: &User,
        plan: &User,
    ) -> Result<Option<User>, ProviderError> {
        let user_id = prior.require_id(TYPE_NAME)?;
        let params = plan.update_params(prior);

        if params.is_empty() {
            debug!("user {} has no changes to send", user_id);
        } else {
            update_user(client, user_id, &params).await?;
        }

        get_user(client, user_id).await
    }

    async fn delete(&self, client: &DuoClient, state: &User) -> Result<(), ProviderError> {
        delete_user(client, state.require_id(TYPE_NAME)?).await
    }
}

/// Input of the `duo_user` data source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLookup {
    pub user_id: String,
}

/// State of the `duo_user` data source: the lookup key plus every user field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub user_id: String,
    #[serde(flatten)]
    pub user: User,
}

#[must_use]
pub fn data_source_schema() -> Schema {
    Schema::new("Provides details about a specific Duo User.")
        .attribute(
            "user_id",
            Attribute::required_string("The ID of the user to retrieve."),
        )
        .attribute(
            "username",
            Attribute::computed_string("The name of the user to retrieve."),
        )
        .attribute(
            "realname",
            Attribute::computed_string("The real name (or full name) of this user."),
        )
        .attribute(
            "email",
            Attribute::computed_string("The email address of this user."),
        )
        .attribute(
            "status",
            Attribute::computed_string(
                "The user's status. Must be one of: `active` `bypass` `disabled`.",
            ),
        )
        .attribute(
            "notes",
            Attribute::computed_string(
                "An optional description or notes field. Can be viewed in the Duo Admin Panel.",
            ),
        )
        .attribute(
            "firstname",
            Attribute::computed_string("The user's given name."),
        )
        .attribute("lastname", Attribute::computed_string("The user's surname."))
}

/// Read the `duo_user` data source. Unlike the resource, a missing user is an error.
///
/// # Errors
/// Returns an error if the call fails or the user does not exist.
pub async fn read_data_source(
    client: &DuoClient,
    lookup: &UserLookup,
) -> Result<UserData, ProviderError> {
    let user = get_user(client, &lookup.user_id)
        .await?
        .ok_or_else(|| ProviderError::Remote {
            operation: "read user",
            subject: "FAIL".to_string(),
            message: "Resource not found".to_string(),
        })?;

    Ok(UserData {
        user_id: lookup.user_id.clone(),
        user,
    })
}
