//! Signed HTTP client for the Duo Admin API.
//!
//! One [`DuoClient`] is built from the provider credentials and shared by all
//! resource operations. Each call signs the request (see [`sign`]), sends it
//! and decodes the JSON envelope regardless of the HTTP status: Duo reports
//! failures through `stat`/`message`, which the resources inspect.

pub mod envelope;
pub mod sign;

pub use self::envelope::ApiResult;
pub use self::sign::Params;

use crate::provider::{ProviderConfig, ProviderError};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE, DATE},
    Client, Method, StatusCode,
};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};
use url::Url;

/// Fixed timeout for every Admin API call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct DuoClient {
    http: Client,
    base_url: Url,
    host: String,
    integration_key: String,
    secret_key: SecretString,
}

/// Resolve `api_hostname` into the base URL and the host used in signatures.
///
/// A bare hostname (`api-xxxxxxxx.duosecurity.com`) is reached over HTTPS; a
/// full `http(s)://host[:port]` URL is used as given.
///
/// # Errors
/// Returns an error if the hostname cannot be parsed or has no host.
pub fn endpoint_base(api_hostname: &str) -> Result<(Url, String), ProviderError> {
    let invalid = |reason: String| ProviderError::InvalidHostname {
        hostname: api_hostname.to_string(),
        reason,
    };

    let trimmed = api_hostname.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("empty hostname".to_string()));
    }

    let raw = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;

    let host = url
        .host_str()
        .ok_or_else(|| invalid("no host specified".to_string()))?
        .to_lowercase();

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };

    debug!("Duo API base URL: {}", url);

    Ok((url, host))
}

impl DuoClient {
    /// # Errors
    /// Returns an error if the hostname is invalid or the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig, user_agent: &str) -> Result<Self, ProviderError> {
        let (base_url, host) = endpoint_base(&config.api_hostname)?;

        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            host,
            integration_key: config.integration_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Issue one signed request and return the raw status and body.
    ///
    /// # Errors
    /// Returns an error if signing or the HTTP round trip fails.
    pub async fn signed_call(
        &self,
        method: Method,
        path: &str,
        params: &Params,
    ) -> Result<(StatusCode, Vec<u8>), ProviderError> {
        let date = sign::rfc2822_date(chrono::Utc::now());
        let canon = sign::canonicalize(method.as_str(), &self.host, path, params, &date);
        let authorization = sign::authorization(&self.integration_key, &self.secret_key, &canon)?;
        let encoded_params = sign::canon_params(params);

        let mut url = self.base_url.clone();
        url.set_path(path);

        let request = if method == Method::POST || method == Method::PUT {
            self.http
                .request(method.clone(), url.clone())
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(encoded_params)
        } else {
            if !encoded_params.is_empty() {
                url.set_query(Some(&encoded_params));
            }
            self.http.request(method.clone(), url.clone())
        };

        let span = info_span!(
            "duo.signed_call",
            http.method = %method,
            url = %url
        );

        let response = request
            .header(DATE, date)
            .header(AUTHORIZATION, authorization)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        debug!("{} {} -> {}", method, path, status);

        Ok((status, body.to_vec()))
    }

    /// Issue one signed request and decode the JSON envelope.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not a Duo envelope.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &Params,
    ) -> Result<ApiResult<T>, ProviderError> {
        let (_, body) = self.signed_call(method, path, params).await?;

        Ok(serde_json::from_slice(&body)?)
    }
}
