//! # Duo Security provider
//!
//! `terraform_provider_duo` reconciles Duo Security entities (users, groups,
//! policies and user-group memberships) by turning host lifecycle calls into
//! signed requests against the Duo Admin API.
//!
//! ## Layout
//!
//! - [`duo`]: signed HTTP client for the Admin API (`Date` + HMAC `Authorization`).
//! - [`resources`]: one typed record per entity and its create/read/update/delete mapping.
//! - [`provider`]: configuration, schema declaration, validation and the JSON host boundary.
//! - [`cli`]: the `terraform-provider-duo` binary (schema dump and one-shot lifecycle calls).
//!
//! ## Identifiers
//!
//! Users, groups and policies carry the identifier assigned by Duo. Group
//! memberships have no remote identifier, so the provider synthesizes
//! `"{group_id}-{user_id}"` (see [`resources::user_group_association::AssociationId`]).

pub mod cli;
pub mod duo;
pub mod provider;
pub mod resources;

pub use provider::{Diagnostic, Provider, ProviderConfig, ProviderError, Severity};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
