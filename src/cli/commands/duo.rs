use crate::provider::config::{ENV_API_HOSTNAME, ENV_INTEGRATION_KEY, ENV_SECRET_KEY};
use clap::{Arg, Command};

pub const ARG_INTEGRATION_KEY: &str = "integration-key";
pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_API_HOSTNAME: &str = "api-hostname";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_INTEGRATION_KEY)
                .long(ARG_INTEGRATION_KEY)
                .help("Admin API integration key")
                .env(ENV_INTEGRATION_KEY)
                .global(true),
        )
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Admin API secret key")
                .env(ENV_SECRET_KEY)
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_API_HOSTNAME)
                .long(ARG_API_HOSTNAME)
                .help("Admin API hostname (api-xxxxxxxx.duosecurity.com)")
                .env(ENV_API_HOSTNAME)
                .global(true),
        )
}
