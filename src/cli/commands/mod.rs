pub mod duo;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const CMD_SCHEMA: &str = "schema";
pub const CMD_LIFECYCLE: &str = "lifecycle";
pub const ARG_INPUT: &str = "input";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("terraform-provider-duo")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_SCHEMA)
                .about("Print the provider, resource and data source schema as JSON"),
        )
        .subcommand(
            Command::new(CMD_LIFECYCLE)
                .about("Run one lifecycle request (JSON) and print the response")
                .arg(
                    Arg::new(ARG_INPUT)
                        .short('i')
                        .long(ARG_INPUT)
                        .help("Request file, `-` reads stdin")
                        .default_value("-"),
                ),
        );

    let command = duo::with_args(command);
    logging::with_args(command)
}
