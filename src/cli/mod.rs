//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod config;
mod logging;

pub use commands::{Session, api_resources, contexts, deps, topology};
pub use config::{ConfigSubcommand, handle_config_command};
pub use logging::init_logging;
