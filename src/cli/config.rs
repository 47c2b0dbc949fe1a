//! `kubeplorer config ...`

use anyhow::{Context, Result};
use clap::Subcommand;

use kubeplorer::config::{self, ConfigLoader, paths};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get a configuration value, or the whole effective config
    Get {
        /// Configuration key (e.g., "requestTimeoutSecs", "topology.gitopsNamespace")
        key: Option<String>,
    },
    /// List all configuration keys with their effective values
    List,
    /// Show configuration file path
    Path,
    /// Validate the configuration file
    Validate,
}

/// Handle configuration subcommands
pub fn handle_config_command(cmd: &ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;
            if let Some(key) = key {
                println!("{}", config::get_config_value(&config, key)?);
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::List => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;
            for key in config::KEYS {
                println!("{} = {}", key, config::get_config_value(&config, key)?);
            }
        }
        ConfigSubcommand::Path => {
            println!("{}", paths::root_config_path().display());
        }
        ConfigSubcommand::Validate => {
            let path = paths::root_config_path();
            ConfigLoader::validate(&path)
                .with_context(|| format!("Configuration validation failed: {}", path.display()))?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
