//! Configuration loading and layering
//!
//! Precedence order (highest to lowest):
//! 1. Environment variable overrides
//! 2. Config file
//! 3. Built-in defaults

use std::path::Path;

use anyhow::{Context, Result};

use super::paths;
use super::schema::Config;

pub const REQUEST_TIMEOUT_ENV: &str = "KUBEPLORER_REQUEST_TIMEOUT_SECS";
pub const GITOPS_NAMESPACE_ENV: &str = "KUBEPLORER_GITOPS_NAMESPACE";
pub const READINESS_WAIT_ENV: &str = "KUBEPLORER_READINESS_WAIT_SECS";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the root config file (if any) with environment overrides applied
    pub fn load() -> Result<Config> {
        Self::load_from(&paths::root_config_path())
    }

    /// Like [`ConfigLoader::load`] but reading `path`; a missing file means
    /// defaults
    pub fn load_from(path: &Path) -> Result<Config> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load `path` with overrides looked up through `var`, then check the
    /// effective values
    pub fn load_with<F>(path: &Path, var: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = if path.exists() {
            Self::load_file(path)?
        } else {
            Config::default()
        };
        let config = Self::apply_overrides(config, var);
        Self::check(&config)
            .with_context(|| format!("Invalid configuration: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Strict validation of the config file at `path`
    ///
    /// Fails on YAML syntax errors, unknown keys, wrong value types and
    /// values the resolver cannot work with.
    pub fn validate(path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        Self::check(&Self::load_file(path)?)
    }

    /// Reject values the resolver cannot work with
    fn check(config: &Config) -> Result<()> {
        if config.request_timeout_secs == 0 {
            anyhow::bail!("requestTimeoutSecs must be greater than 0");
        }
        if config.topology.gitops_namespace.is_empty() {
            anyhow::bail!("topology.gitopsNamespace must not be empty");
        }
        if !(1..=2).contains(&config.descendants.max_depth) {
            anyhow::bail!(
                "descendants.maxDepth must be 1 or 2, got {}",
                config.descendants.max_depth
            );
        }
        Ok(())
    }

    /// Apply overrides looked up through `var`; unparseable numbers are
    /// ignored
    pub fn apply_overrides<F>(mut config: Config, var: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = var(REQUEST_TIMEOUT_ENV).and_then(|v| v.parse().ok()) {
            config.request_timeout_secs = secs;
        }

        if let Some(namespace) = var(GITOPS_NAMESPACE_ENV).filter(|v| !v.is_empty()) {
            config.topology.gitops_namespace = namespace;
        }

        if let Some(secs) = var(READINESS_WAIT_ENV).and_then(|v| v.parse().ok()) {
            config.topology.readiness_wait_secs = secs;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigLoader::apply_overrides(
            Config::default(),
            env(&[
                (REQUEST_TIMEOUT_ENV, "12"),
                (GITOPS_NAMESPACE_ENV, "gitops"),
                (READINESS_WAIT_ENV, "not-a-number"),
            ]),
        );

        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.topology.gitops_namespace, "gitops");
        assert_eq!(config.topology.readiness_wait_secs, 35);
    }

    #[test]
    fn test_missing_file_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = ConfigLoader::load_file(&path);
        assert!(config.is_err());
        assert!(ConfigLoader::validate(&path).is_ok());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "requestTimeoutSecs: 5\ntopology:\n  eagerBuild: false").unwrap();

        let config = ConfigLoader::load_file(file.path()).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert!(!config.topology.eager_build);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "descendants:\n  maxDepth: 3").unwrap();
        let err = ConfigLoader::validate(file.path()).unwrap_err();
        assert!(err.to_string().contains("maxDepth"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "requestTimeoutSecs: [1]").unwrap();
        assert!(ConfigLoader::validate(file.path()).is_err());
    }

    #[test]
    fn test_load_rejects_bad_effective_values() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.yaml");
        let err = ConfigLoader::load_with(&missing, env(&[(REQUEST_TIMEOUT_ENV, "0")])).unwrap_err();
        assert!(format!("{:#}", err).contains("requestTimeoutSecs"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "descendants:\n  maxDepth: 0").unwrap();
        let err = ConfigLoader::load_with(file.path(), env(&[])).unwrap_err();
        assert!(format!("{:#}", err).contains("maxDepth"));

        let config = ConfigLoader::load_with(&missing, env(&[(REQUEST_TIMEOUT_ENV, "7")])).unwrap();
        assert_eq!(config.request_timeout_secs, 7);
    }
}
