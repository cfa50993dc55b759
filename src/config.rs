//! Configuration file: collector settings and declared sources.
//!
//! Loaded from `~/.config/sumo-source/config.toml` unless `--config` says
//! otherwise.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sumokit::{
    ClientConfig, Credentials, DEFAULT_ENDPOINT, DEFAULT_QUERY_LIMIT, DEFAULT_TIMEOUT, Intent,
    ReconcileOptions, SourceDefinition, SourceResource,
};

use crate::runner;

/// Environment variable holding the API access id.
pub const ACCESS_ID_ENV: &str = "SUMO_ACCESS_ID";
/// Environment variable holding the API access key.
pub const ACCESS_KEY_ENV: &str = "SUMO_ACCESS_KEY";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("sumo-source"))
}

/// Resolve the config file path, expanding `~` in an explicit one
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            let raw = path.to_string_lossy();
            let expanded = shellexpand::tilde(&raw);
            Ok(PathBuf::from(expanded.as_ref()))
        }
        None => Ok(config_dir()?.join("config.toml")),
    }
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sumologic: SumologicConfig,

    /// Declared sources, applied in this order
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SumologicConfig {
    /// Skip reconciliation entirely
    #[serde(default)]
    pub disabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Seconds before an API call is abandoned
    #[serde(default = "default_api_timeout")]
    pub api_timeout: u64,

    /// Collectors requested when looking ours up by name
    #[serde(default = "default_query_limit")]
    pub collector_query_limit: u32,

    /// Collector name (default: this host's name)
    #[serde(default)]
    pub collector: Option<String>,

    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Default for SumologicConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            endpoint: default_endpoint(),
            api_timeout: default_api_timeout(),
            collector_query_limit: default_query_limit(),
            collector: None,
            credentials: CredentialsConfig::default(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_query_limit() -> u32 {
    DEFAULT_QUERY_LIMIT
}

#[derive(Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub access_id: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_id", &self.access_id)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A `[[sources]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(flatten)]
    pub definition: SourceDefinition,

    /// "create" (default) or "delete"
    #[serde(default)]
    pub action: Intent,
}

impl Config {
    /// Load and validate the config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} with {} sources",
            path.display(),
            config.sources.len()
        );
        Ok(config)
    }

    /// Parse and validate TOML config text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let sumologic = &self.sumologic;
        if sumologic.endpoint.trim().is_empty() {
            bail!("sumologic.endpoint must not be empty");
        }
        if sumologic.api_timeout == 0 {
            bail!("sumologic.api_timeout must be a positive number of seconds");
        }
        if sumologic.collector_query_limit == 0 {
            bail!("sumologic.collector_query_limit must be positive");
        }
        if sumologic
            .collector
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            bail!("sumologic.collector must not be empty; omit it to use the host name");
        }

        sumokit::validate_all(self.sources.iter().map(|s| &s.definition))
            .context("Invalid [[sources]] entry")?;
        Ok(())
    }

    /// Per-call API timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.sumologic.api_timeout)
    }

    /// Collector name: configured, or this host's name
    pub fn collector_name(&self) -> Result<String> {
        if let Some(name) = &self.sumologic.collector {
            return Ok(name.clone());
        }
        let host = runner::run_capture("hostname", &[])
            .context("Could not determine host name; set sumologic.collector")?;
        if host.is_empty() {
            bail!("Host name is empty; set sumologic.collector");
        }
        Ok(host)
    }

    /// API credentials from the environment, falling back to the file
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    fn credentials_with<F>(&self, env: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = &self.sumologic.credentials;
        let lookup = |var: &str, configured: &Option<String>| {
            env(var)
                .filter(|v| !v.is_empty())
                .or_else(|| configured.clone())
                .filter(|v| !v.is_empty())
        };

        let access_id = lookup(ACCESS_ID_ENV, &file.access_id);
        let access_key = lookup(ACCESS_KEY_ENV, &file.access_key);

        match (access_id, access_key) {
            (Some(id), Some(key)) => Ok(Credentials::new(id, key)),
            _ => bail!(
                "Sumo Logic credentials not found: set {} and {}, or \
                 access_id/access_key under [sumologic.credentials]",
                ACCESS_ID_ENV,
                ACCESS_KEY_ENV
            ),
        }
    }

    /// Everything needed to reach the collector
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut client = ClientConfig::new(self.collector_name()?, self.credentials()?);
        client.endpoint = self.sumologic.endpoint.clone();
        client.timeout = self.timeout();
        client.query_limit = self.sumologic.collector_query_limit;
        Ok(client)
    }

    pub fn reconcile_options(&self, dry_run: bool) -> ReconcileOptions {
        ReconcileOptions {
            disabled: self.sumologic.disabled,
            dry_run,
            timeout: self.timeout(),
        }
    }

    /// Declared sources as resources, in file order
    pub fn resources(&self) -> Vec<SourceResource> {
        self.sources
            .iter()
            .map(|s| {
                SourceResource::new(s.definition.clone(), s.action).with_timeout(self.timeout())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EXAMPLE: &str = r#"
[sumologic]
endpoint = "https://api.us2.sumologic.com/api/v1"
api_timeout = 30
collector_query_limit = 500
collector = "web-01"

[sumologic.credentials]
access_id = "file-id"
access_key = "file-key"

[[sources]]
name = "app-logs"
path = "/var/log/app/*.log"
category = "app"
default_timezone = "UTC"

[[sources]]
name = "legacy"
path = "/var/log/legacy.log"
action = "delete"
"#;

    #[test]
    fn test_parse_example_config() {
        let config = Config::parse(EXAMPLE).expect("Failed to parse config");

        assert!(!config.sumologic.disabled);
        assert_eq!(config.sumologic.api_timeout, 30);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.sumologic.collector_query_limit, 500);
        assert_eq!(config.collector_name().unwrap(), "web-01");

        assert_eq!(config.sources.len(), 2);
        let app = &config.sources[0];
        assert_eq!(app.action, Intent::Create);
        assert_eq!(app.definition.category.as_deref(), Some("app"));
        assert!(app.definition.multiline_processing_enabled);
        assert_eq!(config.sources[1].action, Intent::Delete);
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.sumologic.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.sumologic.collector_query_limit, DEFAULT_QUERY_LIMIT);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let toml = r#"
[[sources]]
name = "a"
path = "/x"

[[sources]]
name = "a"
path = "/y"
"#;
        let err = Config::parse(toml).unwrap_err();
        assert!(format!("{err:#}").contains("declared more than once"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::parse("[sumologic]\napi_timeout = 0\n").unwrap_err();
        assert!(err.to_string().contains("api_timeout"));
    }

    #[test]
    fn test_rejects_bad_prefix_regexp() {
        let toml = r#"
[[sources]]
name = "a"
path = "/x"
manual_prefix_regexp = "(["
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_rejects_unknown_action() {
        let toml = r#"
[[sources]]
name = "a"
path = "/x"
action = "purge"
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_credentials_prefer_environment() {
        let config = Config::parse(EXAMPLE).unwrap();

        let creds = config
            .credentials_with(|var| match var {
                ACCESS_ID_ENV => Some("env-id".to_string()),
                ACCESS_KEY_ENV => Some("env-key".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(creds, Credentials::new("env-id", "env-key"));

        let creds = config.credentials_with(|_| None).unwrap();
        assert_eq!(creds, Credentials::new("file-id", "file-key"));
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::parse("").unwrap();
        let err = config.credentials_with(|_| None).unwrap_err();
        assert!(err.to_string().contains(ACCESS_ID_ENV));
    }

    #[test]
    fn test_resources_carry_timeout_and_action() {
        let config = Config::parse(EXAMPLE).unwrap();
        let resources = config.resources();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].timeout, Duration::from_secs(30));
        assert_eq!(resources[1].intent, Intent::Delete);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sources[0].definition.name, "app-logs");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read config file"));
    }

    #[test]
    fn test_config_path_expands_tilde() {
        let path = config_path(Some(Path::new("~/sumo.toml"))).unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("sumo.toml"));
    }
}
