//! Core types for collectors and sources.

use crate::error::{Error, Result};
use declarative::{AttrValue, Attribute, AttributeChange, diff_attributes};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default Sumo Logic API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.sumologic.com/api/v1";

/// Default timeout for a single API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of collectors requested when searching by name.
pub const DEFAULT_QUERY_LIMIT: u32 = 1000;

/// Source type used for every source created by this crate.
pub const LOCAL_FILE_SOURCE: &str = "LocalFile";

/// API credentials (access id + access key).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access id (user name for Basic auth).
    pub access_id: String,
    /// Access key (password for Basic auth).
    pub access_key: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Everything needed to open a collector handle over HTTP.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL.
    pub endpoint: String,
    /// Basic-auth credentials.
    pub credentials: Credentials,
    /// Name of the collector to manage.
    pub collector: String,
    /// Timeout applied to every API call.
    pub timeout: Duration,
    /// Upper bound on collectors returned when searching by name.
    pub query_limit: u32,
}

impl ClientConfig {
    /// Create a config with default endpoint, timeout and query limit.
    pub fn new(collector: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
            collector: collector.into(),
            timeout: DEFAULT_TIMEOUT,
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// How a collector's sources are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sources come from a local JSON file on the collector host.
    Json,
    /// Sources are managed through the API / web UI.
    #[serde(rename = "UI")]
    Ui,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "Json"),
            Self::Ui => write!(f, "UI"),
        }
    }
}

/// Entry of the collector list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorInfo {
    pub id: u64,
    pub name: String,
}

/// Collector-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorMetadata {
    pub id: u64,
    pub name: String,
    pub collector_type: Option<String>,
    pub alive: Option<bool>,
    /// Hosted collectors report no sync mode.
    pub source_sync_mode: Option<SyncMode>,
}

impl CollectorMetadata {
    /// Whether sources are managed from a local file rather than the API.
    pub fn is_file_synced(&self) -> bool {
        self.source_sync_mode == Some(SyncMode::Json)
    }
}

fn default_true() -> bool {
    true
}

/// A log source, as declared or as observed on the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique name within the collector.
    pub name: String,
    /// Path expression, e.g. `/var/log/app/*.log`.
    pub path: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub default_timezone: Option<String>,
    #[serde(default)]
    pub force_timezone: bool,
    #[serde(default = "default_true")]
    pub automatic_date_parsing: bool,
    #[serde(default = "default_true")]
    pub multiline_processing_enabled: bool,
    #[serde(default = "default_true")]
    pub use_autoline_matching: bool,
    #[serde(default)]
    pub manual_prefix_regexp: Option<String>,
    #[serde(default)]
    pub default_date_format: Option<String>,
}

/// Attributes compared when deciding whether a source must be replaced.
///
/// The name is identity, not state, so it is not listed.
pub const SOURCE_ATTRIBUTES: &[Attribute<SourceDefinition>] = &[
    Attribute {
        name: "path",
        get: |s| AttrValue::text(&s.path),
    },
    Attribute {
        name: "category",
        get: |s| AttrValue::opt_text(s.category.as_deref()),
    },
    Attribute {
        name: "default_timezone",
        get: |s| AttrValue::opt_text(s.default_timezone.as_deref()),
    },
    Attribute {
        name: "force_timezone",
        get: |s| AttrValue::Flag(s.force_timezone),
    },
    Attribute {
        name: "automatic_date_parsing",
        get: |s| AttrValue::Flag(s.automatic_date_parsing),
    },
    Attribute {
        name: "multiline_processing_enabled",
        get: |s| AttrValue::Flag(s.multiline_processing_enabled),
    },
    Attribute {
        name: "use_autoline_matching",
        get: |s| AttrValue::Flag(s.use_autoline_matching),
    },
    Attribute {
        name: "manual_prefix_regexp",
        get: |s| AttrValue::opt_text(s.manual_prefix_regexp.as_deref()),
    },
    Attribute {
        name: "default_date_format",
        get: |s| AttrValue::opt_text(s.default_date_format.as_deref()),
    },
];

impl SourceDefinition {
    /// Create a definition with default parsing options.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            category: None,
            default_timezone: None,
            force_timezone: false,
            automatic_date_parsing: true,
            multiline_processing_enabled: true,
            use_autoline_matching: true,
            manual_prefix_regexp: None,
            default_date_format: None,
        }
    }

    /// Set the source category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the default time zone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = Some(timezone.into());
        self
    }

    /// Set whether the default time zone overrides parsed ones.
    pub fn with_force_timezone(mut self, force: bool) -> Self {
        self.force_timezone = force;
        self
    }

    /// Set the manual multiline prefix pattern.
    pub fn with_manual_prefix(mut self, regexp: impl Into<String>) -> Self {
        self.manual_prefix_regexp = Some(regexp.into());
        self
    }

    /// Attribute-level differences going from `self` (observed) to `desired`.
    pub fn changes_to(&self, desired: &SourceDefinition) -> Vec<AttributeChange> {
        diff_attributes(SOURCE_ATTRIBUTES, self, desired)
    }

    /// Check the definition before any API call is made.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        if self.path.trim().is_empty() {
            return Err(Error::validation(
                "path",
                format!("source '{}' must declare a path expression", self.name),
            ));
        }
        for (field, value) in [
            ("category", &self.category),
            ("default_timezone", &self.default_timezone),
            ("default_date_format", &self.default_date_format),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::validation(
                    field,
                    format!("source '{}' sets an empty value; omit it instead", self.name),
                ));
            }
        }
        if let Some(pattern) = &self.manual_prefix_regexp {
            regex::Regex::new(pattern).map_err(|e| {
                Error::validation(
                    "manual_prefix_regexp",
                    format!("source '{}': {}", self.name, e),
                )
            })?;
        }
        if self.multiline_processing_enabled
            && !self.use_autoline_matching
            && self.manual_prefix_regexp.is_none()
        {
            return Err(Error::validation(
                "manual_prefix_regexp",
                format!(
                    "source '{}' disables autoline matching for multiline messages \
                     and must provide a manual prefix pattern",
                    self.name
                ),
            ));
        }
        Ok(())
    }
}

/// A source as it exists on the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSource {
    /// API id.
    pub id: u64,
    /// API source type (e.g. `LocalFile`).
    pub source_type: Option<String>,
    #[serde(flatten)]
    pub definition: SourceDefinition,
}

impl RemoteSource {
    /// Source name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}
