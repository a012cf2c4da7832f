//! Configuration management for IssueGate
//!
//! Settings are layered: built-in defaults, then an optional `issuegate.yaml`,
//! then `ISSUEGATE_*` environment variables. The result is validated once at
//! startup and any invalid value is a hard error.

use crate::common::env_loader::EnvLoader;
use crate::common::rate_limiter::{RateLimiterConfig, DEFAULT_MAX_TRACKED_KEYS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILENAME: &str = "issuegate.yaml";
const ENV_PREFIX: &str = "ISSUEGATE";
const MAX_BULK_SIZE_CEILING: usize = 1000;

/// Longest audit retention accepted, in days
pub const MAX_RETENTION_DAYS: u32 = 3650;

/// Confirmation phrase used when none is configured
pub const DEFAULT_CONFIRMATION_PHRASE: &str = "CONFIRM_DELETE";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field that has an invalid value
        field: String,
        /// The invalid value that was provided
        value: String,
        /// Helpful hint about how to fix the issue
        hint: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Descriptive message about the validation failure
        message: String,
    },
}

fn invalid(field: &str, value: impl ToString, hint: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.into(),
    }
}

/// Remote tracker connection settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base URL of the tracker, e.g. `https://example.atlassian.net`
    pub base_url: String,
    /// Account email used for basic authentication
    pub email: String,
    /// API token paired with the email
    pub api_token: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &if self.api_token.is_empty() { "" } else { "***" })
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Operation enable switches and bulk sizing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OperationsConfig {
    /// Allow creating issues
    pub enable_create: bool,
    /// Allow updating issues
    pub enable_update: bool,
    /// Allow deleting issues
    pub enable_delete: bool,
    /// Allow workflow transitions
    pub enable_transitions: bool,
    /// Allow adding comments
    pub enable_comments: bool,
    /// Allow attachment upload, download and delete
    pub enable_attachments: bool,
    /// Allow bulk updates
    pub enable_bulk: bool,
    /// Largest number of issues accepted by one bulk update
    pub max_bulk_size: usize,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            enable_create: true,
            enable_update: true,
            enable_delete: true,
            enable_transitions: true,
            enable_comments: true,
            enable_attachments: true,
            enable_bulk: true,
            max_bulk_size: 50,
        }
    }
}

impl OperationsConfig {
    /// Whether the switches allow the named tool; tools without a switch are always allowed
    pub fn allows(&self, tool: &str) -> bool {
        match tool {
            "create_issue" => self.enable_create,
            "update_issue" => self.enable_update,
            "delete_issue" => self.enable_delete,
            "transition_issue" => self.enable_transitions,
            "add_comment" => self.enable_comments,
            "upload_attachment" | "download_attachment" | "delete_attachment" => {
                self.enable_attachments
            }
            "bulk_update_issues" => self.enable_bulk,
            _ => true,
        }
    }
}

/// Which destructive operation classes need a confirmation phrase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Issue deletion
    pub require_for_delete: bool,
    /// Bulk update
    pub require_for_bulk: bool,
    /// Attachment deletion
    pub require_for_attachment_delete: bool,
    /// Literal phrase the caller must supply
    pub phrase: String,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            require_for_delete: true,
            require_for_bulk: true,
            require_for_attachment_delete: true,
            phrase: DEFAULT_CONFIRMATION_PHRASE.to_string(),
        }
    }
}

/// File and content security settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Largest attachment accepted, in bytes
    pub max_file_size: u64,
    /// Permitted extensions, lowercase with a leading dot; empty allows all
    pub allowed_extensions: Vec<String>,
    /// Directories uploads may be read from and downloads written to; empty denies all
    pub allowed_directories: Vec<PathBuf>,
    /// Apply dangerous-pattern checks to paths and field values
    pub block_dangerous_patterns: bool,
    /// Longest string accepted for a generic field
    pub max_string_length: usize,
    /// Largest array accepted for a generic field
    pub max_array_length: usize,
    /// Destructive operation confirmation
    pub confirmation: ConfirmationConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: [
                ".txt", ".md", ".pdf", ".png", ".jpg", ".jpeg", ".gif", ".csv", ".json", ".log",
                ".zip", ".xml", ".yaml", ".yml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_directories: std::env::current_dir().ok().into_iter().collect(),
            block_dangerous_patterns: true,
            max_string_length: 32_767,
            max_array_length: 100,
            confirmation: ConfirmationConfig::default(),
        }
    }
}

/// Per-class rate-limit policies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitsConfig {
    /// Ordinary operations
    pub standard: RateLimiterConfig,
    /// Searches
    pub search: RateLimiterConfig,
    /// Attachment transfer
    pub file: RateLimiterConfig,
    /// Bulk updates
    pub bulk: RateLimiterConfig,
    /// Key cap per limiter
    pub max_tracked_keys: usize,
    /// Background cleanup period in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            standard: RateLimiterConfig::standard(),
            search: RateLimiterConfig::search(),
            file: RateLimiterConfig::file(),
            bulk: RateLimiterConfig::bulk(),
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            cleanup_interval_secs: 300,
        }
    }
}

/// Minimum severity at which audit entries are echoed to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// Everything, including low-risk reads
    Debug,
    /// Medium risk and above
    Info,
    /// High risk and above
    Warn,
    /// Critical only
    Error,
}

impl std::str::FromStr for AuditLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(AuditLevel::Debug),
            "info" => Ok(AuditLevel::Info),
            "warn" | "warning" => Ok(AuditLevel::Warn),
            "error" => Ok(AuditLevel::Error),
            other => Err(format!("unknown audit level '{other}'")),
        }
    }
}

/// Audit journal settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Record audit entries at all
    pub enabled: bool,
    /// Console echo threshold
    pub level: AuditLevel,
    /// Entries older than this many days are dropped
    pub retention_days: u32,
    /// Most entries kept in memory
    pub max_entries: usize,
    /// Estimated memory budget in megabytes
    pub max_memory_mb: f64,
    /// Background cleanup period in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: AuditLevel::Info,
            retention_days: 30,
            max_entries: 10_000,
            max_memory_mb: 50.0,
            cleanup_interval_secs: 3600,
        }
    }
}

/// Advisory permission check settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PermissionConfig {
    /// Run capability checks before sensitive operations
    pub enabled: bool,
    /// Block operations when a required capability is missing
    pub strict: bool,
    /// Seconds a cached capability set stays fresh
    pub cache_timeout_secs: u64,
    /// Most scopes cached at once
    pub max_cache_entries: usize,
    /// Background purge period in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: false,
            cache_timeout_secs: 300,
            max_cache_entries: 1000,
            cleanup_interval_secs: 600,
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Remote connection
    pub connection: ConnectionConfig,
    /// Operation switches
    pub operations: OperationsConfig,
    /// Security validator settings
    pub security: SecurityConfig,
    /// Rate-limit policies
    pub rate_limits: RateLimitsConfig,
    /// Audit journal
    pub audit: AuditConfig,
    /// Permission checks
    pub permissions: PermissionConfig,
}

impl GatewayConfig {
    /// Load defaults, the discovered YAML file and environment overrides, then validate
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::find_yaml_config_file().as_deref())
    }

    /// Like [`GatewayConfig::load`] but with an explicit YAML path
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_yaml(path)?,
            None => {
                tracing::debug!("No {CONFIG_FILENAME} found, using defaults");
                Self::default()
            }
        };
        config.apply_env_vars()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without applying environment overrides
    pub fn load_yaml(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading YAML configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Find `issuegate.yaml` in the working directory, `~/.config/issuegate/` or `~`
    pub fn find_yaml_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(CONFIG_FILENAME)];
        if let Some(home_dir) = dirs::home_dir() {
            search_paths.push(home_dir.join(".config").join("issuegate").join(CONFIG_FILENAME));
            search_paths.push(home_dir.join(CONFIG_FILENAME));
        }

        let found = search_paths.into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => tracing::debug!("Found configuration file: {:?}", path),
            None => tracing::debug!("No {CONFIG_FILENAME} configuration file found"),
        }
        found
    }

    fn apply_env_vars(&mut self) -> Result<(), ConfigError> {
        let loader = EnvLoader::new(ENV_PREFIX);

        let conn = &mut self.connection;
        conn.base_url = loader.load_string("BASE_URL", &conn.base_url);
        conn.email = loader.load_string("EMAIL", &conn.email);
        conn.api_token = loader.load_string("API_TOKEN", &conn.api_token);
        conn.timeout_secs = loader.load_parsed("TIMEOUT_SECS", conn.timeout_secs)?;

        let ops = &mut self.operations;
        ops.enable_create = loader.load_bool("ENABLE_CREATE", ops.enable_create)?;
        ops.enable_update = loader.load_bool("ENABLE_UPDATE", ops.enable_update)?;
        ops.enable_delete = loader.load_bool("ENABLE_DELETE", ops.enable_delete)?;
        ops.enable_transitions = loader.load_bool("ENABLE_TRANSITIONS", ops.enable_transitions)?;
        ops.enable_comments = loader.load_bool("ENABLE_COMMENTS", ops.enable_comments)?;
        ops.enable_attachments = loader.load_bool("ENABLE_ATTACHMENTS", ops.enable_attachments)?;
        ops.enable_bulk = loader.load_bool("ENABLE_BULK", ops.enable_bulk)?;
        ops.max_bulk_size = loader.load_parsed("MAX_BULK_SIZE", ops.max_bulk_size)?;

        let sec = &mut self.security;
        sec.max_file_size = loader.load_parsed("MAX_FILE_SIZE", sec.max_file_size)?;
        if let Some(exts) = loader.load_list("ALLOWED_EXTENSIONS") {
            sec.allowed_extensions = exts;
        }
        if let Some(dirs) = loader.load_list("ALLOWED_DIRECTORIES") {
            sec.allowed_directories = dirs.into_iter().map(PathBuf::from).collect();
        }
        sec.block_dangerous_patterns =
            loader.load_bool("BLOCK_DANGEROUS_PATTERNS", sec.block_dangerous_patterns)?;
        let confirm = &mut sec.confirmation;
        confirm.phrase = loader.load_string("CONFIRMATION_PHRASE", &confirm.phrase);
        confirm.require_for_delete =
            loader.load_bool("REQUIRE_CONFIRM_DELETE", confirm.require_for_delete)?;
        confirm.require_for_bulk =
            loader.load_bool("REQUIRE_CONFIRM_BULK", confirm.require_for_bulk)?;
        confirm.require_for_attachment_delete = loader.load_bool(
            "REQUIRE_CONFIRM_ATTACHMENT_DELETE",
            confirm.require_for_attachment_delete,
        )?;

        let limits = &mut self.rate_limits;
        for (name, policy) in [
            ("STANDARD", &mut limits.standard),
            ("SEARCH", &mut limits.search),
            ("FILE", &mut limits.file),
            ("BULK", &mut limits.bulk),
        ] {
            policy.max_requests =
                loader.load_parsed(&format!("RATE_{name}_MAX_REQUESTS"), policy.max_requests)?;
            policy.window_ms =
                loader.load_parsed(&format!("RATE_{name}_WINDOW_MS"), policy.window_ms)?;
            policy.burst_limit =
                loader.load_parsed(&format!("RATE_{name}_BURST_LIMIT"), policy.burst_limit)?;
            policy.delay_ms =
                loader.load_parsed(&format!("RATE_{name}_DELAY_MS"), policy.delay_ms)?;
        }

        let audit = &mut self.audit;
        audit.enabled = loader.load_bool("AUDIT_ENABLED", audit.enabled)?;
        audit.level = loader.load_parsed("AUDIT_LEVEL", audit.level)?;
        audit.retention_days = loader.load_parsed("AUDIT_RETENTION_DAYS", audit.retention_days)?;
        audit.max_entries = loader.load_parsed("AUDIT_MAX_ENTRIES", audit.max_entries)?;
        audit.max_memory_mb = loader.load_parsed("AUDIT_MAX_MEMORY_MB", audit.max_memory_mb)?;

        let perms = &mut self.permissions;
        perms.enabled = loader.load_bool("PERMISSION_CHECKS", perms.enabled)?;
        perms.strict = loader.load_bool("PERMISSION_STRICT", perms.strict)?;
        perms.cache_timeout_secs =
            loader.load_parsed("PERMISSION_CACHE_TIMEOUT_SECS", perms.cache_timeout_secs)?;

        Ok(())
    }

    /// Lowercase extensions and give each a leading dot
    fn normalize(&mut self) {
        for ext in &mut self.security.allowed_extensions {
            let lowered = ext.trim().to_ascii_lowercase();
            *ext = if lowered.starts_with('.') {
                lowered
            } else {
                format!(".{lowered}")
            };
        }
        self.connection.base_url = self.connection.base_url.trim_end_matches('/').to_string();
    }

    /// Validate the current configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_connection()?;
        self.validate_operations()?;
        self.validate_security()?;
        self.validate_rate_limits()?;
        self.validate_audit()?;
        self.validate_permissions()?;
        Ok(())
    }

    /// Require the credentials needed to talk to the remote tracker
    pub fn require_connection(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("connection.base_url", &self.connection.base_url),
            ("connection.email", &self.connection.email),
            ("connection.api_token", &self.connection.api_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation {
                    message: format!(
                        "{field} is required (set it in {CONFIG_FILENAME} or via {ENV_PREFIX}_* variables)"
                    ),
                });
            }
        }
        Ok(())
    }

    fn validate_connection(&self) -> Result<(), ConfigError> {
        let conn = &self.connection;
        if !conn.base_url.is_empty() {
            let parsed = url::Url::parse(&conn.base_url).map_err(|e| {
                invalid("connection.base_url", &conn.base_url, format!("Not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid(
                    "connection.base_url",
                    &conn.base_url,
                    "Only http and https URLs are supported",
                ));
            }
        }
        if conn.timeout_secs == 0 {
            return Err(invalid("connection.timeout_secs", 0, "Must be at least 1 second"));
        }
        Ok(())
    }

    fn validate_operations(&self) -> Result<(), ConfigError> {
        let size = self.operations.max_bulk_size;
        if size == 0 || size > MAX_BULK_SIZE_CEILING {
            return Err(invalid(
                "operations.max_bulk_size",
                size,
                format!("Must be between 1 and {MAX_BULK_SIZE_CEILING}"),
            ));
        }
        Ok(())
    }

    fn validate_security(&self) -> Result<(), ConfigError> {
        let sec = &self.security;
        if sec.max_file_size == 0 {
            return Err(invalid("security.max_file_size", 0, "Must be greater than zero"));
        }
        if sec.max_string_length == 0 {
            return Err(invalid("security.max_string_length", 0, "Must be greater than zero"));
        }
        if sec.max_array_length == 0 {
            return Err(invalid("security.max_array_length", 0, "Must be greater than zero"));
        }
        if let Some(ext) = sec.allowed_extensions.iter().find(|e| e.len() < 2) {
            return Err(invalid(
                "security.allowed_extensions",
                ext,
                "Extensions must be non-empty, for example .pdf",
            ));
        }
        if let Some(dir) = sec.allowed_directories.iter().find(|d| !d.is_absolute()) {
            return Err(invalid(
                "security.allowed_directories",
                dir.display(),
                "Allowed directories must be absolute paths",
            ));
        }
        if sec.confirmation.phrase.trim().is_empty() {
            return Err(invalid(
                "security.confirmation.phrase",
                &sec.confirmation.phrase,
                "The confirmation phrase cannot be empty",
            ));
        }
        Ok(())
    }

    fn validate_rate_limits(&self) -> Result<(), ConfigError> {
        let limits = &self.rate_limits;
        for (name, policy) in [
            ("standard", &limits.standard),
            ("search", &limits.search),
            ("file", &limits.file),
            ("bulk", &limits.bulk),
        ] {
            policy.check().map_err(|reason| ConfigError::Validation {
                message: format!("rate_limits.{name}: {reason}"),
            })?;
        }
        if limits.max_tracked_keys == 0 {
            return Err(invalid("rate_limits.max_tracked_keys", 0, "Must be greater than zero"));
        }
        if limits.cleanup_interval_secs == 0 {
            return Err(invalid(
                "rate_limits.cleanup_interval_secs",
                0,
                "Must be greater than zero",
            ));
        }
        Ok(())
    }

    fn validate_audit(&self) -> Result<(), ConfigError> {
        let audit = &self.audit;
        if audit.retention_days == 0 {
            return Err(invalid("audit.retention_days", 0, "Must be at least 1 day"));
        }
        if audit.retention_days > MAX_RETENTION_DAYS {
            return Err(invalid(
                "audit.retention_days",
                audit.retention_days,
                format!("Must be at most {MAX_RETENTION_DAYS} days"),
            ));
        }
        if audit.max_entries == 0 {
            return Err(invalid("audit.max_entries", 0, "Must be greater than zero"));
        }
        if !(audit.max_memory_mb.is_finite() && audit.max_memory_mb > 0.0) {
            return Err(invalid(
                "audit.max_memory_mb",
                audit.max_memory_mb,
                "Must be a positive number of megabytes",
            ));
        }
        if audit.cleanup_interval_secs == 0 {
            return Err(invalid("audit.cleanup_interval_secs", 0, "Must be greater than zero"));
        }
        Ok(())
    }

    fn validate_permissions(&self) -> Result<(), ConfigError> {
        let perms = &self.permissions;
        if perms.strict && !perms.enabled {
            return Err(ConfigError::Validation {
                message: "permissions.strict requires permissions.enabled".to_string(),
            });
        }
        if perms.cache_timeout_secs == 0 {
            return Err(invalid(
                "permissions.cache_timeout_secs",
                0,
                "Must be greater than zero",
            ));
        }
        if perms.max_cache_entries == 0 {
            return Err(invalid(
                "permissions.max_cache_entries",
                0,
                "Must be greater than zero",
            ));
        }
        if perms.cleanup_interval_secs == 0 {
            return Err(invalid(
                "permissions.cleanup_interval_secs",
                0,
                "Must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Example configuration file content
    pub fn example_yaml_config() -> &'static str {
        r#"# issuegate.yaml
connection:
  base_url: https://example.atlassian.net
  email: bot@example.com
  api_token: your-api-token

operations:
  enable_delete: false
  max_bulk_size: 25

security:
  max_file_size: 5242880
  allowed_extensions: [.txt, .md, .pdf, .png]
  allowed_directories: [/srv/issuegate/files]
  confirmation:
    phrase: CONFIRM_DELETE

rate_limits:
  search:
    max_requests: 30
    window_ms: 60000
    burst_limit: 8
    delay_ms: 100

audit:
  level: info
  retention_days: 30
  max_entries: 10000

permissions:
  enabled: true
  strict: false
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.operations.max_bulk_size, 50);
        assert_eq!(config.security.max_file_size, 10 * 1024 * 1024);
        assert!(config.security.allowed_extensions.contains(&".pdf".to_string()));
        assert_eq!(config.security.confirmation.phrase, "CONFIRM_DELETE");
        assert_eq!(config.rate_limits.search.max_requests, 30);
        assert_eq!(config.audit.retention_days, 30);
        assert!(config.permissions.enabled);
        assert!(!config.permissions.strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_operation_switches() {
        let mut ops = OperationsConfig::default();
        assert!(ops.allows("delete_issue"));
        ops.enable_attachments = false;
        assert!(!ops.allows("upload_attachment"));
        assert!(!ops.allows("delete_attachment"));
        assert!(ops.allows("search_issues"));
        assert!(ops.allows("get_audit_log"));
    }

    #[test]
    fn test_yaml_partial_overrides_keep_defaults() {
        let file = write_yaml(
            "operations:\n  enable_delete: false\nrate_limits:\n  file:\n    max_requests: 3\n    burst_limit: 1\n",
        );
        let config = GatewayConfig::load_yaml(file.path()).unwrap();
        assert!(!config.operations.enable_delete);
        assert!(config.operations.enable_create);
        assert_eq!(config.rate_limits.file.max_requests, 3);
        assert_eq!(config.rate_limits.file.window_ms, 60_000);
        assert_eq!(config.rate_limits.search, RateLimiterConfig::search());
    }

    #[test]
    fn test_yaml_parse_error() {
        let file = write_yaml("operations: [unclosed");
        match GatewayConfig::load_yaml(file.path()) {
            Err(ConfigError::YamlParse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("Expected YamlParse, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            GatewayConfig::load_yaml(&missing),
            Err(ConfigError::FileRead { .. })
        ));
    }

    #[test]
    fn test_example_yaml_is_valid() {
        let config: GatewayConfig =
            serde_yaml::from_str(GatewayConfig::example_yaml_config()).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.operations.enable_delete);
        assert_eq!(config.operations.max_bulk_size, 25);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.rate_limits.bulk.burst_limit = 99;
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));

        let mut config = GatewayConfig::default();
        config.operations.max_bulk_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = GatewayConfig::default();
        config.security.confirmation.phrase = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.connection.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.permissions.enabled = false;
        config.permissions.strict = true;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.security.allowed_directories = vec![PathBuf::from("relative/dir")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_days_bounded() {
        let mut config = GatewayConfig::default();
        config.audit.retention_days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());

        config.audit.retention_days = 200_000_000;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "audit.retention_days"),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_require_connection() {
        let mut config = GatewayConfig::default();
        assert!(config.require_connection().is_err());
        config.connection.base_url = "https://example.atlassian.net".to_string();
        config.connection.email = "bot@example.com".to_string();
        config.connection.api_token = "secret".to_string();
        assert!(config.require_connection().is_ok());
        assert!(!format!("{:?}", config.connection).contains("secret"));
    }

    #[test]
    fn test_normalize_extensions_and_url() {
        let mut config = GatewayConfig::default();
        config.security.allowed_extensions = vec!["PDF".to_string(), ".Txt".to_string()];
        config.connection.base_url = "https://example.atlassian.net/".to_string();
        config.normalize();
        assert_eq!(config.security.allowed_extensions, vec![".pdf", ".txt"]);
        assert_eq!(config.connection.base_url, "https://example.atlassian.net");
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_yaml() {
        let file = write_yaml("operations:\n  max_bulk_size: 10\naudit:\n  retention_days: 7\n");
        std::env::set_var("ISSUEGATE_MAX_BULK_SIZE", "20");
        std::env::set_var("ISSUEGATE_ENABLE_BULK", "no");
        std::env::set_var("ISSUEGATE_RATE_SEARCH_MAX_REQUESTS", "12");
        std::env::set_var("ISSUEGATE_ALLOWED_EXTENSIONS", "PDF,txt");

        let result = GatewayConfig::load_from(Some(file.path()));

        std::env::remove_var("ISSUEGATE_MAX_BULK_SIZE");
        std::env::remove_var("ISSUEGATE_ENABLE_BULK");
        std::env::remove_var("ISSUEGATE_RATE_SEARCH_MAX_REQUESTS");
        std::env::remove_var("ISSUEGATE_ALLOWED_EXTENSIONS");

        let config = result.unwrap();
        assert_eq!(config.operations.max_bulk_size, 20);
        assert!(!config.operations.enable_bulk);
        assert_eq!(config.audit.retention_days, 7);
        assert_eq!(config.rate_limits.search.max_requests, 12);
        assert_eq!(config.security.allowed_extensions, vec![".pdf", ".txt"]);
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_env_value_fails_load() {
        std::env::set_var("ISSUEGATE_AUDIT_RETENTION_DAYS", "forever");
        let result = GatewayConfig::load_from(None);
        std::env::remove_var("ISSUEGATE_AUDIT_RETENTION_DAYS");

        match result {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "ISSUEGATE_AUDIT_RETENTION_DAYS")
            }
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_env_value_failing_validation() {
        std::env::set_var("ISSUEGATE_RATE_FILE_MAX_REQUESTS", "0");
        let result = GatewayConfig::load_from(None);
        std::env::remove_var("ISSUEGATE_RATE_FILE_MAX_REQUESTS");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
