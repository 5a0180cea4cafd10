use anyhow::{anyhow, Context, Result};
use chanaudit_common::{
    config::VERSION,
    logger::{default_logs_datetime_format, LogLevel, LoggerConfig},
    network::Network,
};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{
    audit::AuditConfig,
    node_client::{parse_node_address, NodeClientConfig},
};

/// Default values for configuration
pub mod defaults {
    use super::*;

    pub const LOG_LEVEL: LogLevel = LogLevel::Info;
    pub const FILENAME_LOG: &str = "chanaudit.log";
    pub const LOGS_PATH: &str = "logs/";
    pub const HOST: &str = "localhost:8080";
    pub const NETWORK: &str = "mainnet";
    pub const TLS_CERT_FILENAME: &str = "tls.cert";
    pub const MACAROON_FILENAME: &str = "readonly.macaroon";

    // Node client defaults
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;

    // Audit defaults
    pub const LOOKUP_CONCURRENCY: usize = crate::audit::DEFAULT_LOOKUP_CONCURRENCY;

    // Validation limits
    pub const MIN_TIMEOUT_SECS: u64 = 1;
    pub const MAX_TIMEOUT_SECS: u64 = 300;
    pub const MIN_LOOKUP_CONCURRENCY: usize = 1;
    pub const MAX_LOOKUP_CONCURRENCY: usize = 256;
}

lazy_static! {
    // Node data directory, same location the node itself uses by default
    pub static ref DEFAULT_NODE_DIR: PathBuf = default_node_dir();
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

fn default_node_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(local).join("Lnd");
        }
    }

    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    if cfg!(target_os = "macos") {
        home.join("Library").join("Application Support").join("Lnd")
    } else {
        home.join(".lnd")
    }
}

// <node dir>/tls.cert
pub fn default_tls_cert_path() -> PathBuf {
    DEFAULT_NODE_DIR.join(defaults::TLS_CERT_FILENAME)
}

// <node dir>/data/chain/bitcoin/<network>/readonly.macaroon
pub fn default_macaroon_path(network: Network) -> PathBuf {
    DEFAULT_NODE_DIR
        .join("data")
        .join("chain")
        .join("bitcoin")
        .join(network.to_string())
        .join(defaults::MACAROON_FILENAME)
}

/// Enhanced configuration with validation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatedConfig {
    /// Log level configuration
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// File logging settings
    #[serde(default)]
    pub disable_file_logging: bool,

    #[serde(default)]
    pub disable_file_log_date_based: bool,

    #[serde(default)]
    pub disable_log_color: bool,

    #[serde(default = "default_filename_log")]
    pub filename_log: String,

    #[serde(default = "default_logs_path")]
    pub logs_path: String,

    /// Node connection settings
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_network")]
    pub network: String,

    /// Defaults to the node data directory when not set
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// Defaults to the read only macaroon of the selected network
    #[serde(default)]
    pub macaroon_path: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Number of channel graph lookups in flight
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,

    /// Print the final report as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Auto-fix configuration issues
    #[serde(default = "default_auto_fix_config")]
    pub auto_fix_config: bool,

    /// Validation settings
    #[serde(default)]
    pub strict_validation: bool,
}

// Default functions for serde
fn default_log_level() -> LogLevel {
    defaults::LOG_LEVEL
}
fn default_filename_log() -> String {
    defaults::FILENAME_LOG.to_string()
}
fn default_logs_path() -> String {
    defaults::LOGS_PATH.to_string()
}
fn default_host() -> String {
    defaults::HOST.to_string()
}
fn default_network() -> String {
    defaults::NETWORK.to_string()
}
fn default_request_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}
fn default_connection_timeout_secs() -> u64 {
    defaults::CONNECTION_TIMEOUT_SECS
}
fn default_lookup_concurrency() -> usize {
    defaults::LOOKUP_CONCURRENCY
}
fn default_auto_fix_config() -> bool {
    true
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            disable_file_logging: false,
            disable_file_log_date_based: false,
            disable_log_color: false,
            filename_log: default_filename_log(),
            logs_path: default_logs_path(),
            host: default_host(),
            network: default_network(),
            tls_cert_path: None,
            macaroon_path: None,
            request_timeout_secs: default_request_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            lookup_concurrency: default_lookup_concurrency(),
            json_output: false,
            auto_fix_config: default_auto_fix_config(),
            strict_validation: false,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid node host: '{0}' - must be a valid host:port or HTTP/HTTPS URL")]
    InvalidHost(String),
    #[error("Invalid network type: '{0}' - must be one of: mainnet, testnet, regtest, simnet")]
    InvalidNetworkType(String),
    #[error("Invalid {field}: {value} seconds - must be between {min} and {max} seconds")]
    InvalidTimeout {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("Invalid lookup concurrency: {value} - must be between {min} and {max}")]
    InvalidConcurrency { value: usize, min: usize, max: usize },
    #[error("Missing {kind} file: '{path}'")]
    MissingFile { kind: String, path: String },
}

/// Configuration validation result
pub type ValidationResult<T> = std::result::Result<T, ConfigValidationError>;

/// Configuration validator
pub struct ConfigValidator {
    strict_mode: bool,
    auto_fix: bool,
}

impl ConfigValidator {
    pub fn new(strict_mode: bool, auto_fix: bool) -> Self {
        Self {
            strict_mode,
            auto_fix,
        }
    }

    fn can_fix(&self) -> bool {
        self.auto_fix && !self.strict_mode
    }

    /// Validate the entire configuration
    pub fn validate(&self, config: &mut ValidatedConfig) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let mut fixed_issues = Vec::new();

        debug!("Validating configuration...");

        if let Err(e) = self.validate_host(&config.host) {
            if self.can_fix() {
                warn!("Auto-fixing node host: {}", e);
                config.host = defaults::HOST.to_string();
                fixed_issues.push(format!("Fixed node host to default: {}", config.host));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Err(e) = self.validate_network(&config.network) {
            if self.can_fix() {
                warn!("Auto-fixing network type: {}", e);
                config.network = defaults::NETWORK.to_string();
                fixed_issues.push(format!("Fixed network type to default: {}", config.network));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Err(e) = self.validate_timeout("request_timeout", config.request_timeout_secs) {
            if self.can_fix() {
                warn!("Auto-fixing request timeout: {}", e);
                config.request_timeout_secs = defaults::REQUEST_TIMEOUT_SECS;
                fixed_issues.push(format!(
                    "Fixed request timeout to {} seconds",
                    config.request_timeout_secs
                ));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Err(e) = self.validate_timeout("connection_timeout", config.connection_timeout_secs)
        {
            if self.can_fix() {
                warn!("Auto-fixing connection timeout: {}", e);
                config.connection_timeout_secs = defaults::CONNECTION_TIMEOUT_SECS;
                fixed_issues.push(format!(
                    "Fixed connection timeout to {} seconds",
                    config.connection_timeout_secs
                ));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        if let Err(e) = self.validate_concurrency(config.lookup_concurrency) {
            if self.can_fix() {
                warn!("Auto-fixing lookup concurrency: {}", e);
                config.lookup_concurrency = defaults::LOOKUP_CONCURRENCY;
                fixed_issues.push(format!(
                    "Fixed lookup concurrency to {}",
                    config.lookup_concurrency
                ));
            } else {
                return Err(anyhow!("Configuration validation failed: {}", e));
            }
        }

        // Credentials are only checked for presence, the client reports unreadable files
        let credentials = [
            ("TLS certificate", config.get_tls_cert_path()),
            ("macaroon", config.get_macaroon_path()),
        ];
        for (kind, path) in credentials {
            if let Err(e) = self.validate_file_exists(kind, &path) {
                if self.strict_mode {
                    return Err(anyhow!("Configuration validation failed: {}", e));
                }
                warnings.push(e.to_string());
            }
        }

        if !fixed_issues.is_empty() {
            info!(
                "Auto-fixed {} configuration issue(s):",
                fixed_issues.len()
            );
            for fix in &fixed_issues {
                info!("  - {}", fix);
            }
        }

        if !warnings.is_empty() {
            warn!("Configuration warnings:");
            for warning in &warnings {
                warn!("  - {}", warning);
            }
        }

        let mut all_messages = fixed_issues;
        all_messages.extend(warnings);

        debug!("Configuration validation completed");
        Ok(all_messages)
    }

    fn validate_host(&self, host: &str) -> ValidationResult<()> {
        if host.trim().is_empty() {
            return Err(ConfigValidationError::InvalidHost(host.to_string()));
        }
        parse_node_address(host).map_err(|_| ConfigValidationError::InvalidHost(host.to_string()))?;
        Ok(())
    }

    fn validate_network(&self, network: &str) -> ValidationResult<()> {
        Network::from_str(network)
            .map(|_| ())
            .map_err(|_| ConfigValidationError::InvalidNetworkType(network.to_string()))
    }

    fn validate_timeout(&self, field: &str, value: u64) -> ValidationResult<()> {
        if value < defaults::MIN_TIMEOUT_SECS || value > defaults::MAX_TIMEOUT_SECS {
            return Err(ConfigValidationError::InvalidTimeout {
                field: field.to_string(),
                value,
                min: defaults::MIN_TIMEOUT_SECS,
                max: defaults::MAX_TIMEOUT_SECS,
            });
        }
        Ok(())
    }

    fn validate_concurrency(&self, value: usize) -> ValidationResult<()> {
        if value < defaults::MIN_LOOKUP_CONCURRENCY || value > defaults::MAX_LOOKUP_CONCURRENCY {
            return Err(ConfigValidationError::InvalidConcurrency {
                value,
                min: defaults::MIN_LOOKUP_CONCURRENCY,
                max: defaults::MAX_LOOKUP_CONCURRENCY,
            });
        }
        Ok(())
    }

    fn validate_file_exists(&self, kind: &str, path: &str) -> ValidationResult<()> {
        if !Path::new(path).is_file() {
            return Err(ConfigValidationError::MissingFile {
                kind: kind.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

impl ValidatedConfig {
    /// Parse network string to Network enum
    pub fn get_network(&self) -> Network {
        Network::from_str(&self.network).unwrap_or_else(|_| {
            warn!("Unknown network '{}', defaulting to mainnet", self.network);
            Network::Mainnet
        })
    }

    pub fn get_tls_cert_path(&self) -> String {
        self.tls_cert_path
            .clone()
            .unwrap_or_else(|| default_tls_cert_path().display().to_string())
    }

    pub fn get_macaroon_path(&self) -> String {
        self.macaroon_path.clone().unwrap_or_else(|| {
            default_macaroon_path(self.get_network())
                .display()
                .to_string()
        })
    }

    /// Create NodeClientConfig from validated settings
    pub fn to_node_client_config(&self) -> NodeClientConfig {
        NodeClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
            tls_cert_path: Some(self.get_tls_cert_path()),
            macaroon_path: Some(self.get_macaroon_path()),
        }
    }

    // Logs go to stderr when stdout carries the JSON report
    pub fn to_logger_config(&self) -> LoggerConfig<'_> {
        LoggerConfig {
            level: self.log_level,
            file_level: self.log_level,
            dir_path: &self.logs_path,
            filename_log: &self.filename_log,
            disable_file_logging: self.disable_file_logging,
            disable_file_log_date_based: self.disable_file_log_date_based,
            disable_colors: self.disable_log_color,
            console_on_stderr: self.json_output,
            logs_datetime_format: default_logs_datetime_format(),
        }
    }

    pub fn to_audit_config(&self) -> AuditConfig {
        AuditConfig {
            lookup_concurrency: self.lookup_concurrency,
            ..Default::default()
        }
    }

    /// Validate and load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P, strict_mode: bool, auto_fix: bool) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read config file '{}'", path.as_ref().display())
        })?;

        let mut config: ValidatedConfig = serde_json::from_str(&content).with_context(|| {
            format!("Failed to parse config file '{}'", path.as_ref().display())
        })?;

        let validator = ConfigValidator::new(strict_mode, auto_fix);
        let messages = validator.validate(&mut config)?;

        if !messages.is_empty() {
            info!(
                "Configuration loaded with {} adjustments/warnings",
                messages.len()
            );
        }

        Ok(config)
    }

    /// Generate a configuration template with descriptive structure
    pub fn generate_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let mut template = serde_json::to_value(ValidatedConfig::default())?;
        if let Value::Object(fields) = &mut template {
            fields.insert(
                "_info".to_string(),
                json!({
                    "description": "Channel capacity audit configuration",
                    "version": VERSION,
                    "sections": {
                        "logging": "Controls log output and file generation",
                        "node": "Connection and credential settings for the audited node",
                        "audit": "Channel graph lookup concurrency and report format",
                        "validation": "Configuration validation behavior"
                    }
                }),
            );
        }

        let content = serde_json::to_string_pretty(&template)?;
        std::fs::write(&path, content).with_context(|| {
            format!("Failed to write template to '{}'", path.as_ref().display())
        })?;

        info!(
            "Configuration template generated at: {}",
            path.as_ref().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Credentials pointing to real files so only the tested field can fail
    fn config_with_credentials(dir: &tempfile::TempDir) -> ValidatedConfig {
        let cert = dir.path().join("tls.cert");
        let macaroon = dir.path().join("readonly.macaroon");
        std::fs::write(&cert, "cert").unwrap();
        std::fs::write(&macaroon, [1u8, 2, 3]).unwrap();

        ValidatedConfig {
            tls_cert_path: Some(cert.display().to_string()),
            macaroon_path: Some(macaroon.display().to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_credentials(&dir);
        let messages = ConfigValidator::new(true, false)
            .validate(&mut config)
            .unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_auto_fix_resets_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_credentials(&dir);
        config.network = "stagenet".to_string();
        config.request_timeout_secs = 0;
        config.lookup_concurrency = 0;

        let messages = ConfigValidator::new(false, true)
            .validate(&mut config)
            .unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(config.network, defaults::NETWORK);
        assert_eq!(config.request_timeout_secs, defaults::REQUEST_TIMEOUT_SECS);
        assert_eq!(config.lookup_concurrency, defaults::LOOKUP_CONCURRENCY);
    }

    #[test]
    fn test_strict_mode_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_credentials(&dir);
        config.lookup_concurrency = 10_000;
        assert!(ConfigValidator::new(true, true)
            .validate(&mut config)
            .is_err());
    }

    #[test]
    fn test_missing_credentials_warn_unless_strict() {
        let mut config = ValidatedConfig {
            tls_cert_path: Some("/nonexistent/tls.cert".to_string()),
            macaroon_path: Some("/nonexistent/readonly.macaroon".to_string()),
            ..Default::default()
        };
        let messages = ConfigValidator::new(false, true)
            .validate(&mut config)
            .unwrap();
        assert_eq!(messages.len(), 2);

        assert!(ConfigValidator::new(true, false)
            .validate(&mut config)
            .is_err());
    }

    #[test]
    fn test_default_macaroon_path_follows_network() {
        let path = default_macaroon_path(Network::Testnet);
        assert!(path.ends_with("data/chain/bitcoin/testnet/readonly.macaroon"));

        let config = ValidatedConfig {
            network: "regtest".to_string(),
            ..Default::default()
        };
        assert!(config.get_macaroon_path().contains("regtest"));
        assert!(config.get_tls_cert_path().ends_with("tls.cert"));
    }

    #[test]
    fn test_template_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        ValidatedConfig::generate_template(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"_info\""));

        let config = ValidatedConfig::from_file(&path, false, true).unwrap();
        assert_eq!(config.host, defaults::HOST);
        assert_eq!(config.lookup_concurrency, defaults::LOOKUP_CONCURRENCY);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"host": "10.0.0.2:8080", "json_output": true}"#).unwrap();

        let config = ValidatedConfig::from_file(&path, false, true).unwrap();
        assert_eq!(config.host, "10.0.0.2:8080");
        assert!(config.json_output);
        assert_eq!(config.request_timeout_secs, defaults::REQUEST_TIMEOUT_SECS);
        assert_eq!(config.to_audit_config().lookup_concurrency, defaults::LOOKUP_CONCURRENCY);
        // Omitted flags behave like the generated template
        assert_eq!(config.auto_fix_config, ValidatedConfig::default().auto_fix_config);
        assert!(config.auto_fix_config);
        assert!(!config.strict_validation);
    }

    #[test]
    fn test_json_output_moves_logs_to_stderr() {
        let config = ValidatedConfig {
            json_output: true,
            ..Default::default()
        };
        let logger = config.to_logger_config();
        assert!(logger.console_on_stderr);
        assert_eq!(logger.dir_path, defaults::LOGS_PATH);
        assert_eq!(logger.filename_log, defaults::FILENAME_LOG);

        assert!(!ValidatedConfig::default().to_logger_config().console_on_stderr);
    }
}
