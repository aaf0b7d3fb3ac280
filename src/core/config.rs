//! Configuration structures and types for fkinstall
//!
//! This module provides type-safe configuration management with serde support.
//! Every field of the on-disk file is optional; accessors on [`FkConfig`]
//! apply the defaults.

use crate::core::traits::Backend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default primary package manager
pub const DEFAULT_PRIMARY: &str = "pacman";
/// Default alternate package manager
pub const DEFAULT_ALTERNATE: &str = "yay";
/// Default elevation command
pub const DEFAULT_ELEVATION: &str = "sudo";
/// Audit log file name inside the user data directory
pub const AUDIT_LOG_FILENAME: &str = "fkinstall.log";
/// Application directory name inside the user config directory
pub const APP_DIR: &str = "fkinstall";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FkConfig {
    /// Backend command names (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backends: Option<BackendsConfig>,

    /// Backend used when the caller does not pick one (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<Backend>,

    /// Audit log settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditConfig>,

    /// Security settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

/// Backend command names as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BackendsConfig {
    /// Primary package manager (default: "pacman")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,

    /// Alternate, self-elevating package manager (default: "yay")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate: Option<String>,

    /// Elevation command that reads a password from stdin with -S (default: "sudo")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<String>,
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuditConfig {
    /// Log file path (default: <data dir>/fkinstall.log)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    /// Programs the executor may launch besides the backend commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_allowed_commands: Option<Vec<String>>,
}

/// Resolved backend command names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommands {
    pub primary: String,
    pub alternate: String,
    pub elevation: String,
}

impl Default for BackendCommands {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY.to_string(),
            alternate: DEFAULT_ALTERNATE.to_string(),
            elevation: DEFAULT_ELEVATION.to_string(),
        }
    }
}

impl FkConfig {
    /// Backend commands with defaults applied
    pub fn backend_commands(&self) -> BackendCommands {
        let defaults = BackendCommands::default();
        let Some(backends) = &self.backends else {
            return defaults;
        };

        BackendCommands {
            primary: backends.primary.clone().unwrap_or(defaults.primary),
            alternate: backends.alternate.clone().unwrap_or(defaults.alternate),
            elevation: backends.elevation.clone().unwrap_or(defaults.elevation),
        }
    }

    pub fn default_backend(&self) -> Backend {
        self.default_backend.unwrap_or_default()
    }

    /// Programs the executor is allowed to launch
    pub fn allowed_commands(&self) -> Vec<String> {
        let commands = self.backend_commands();
        let mut allowed = vec![commands.elevation, commands.primary, commands.alternate];

        if let Some(extra) = self
            .security
            .as_ref()
            .and_then(|s| s.extra_allowed_commands.as_ref())
        {
            allowed.extend(extra.iter().cloned());
        }

        allowed.sort();
        allowed.dedup();
        allowed
    }

    /// Audit log location, falling back to the per-user data directory
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit
            .as_ref()
            .and_then(|a| a.path.clone())
            .unwrap_or_else(default_audit_log_path)
    }
}

/// `<data dir>/fkinstall.log`, e.g. `~/.local/share/fkinstall.log`
pub fn default_audit_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(AUDIT_LOG_FILENAME)
}

/// `<config dir>/fkinstall`, e.g. `~/.config/fkinstall`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FkConfig::default();
        assert_eq!(config.backend_commands(), BackendCommands::default());
        assert_eq!(config.default_backend(), Backend::Primary);
        assert!(config.audit_log_path().ends_with(AUDIT_LOG_FILENAME));
    }

    #[test]
    fn test_partial_backends_keep_defaults() {
        let config = FkConfig {
            backends: Some(BackendsConfig {
                alternate: Some("paru".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let commands = config.backend_commands();
        assert_eq!(commands.primary, "pacman");
        assert_eq!(commands.alternate, "paru");
        assert_eq!(commands.elevation, "sudo");
    }

    #[test]
    fn test_allowed_commands_include_backends_and_extras() {
        let config = FkConfig {
            security: Some(SecurityConfig {
                extra_allowed_commands: Some(vec!["sh".to_string(), "sudo".to_string()]),
            }),
            ..Default::default()
        };

        let allowed = config.allowed_commands();
        assert_eq!(allowed, vec!["pacman", "sh", "sudo", "yay"]);
    }

    #[test]
    fn test_audit_path_override() {
        let config = FkConfig {
            audit: Some(AuditConfig {
                path: Some(PathBuf::from("/tmp/audit.log")),
            }),
            ..Default::default()
        };
        assert_eq!(config.audit_log_path(), PathBuf::from("/tmp/audit.log"));
    }

    #[test]
    fn test_yaml_deserialization() {
        let yaml = r#"
backends:
  primary: pacman
  alternate: paru
defaultBackend: alternate
audit:
  path: /var/tmp/fk.log
security:
  extraAllowedCommands: [flatpak]
"#;
        let config: FkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_backend(), Backend::Alternate);
        assert_eq!(config.backend_commands().alternate, "paru");
        assert!(config.allowed_commands().contains(&"flatpak".to_string()));
        assert_eq!(config.audit_log_path(), PathBuf::from("/var/tmp/fk.log"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config: FkConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, FkConfig::default());
    }
}
