//! Configuration file loader for fkinstall
//!
//! This module provides configuration loading and merging. The result is
//! resolved once at startup and treated as immutable afterwards.

use super::config::*;
use crate::core::error::OperationError;
use crate::core::traits::Backend;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name inside the config directory
const CONFIG_FILENAME: &str = "settings.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Directory holding settings.yaml (default: ~/.config/fkinstall)
    pub config_dir: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<FkConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. User config (~/.config/fkinstall/settings.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<FkConfig, OperationError> {
        let config_dir = options.config_dir.unwrap_or_else(default_config_dir);
        Self::ensure_config_dir(&config_dir).await;

        let mut configs = vec![FkConfig::default()];

        if let Some(user_config) = Self::load_config_file(&config_dir.join(CONFIG_FILENAME)).await? {
            configs.push(user_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged = Self::merge_configs(configs);
        Ok(Self::expand_env_vars(merged, &options.env))
    }

    /// Create the config directory if it is missing
    ///
    /// Failure is not fatal: defaults still apply.
    async fn ensure_config_dir(dir: &Path) {
        if let Err(e) = fs::create_dir_all(dir).await {
            tracing::warn!(dir = %dir.display(), error = %e, "could not create config directory");
        }
    }

    /// Load configuration from a YAML file
    async fn load_config_file(file_path: &Path) -> Result<Option<FkConfig>, OperationError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            OperationError::Config(format!("Failed to read {}: {}", file_path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let config: FkConfig = serde_yaml::from_str(&content).map_err(|e| {
            OperationError::Config(format!("Failed to parse {}: {}", file_path.display(), e))
        })?;

        tracing::debug!(path = %file_path.display(), "loaded user configuration");
        Ok(Some(config))
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<FkConfig> {
        let mut config = FkConfig::default();
        let mut has_changes = false;

        // FKINSTALL_BACKEND -> defaultBackend
        if let Some(value) = env.get("FKINSTALL_BACKEND") {
            match Backend::parse(value) {
                Some(backend) => {
                    config.default_backend = Some(backend);
                    has_changes = true;
                }
                None => tracing::warn!(value = %value, "ignoring unknown FKINSTALL_BACKEND"),
            }
        }

        // FKINSTALL_AUDIT_LOG -> audit.path
        if let Some(path) = env.get("FKINSTALL_AUDIT_LOG").filter(|p| !p.is_empty()) {
            config.audit = Some(AuditConfig {
                path: Some(PathBuf::from(path)),
            });
            has_changes = true;
        }

        // FKINSTALL_PRIMARY / FKINSTALL_ALTERNATE -> backends.*
        let primary = env.get("FKINSTALL_PRIMARY").filter(|v| !v.is_empty());
        let alternate = env.get("FKINSTALL_ALTERNATE").filter(|v| !v.is_empty());
        if primary.is_some() || alternate.is_some() {
            config.backends = Some(BackendsConfig {
                primary: primary.cloned(),
                alternate: alternate.cloned(),
                elevation: None,
            });
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority (later wins)
    fn merge_configs(configs: Vec<FkConfig>) -> FkConfig {
        let mut result = FkConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut FkConfig, source: FkConfig) {
        // Backends merge field by field
        if let Some(source_backends) = source.backends {
            let target_backends = target.backends.get_or_insert_with(BackendsConfig::default);

            if source_backends.primary.is_some() {
                target_backends.primary = source_backends.primary;
            }
            if source_backends.alternate.is_some() {
                target_backends.alternate = source_backends.alternate;
            }
            if source_backends.elevation.is_some() {
                target_backends.elevation = source_backends.elevation;
            }
        }

        if source.default_backend.is_some() {
            target.default_backend = source.default_backend;
        }

        if let Some(source_audit) = source.audit
            && source_audit.path.is_some()
        {
            target.audit = Some(source_audit);
        }

        if source.security.is_some() {
            target.security = source.security;
        }
    }

    /// Expand ${VAR} references in command names and the audit path
    ///
    /// Unknown variables are left untouched.
    fn expand_env_vars(mut config: FkConfig, env: &HashMap<String, String>) -> FkConfig {
        if let Some(backends) = &mut config.backends {
            for value in [
                &mut backends.primary,
                &mut backends.alternate,
                &mut backends.elevation,
            ]
            .into_iter()
            .flatten()
            {
                *value = Self::expand_string(value, env);
            }
        }

        if let Some(audit) = &mut config.audit
            && let Some(path) = &audit.path
        {
            let expanded = Self::expand_string(&path.to_string_lossy(), env);
            audit.path = Some(PathBuf::from(expanded));
        }

        config
    }

    /// Expand environment variables in a single string
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let Ok(env_var_regex) = Regex::new(ENV_VAR_PATTERN) else {
            return input.to_string();
        };

        env_var_regex
            .replace_all(input, |caps: &regex::Captures<'_>| {
                env.get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
