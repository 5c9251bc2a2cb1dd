//! Configuration for mlingest
//!
//! Resolution priority: environment variables > TOML file > compiled
//! defaults. The TOML path comes from `MLINGEST_CONFIG`, falling back to
//! `./mlingest.toml` when that file exists.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

/// Staging directory for uploaded artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub dir: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
        }
    }
}

/// External analysis program and its fixed processing parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to the analysis program
    pub program: PathBuf,
    /// Target column the program classifies on
    pub target_column: String,
    /// How many top features the program should report
    pub top_features: u32,
    /// Optional deadline; unset means the invocation is unbounded
    pub timeout_seconds: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("./ml_pipeline"),
            target_column: "Activity".to_string(),
            top_features: 10,
            timeout_seconds: None,
        }
    }
}

/// Bearer-token gate in front of the dataset routes. Unset disables the
/// gate entirely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

/// Full service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub staging: StagingConfig,
    pub pipeline: PipelineConfig,
    pub auth: AuthConfig,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load configuration with ENV > TOML > default priority.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("MLINGEST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("mlingest.toml"));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Loaded TOML configuration");
            config
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MLINGEST_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MLINGEST_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring unparseable MLINGEST_PORT"),
            }
        }
        if let Ok(dir) = std::env::var("MLINGEST_STAGING_DIR") {
            self.staging.dir = PathBuf::from(dir);
        }
        if let Ok(program) = std::env::var("MLINGEST_PIPELINE_PROGRAM") {
            self.pipeline.program = PathBuf::from(program);
        }
        if let Ok(column) = std::env::var("MLINGEST_TARGET_COLUMN") {
            self.pipeline.target_column = column;
        }
        if let Ok(count) = std::env::var("MLINGEST_TOP_FEATURES") {
            match count.parse() {
                Ok(count) => self.pipeline.top_features = count,
                Err(_) => warn!(value = %count, "Ignoring unparseable MLINGEST_TOP_FEATURES"),
            }
        }
        if let Ok(seconds) = std::env::var("MLINGEST_TIMEOUT_SECONDS") {
            match seconds.parse() {
                Ok(seconds) => self.pipeline.timeout_seconds = Some(seconds),
                Err(_) => warn!(value = %seconds, "Ignoring unparseable MLINGEST_TIMEOUT_SECONDS"),
            }
        }
        if let Ok(token) = std::env::var("MLINGEST_AUTH_TOKEN") {
            self.auth.token = Some(token);
        }
    }

    /// Listener address as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_baseline_behavior() {
        let config = Config::default();

        assert_eq!(config.bind_addr(), "127.0.0.1:5730");
        assert_eq!(config.staging.dir, PathBuf::from("uploads"));
        assert_eq!(config.pipeline.target_column, "Activity");
        assert_eq!(config.pipeline.top_features, 10);
        assert_eq!(config.pipeline.timeout_seconds, None);
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            program = "/opt/analysis/run"
            timeout_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.program, PathBuf::from("/opt/analysis/run"));
        assert_eq!(config.pipeline.timeout_seconds, Some(30));
        // Untouched sections keep their defaults.
        assert_eq!(config.pipeline.target_column, "Activity");
        assert_eq!(config.server.port, 5730);
    }

    #[test]
    #[serial]
    fn env_overrides_win_over_defaults() {
        std::env::set_var("MLINGEST_TARGET_COLUMN", "Label");
        std::env::set_var("MLINGEST_TOP_FEATURES", "25");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.pipeline.target_column, "Label");
        assert_eq!(config.pipeline.top_features, 25);

        std::env::remove_var("MLINGEST_TARGET_COLUMN");
        std::env::remove_var("MLINGEST_TOP_FEATURES");
    }

    #[test]
    #[serial]
    fn unparseable_numeric_env_values_are_ignored() {
        std::env::set_var("MLINGEST_TOP_FEATURES", "lots");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.pipeline.top_features, 10);

        std::env::remove_var("MLINGEST_TOP_FEATURES");
    }
}
