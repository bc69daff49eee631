//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration. Every section has defaults, so running
/// without a config file is fine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Owner identity whose ledger history is cleared before each run.
    #[serde(default = "default_demo_owner")]
    pub demo_owner: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            demo_owner: default_demo_owner(),
        }
    }
}

fn default_demo_owner() -> String {
    "demo".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_dir")]
    pub dir: String,
    #[serde(default = "default_ledger_file")]
    pub file: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: default_ledger_dir(),
            file: default_ledger_file(),
        }
    }
}

fn default_ledger_dir() -> String {
    "./data".into()
}
fn default_ledger_file() -> String {
    "ledger.jsonl".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.engine.demo_owner.is_empty() {
            return Err(Error::Config("demo_owner must not be empty".into()));
        }
        if self.ledger.file.is_empty() {
            return Err(Error::Config("ledger file must not be empty".into()));
        }
        if self.logging.audit_file.is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Full path to the ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        Path::new(&self.ledger.dir).join(&self.ledger.file)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[engine]
demo_owner = "demo"

[ledger]
dir = "./data"
file = "ledger.jsonl"

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.engine.demo_owner, "demo");
        assert_eq!(config.ledger.dir, "./data");
        assert_eq!(config.logging.audit_file, "audit.jsonl");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.demo_owner, "demo");
        assert_eq!(
            config.ledger_path(),
            PathBuf::from("./data/ledger.jsonl")
        );
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
    }

    #[test]
    fn validate_catches_empty_demo_owner() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.engine.demo_owner = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_empty_ledger_file() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.ledger.file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.engine.demo_owner, "demo");
    }
}
