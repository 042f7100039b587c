//! Harness configuration
//!
//! Configuration is read from a JSON file (`contracts.json` by default) and
//! then adjusted from `MODULE_CONTRACTS_*` environment variables. Missing or
//! malformed files fall back to defaults, which plan against the in-process
//! simulated engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "contracts.json";
pub const ENV_ENGINE: &str = "MODULE_CONTRACTS_ENGINE";
pub const ENV_TERRAFORM_BIN: &str = "MODULE_CONTRACTS_TERRAFORM_BIN";
pub const ENV_TIMEOUT_SECS: &str = "MODULE_CONTRACTS_TIMEOUT_SECS";

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub engine: EngineConfig,
    /// Directory the module paths are resolved against (real engine only)
    pub modules_root: PathBuf,
    /// Upper bound on concurrently running scenarios
    pub jobs: usize,
    /// Scenario catalog on disk; the embedded catalog is used when unset
    pub catalog: Option<PathBuf>,
}

/// Which planning engine to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Simulated,
    Terraform,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(EngineKind::Simulated),
            "terraform" => Ok(EngineKind::Terraform),
            other => Err(format!(
                "unknown engine '{other}' (expected 'simulated' or 'terraform')"
            )),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Simulated => write!(f, "simulated"),
            EngineKind::Terraform => write!(f, "terraform"),
        }
    }
}

/// Engine invocation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Executable name or path of the real engine
    pub binary: PathBuf,
    /// Deadline for each engine step; a hung step is killed
    pub timeout_secs: u64,
    /// Shared provider cache (`TF_PLUGIN_CACHE_DIR`)
    pub plugin_cache_dir: Option<PathBuf>,
    /// Extra environment passed to every engine step
    pub extra_env: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Simulated,
            binary: PathBuf::from("terraform"),
            timeout_secs: 600,
            plugin_cache_dir: None,
            extra_env: BTreeMap::new(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            modules_root: PathBuf::from("modules"),
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            catalog: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from JSON file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load `contracts.json` from the working directory, then apply env overrides
    pub fn load() -> Self {
        let mut config = Self::load_from_file(DEFAULT_CONFIG_FILE);
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `MODULE_CONTRACTS_*` overrides from `lookup`
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ENGINE) {
            match raw.parse() {
                Ok(kind) => self.engine.kind = kind,
                Err(err) => log::warn!("[Config] Ignoring {}: {}", ENV_ENGINE, err),
            }
        }
        if let Some(raw) = lookup(ENV_TERRAFORM_BIN) {
            if !raw.trim().is_empty() {
                self.engine.binary = PathBuf::from(raw);
            }
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.engine.timeout_secs = secs,
                _ => log::warn!(
                    "[Config] Ignoring {}={:?}: expected a positive number of seconds",
                    ENV_TIMEOUT_SECS,
                    raw
                ),
            }
        }
    }

    /// Effective worker count, never zero
    pub fn worker_count(&self) -> usize {
        self.jobs.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.engine.kind, EngineKind::Simulated);
        assert_eq!(config.engine.binary, PathBuf::from("terraform"));
        assert_eq!(config.engine.timeout_secs, 600);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        fs::write(&path, r#"{"engine": {"kind": "terraform", "timeout_secs": 30}, "jobs": 2}"#)
            .unwrap();

        let config = HarnessConfig::load_from_file(&path);
        assert_eq!(config.engine.kind, EngineKind::Terraform);
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.engine.binary, PathBuf::from("terraform"));
        assert_eq!(config.jobs, 2);
        assert_eq!(config.modules_root, PathBuf::from("modules"));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(HarnessConfig::load_from_file(&path), HarnessConfig::default());
        assert_eq!(
            HarnessConfig::load_from_file(dir.path().join("missing.json")),
            HarnessConfig::default()
        );
    }

    #[test]
    fn test_env_overrides() {
        let env = BTreeMap::from([
            (ENV_ENGINE, "Terraform"),
            (ENV_TERRAFORM_BIN, "/opt/tf/bin/terraform"),
            (ENV_TIMEOUT_SECS, "0"),
        ]);
        let mut config = HarnessConfig::default();
        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(config.engine.kind, EngineKind::Terraform);
        assert_eq!(config.engine.binary, PathBuf::from("/opt/tf/bin/terraform"));
        assert_eq!(config.engine.timeout_secs, 600);
    }

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("simulated".parse::<EngineKind>(), Ok(EngineKind::Simulated));
        assert!("pulumi".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::Terraform.to_string(), "terraform");
    }
}
