//! Runtime configuration loaded from YAML
//!
//! Every field has a default, so an absent file or a partial file both work.
//! Command-line flags are applied on top via [`RuntimeConfig::apply_overrides`].

use super::options::CommonOptions;
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Milestone log file; `None` disables it
    pub log_file: Option<PathBuf>,
    pub bulk: BulkConfig,
    pub zombie: ZombieConfig,
    pub orphan: OrphanConfig,
    pub priority: PriorityConfig,
    pub services: ServicesConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_file: Some(PathBuf::from("process_log.txt")),
            bulk: BulkConfig::default(),
            zombie: ZombieConfig::default(),
            orphan: OrphanConfig::default(),
            priority: PriorityConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Child `i` (0-based) sleeps `(i + 1) * stagger_ms` before reporting
    pub stagger_ms: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { stagger_ms: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZombieConfig {
    /// How long the parent withholds waiting
    pub delay_secs: u64,
    /// How often the parent checks the child's state during the window
    pub poll_interval_ms: u64,
}

impl Default for ZombieConfig {
    fn default() -> Self {
        Self {
            delay_secs: 30,
            poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrphanConfig {
    /// How long the child sleeps before reporting its new parent
    pub child_delay_ms: u64,
    /// How long the parent lingers before exiting
    pub parent_grace_ms: u64,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            child_delay_ms: 5000,
            parent_grace_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Niceness increments applied by each child, in spawn order
    pub nice_values: Vec<i32>,
    /// Fixed iteration count of the CPU-bound workload
    pub iterations: u64,
    /// Pin every child to this CPU
    pub pin_cpu: Option<usize>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            nice_values: vec![19, 10, 0],
            iterations: 10_000_000,
            pin_cpu: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub names: Vec<String>,
    /// Each service works for a uniformly random duration in this window
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            names: vec![
                "NetworkService".to_string(),
                "DatabaseService".to_string(),
                "LoggingService".to_string(),
            ],
            min_secs: 2.0,
            max_secs: 4.0,
        }
    }
}

impl ZombieConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl OrphanConfig {
    pub fn child_delay(&self) -> Duration {
        Duration::from_millis(self.child_delay_ms)
    }

    pub fn parent_grace(&self) -> Duration {
        Duration::from_millis(self.parent_grace_ms)
    }
}

impl BulkConfig {
    pub fn stagger(&self, index: usize) -> Duration {
        Duration::from_millis(self.stagger_ms.saturating_mul(index as u64 + 1))
    }
}

impl ServicesConfig {
    /// Work window with `min <= max`, both non-negative
    pub fn window(&self) -> (f64, f64) {
        let min = self.min_secs.max(0.0);
        let max = self.max_secs.max(0.0);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }
}

impl RuntimeConfig {
    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, common: &CommonOptions) {
        if common.no_log_file {
            self.log_file = None;
        } else if let Some(path) = &common.log_file {
            self.log_file = Some(path.clone());
        }
        if let Some(secs) = common.zombie_delay_secs {
            self.zombie.delay_secs = secs;
        }
        if let Some(cpu) = common.pin_cpu {
            self.priority.pin_cpu = Some(cpu);
        }
    }
}

/// Load the runtime configuration, falling back to defaults when no path is given
pub fn load_runtime_config(path: Option<&Path>) -> eyre::Result<RuntimeConfig> {
    let Some(path) = path else {
        debug!("No runtime config given, using defaults");
        return Ok(RuntimeConfig::default());
    };

    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("unable to read config file {}", path.display()))?;
    let config: RuntimeConfig = serde_yaml::from_str(&content)
        .wrap_err_with(|| format!("unable to parse config file {}", path.display()))?;
    debug!("Loaded runtime config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = load_runtime_config(None).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.priority.nice_values, vec![19, 10, 0]);
        assert_eq!(config.zombie.delay(), Duration::from_secs(30));
        assert_eq!(config.bulk.stagger(1), Duration::from_millis(2000));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(
            &path,
            "zombie:\n  delay_secs: 2\npriority:\n  nice_values: [5, 0]\n  pin_cpu: 0\n",
        )
        .unwrap();

        let config = load_runtime_config(Some(&path)).unwrap();
        assert_eq!(config.zombie.delay_secs, 2);
        assert_eq!(config.zombie.poll_interval_ms, 50);
        assert_eq!(config.priority.nice_values, vec![5, 0]);
        assert_eq!(config.priority.pin_cpu, Some(0));
        assert_eq!(config.priority.iterations, 10_000_000);
        assert_eq!(config.services, ServicesConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "zombie: [not, a, map]\n").unwrap();
        assert!(load_runtime_config(Some(&path)).is_err());
        assert!(load_runtime_config(Some(&tmp.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = RuntimeConfig::default();
        config.apply_overrides(&CommonOptions {
            zombie_delay_secs: Some(1),
            pin_cpu: Some(2),
            log_file: Some(PathBuf::from("custom.log")),
            ..Default::default()
        });
        assert_eq!(config.zombie.delay_secs, 1);
        assert_eq!(config.priority.pin_cpu, Some(2));
        assert_eq!(config.log_file, Some(PathBuf::from("custom.log")));

        config.apply_overrides(&CommonOptions {
            no_log_file: true,
            ..Default::default()
        });
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_services_window_is_ordered() {
        let services = ServicesConfig {
            min_secs: 3.0,
            max_secs: 1.0,
            ..Default::default()
        };
        assert_eq!(services.window(), (1.0, 3.0));
    }
}
