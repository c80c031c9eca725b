//! Balance configuration providers.
//!
//! Services never read configuration files themselves; they ask an injected
//! [`ConfigProvider`] for the current validated [`BalanceConfig`].

use nation_wars_core::{BalanceConfig, ConfigError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Supplies the balance configuration in effect.
pub trait ConfigProvider: Send + Sync {
    fn current(&self) -> Arc<BalanceConfig>;
}

/// A configuration fixed at construction.
#[derive(Clone, Debug)]
pub struct StaticConfigProvider {
    config: Arc<BalanceConfig>,
}

impl StaticConfigProvider {
    pub fn new(config: BalanceConfig) -> Self {
        report_integrity(&config);
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for StaticConfigProvider {
    fn default() -> Self {
        Self::new(BalanceConfig::default())
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn current(&self) -> Arc<BalanceConfig> {
        Arc::clone(&self.config)
    }
}

struct Cached {
    config: Arc<BalanceConfig>,
    loaded_at: Instant,
}

/// A JSON file re-read once the cached copy is older than `max_age`.
///
/// A reload that fails keeps serving the last good configuration.
pub struct FileConfigProvider {
    path: PathBuf,
    max_age: Duration,
    cached: RwLock<Cached>,
}

impl FileConfigProvider {
    /// Load the file once; the first load must succeed.
    pub fn open(path: impl Into<PathBuf>, max_age: Duration) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = load_file(&path)?;
        info!(path = %path.display(), version = config.version, "Loaded balance configuration");
        Ok(Self {
            path,
            max_age,
            cached: RwLock::new(Cached {
                config: Arc::new(config),
                loaded_at: Instant::now(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cached(&self) -> Option<(Arc<BalanceConfig>, bool)> {
        let cached = self.cached.read().ok()?;
        let stale = cached.loaded_at.elapsed() >= self.max_age;
        Some((Arc::clone(&cached.config), stale))
    }

    fn reload(&self, fallback: Arc<BalanceConfig>) -> Arc<BalanceConfig> {
        let now = Instant::now();
        let config = match load_file(&self.path) {
            Ok(config) => Arc::new(config),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Balance reload failed, keeping last good configuration");
                fallback
            }
        };
        if let Ok(mut cached) = self.cached.write() {
            cached.config = Arc::clone(&config);
            cached.loaded_at = now;
        }
        config
    }
}

impl ConfigProvider for FileConfigProvider {
    fn current(&self) -> Arc<BalanceConfig> {
        match self.cached() {
            Some((config, false)) => config,
            Some((config, true)) => self.reload(config),
            // Poisoned cache: serve a fresh read or the defaults.
            None => load_file(&self.path)
                .map(Arc::new)
                .unwrap_or_else(|_| Arc::new(BalanceConfig::default())),
        }
    }
}

fn load_file(path: &Path) -> Result<BalanceConfig, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config = BalanceConfig::from_json(&json)?;
    report_integrity(&config);
    Ok(config)
}

/// Warn about gaps in success-level coverage and unusable attack types.
pub fn report_integrity(config: &BalanceConfig) {
    for attack in config.configured_attacks() {
        if let Ok(profile) = config.attack(attack) {
            for gap in profile.coverage_gaps() {
                warn!(
                    attack_type = %attack,
                    from = *gap.start(),
                    to = *gap.end(),
                    "Success levels leave final rolls uncovered; first level will be used"
                );
            }
        }
    }
    for attack in nation_wars_core::AttackType::all() {
        if let Err(err) = config.attack(*attack) {
            warn!(attack_type = %attack, error = %err, "Attack type unavailable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHIPPED: &str = include_str!("../../../config/balance.json");

    #[test]
    fn test_static_provider_shares_config() {
        let provider = StaticConfigProvider::new(BalanceConfig::from_json(SHIPPED).unwrap());
        assert!(Arc::ptr_eq(&provider.current(), &provider.current()));
        assert_eq!(provider.current().initial_resistance, 100.0);
    }

    #[test]
    fn test_file_provider_reloads_and_keeps_last_good() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        std::fs::write(&path, r#"{"initial_resistance": 80}"#).unwrap();

        let provider = FileConfigProvider::open(&path, Duration::ZERO).unwrap();
        assert_eq!(provider.current().initial_resistance, 80.0);

        std::fs::write(&path, r#"{"initial_resistance": 60}"#).unwrap();
        assert_eq!(provider.current().initial_resistance, 60.0);

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"{ not json").unwrap();
        assert_eq!(provider.current().initial_resistance, 60.0);
    }

    #[test]
    fn test_file_provider_caches_within_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        std::fs::write(&path, r#"{"initial_resistance": 80}"#).unwrap();

        let provider = FileConfigProvider::open(&path, Duration::from_secs(3600)).unwrap();
        std::fs::write(&path, r#"{"initial_resistance": 60}"#).unwrap();
        assert_eq!(provider.current().initial_resistance, 80.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FileConfigProvider::open("/nonexistent/balance.json", Duration::ZERO).err();
        assert!(matches!(err, Some(ConfigError::Io { .. })));
    }
}
