//! Configuration for the `TractionNorm` engine
//!
//! All tolerances, TTLs, and caps live here; nothing is hard-wired at call
//! sites. Loading is layered: defaults, config files, then environment
//! variables with a `TRACTION_` style prefix.

use crate::logging::LogConfig;
use crate::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Sections
// ============================================================================

/// SQLite database settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the database file
    pub path: String,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/traction.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Norm point validation limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum accepted load (t/axle or t, depending on norm kind)
    pub load_min: f64,
    /// Maximum accepted load
    pub load_max: f64,
    /// Minimum accepted consumption (kWh per measurement unit)
    pub consumption_min: f64,
    /// Maximum accepted consumption
    pub consumption_max: f64,
    /// Decimal places used when detecting duplicate loads
    pub load_precision: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            load_min: 0.1,
            load_max: 100.0,
            consumption_min: 0.1,
            consumption_max: 1000.0,
            load_precision: 3,
        }
    }
}

/// In-process curve cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CurveCacheConfig {
    /// Lifetime of a built curve before it is rebuilt from stored points
    pub ttl_secs: u64,
    /// Maximum number of cached curves; least-recently-used beyond this
    pub max_entries: usize,
}

impl CurveCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CurveCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_entries: 256,
        }
    }
}

/// Persistent interpolated-value cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValueCacheConfig {
    /// Absolute parameter window within which a stored value is reused
    pub tolerance: f64,
}

impl Default for ValueCacheConfig {
    fn default() -> Self {
        Self { tolerance: 0.001 }
    }
}

/// Persistent analysis result cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisCacheConfig {
    /// Age after which a cached analysis is expired
    pub max_age_secs: u64,
    /// Maximum number of route rows stored per analysis
    pub route_cap: usize,
    /// Entries removed per cleanup transaction
    pub cleanup_batch: usize,
    /// A cleanup pass is spawned after this many successful puts
    pub cleanup_every_puts: u64,
}

impl AnalysisCacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for AnalysisCacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 604_800,
            route_cap: 1000,
            cleanup_batch: 100,
            cleanup_every_puts: 50,
        }
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Top-level configuration for the engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub validation: ValidationConfig,
    pub curve_cache: CurveCacheConfig,
    pub value_cache: ValueCacheConfig,
    pub analysis_cache: AnalysisCacheConfig,
    pub log: LogConfig,
}

/// Load configuration from multiple sources
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed)
/// 2. Local config file (e.g., config/local.yaml)
/// 3. Environment-specific file (e.g., config/production.yaml)
/// 4. Default config file (e.g., config/default.yaml)
/// 5. Default values
pub fn load_config<T>(service_name: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let env = std::env::var("TRACTION_ENV").unwrap_or_else(|_| "development".to_string());

    let figment = Figment::new()
        // Start with defaults
        .merge(Toml::file("config/default.toml"))
        .merge(Yaml::file("config/default.yaml"))
        .merge(Json::file("config/default.json"))
        // Environment-specific config
        .merge(Toml::file(format!("config/{}.toml", env)))
        .merge(Yaml::file(format!("config/{}.yaml", env)))
        .merge(Json::file(format!("config/{}.json", env)))
        // Local overrides (not committed to git)
        .merge(Toml::file("config/local.toml"))
        .merge(Yaml::file("config/local.yaml"))
        .merge(Json::file("config/local.json"))
        // Environment variables with prefix
        .merge(Env::prefixed(&format!("{}_", service_name.to_uppercase())));

    figment
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))
}

/// Load configuration from a specific file
pub fn load_config_from_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Config("Config file must have an extension".to_string()))?;

    let figment = match extension {
        "toml" => Figment::new().merge(Toml::file(path)),
        "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
        "json" => Figment::new().merge(Json::file(path)),
        _ => {
            return Err(Error::Config(format!(
                "Unsupported config file format: {}",
                extension
            )))
        }
    };

    figment
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration from file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.database.path, "data/traction.db");
        assert_eq!(config.validation.load_min, 0.1);
        assert_eq!(config.validation.load_max, 100.0);
        assert_eq!(config.validation.consumption_max, 1000.0);
        assert_eq!(config.curve_cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.curve_cache.max_entries, 256);
        assert_eq!(config.value_cache.tolerance, 0.001);
        assert_eq!(config.analysis_cache.route_cap, 1000);
        assert_eq!(config.analysis_cache.cleanup_batch, 100);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("engine.yaml");
        std::fs::write(
            &config_path,
            "database:\n  path: /tmp/norms.db\ncurve_cache:\n  ttl_secs: 60\nvalue_cache:\n  tolerance: 0.5\n",
        )
        .unwrap();

        let config: EngineConfig = load_config_from_file(&config_path).unwrap();
        assert_eq!(config.database.path, "/tmp/norms.db");
        assert_eq!(config.curve_cache.ttl_secs, 60);
        assert_eq!(config.value_cache.tolerance, 0.5);
        // Untouched sections keep their defaults
        assert_eq!(config.analysis_cache.route_cap, 1000);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("engine.ini");
        std::fs::write(&config_path, "x=1").unwrap();

        let result: Result<EngineConfig> = load_config_from_file(&config_path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
