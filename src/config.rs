use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEMAND_URL: &str =
    "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws/AmazonEC2/current/index.json";
pub const DEFAULT_SPOT_URL: &str = "https://spot-price.s3.amazonaws.com/spot.js";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pricing: PricingConfig,
    pub cache: CacheConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// On-demand and reserved offer file
    pub demand_url: String,
    /// Spot price feed (JSONP)
    pub spot_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshot directory (defaults to ~/.ec2FleetCompare)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub demand_name: String,
    pub spot_name: String,
    pub demand_ttl_secs: u64,
    pub spot_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub max_attempts: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            demand_url: DEFAULT_DEMAND_URL.to_string(),
            spot_url: DEFAULT_SPOT_URL.to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            demand_name: "ec2.cache".to_string(),
            spot_name: "spot.cache".to_string(),
            demand_ttl_secs: 24 * 60 * 60,
            spot_ttl_secs: 30 * 60,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl CacheConfig {
    pub fn demand_ttl(&self) -> Duration {
        Duration::from_secs(self.demand_ttl_secs)
    }

    pub fn spot_ttl(&self) -> Duration {
        Duration::from_secs(self.spot_ttl_secs)
    }

    /// Resolve the snapshot directory, falling back to `~/.ec2FleetCompare`.
    pub fn resolve_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".ec2FleetCompare"))
            .context("Could not determine home directory for the price cache; set [cache] dir")
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .fleetcmp.toml in current dir, then ~/.config/fleetcmp/config.toml
            let local = PathBuf::from(".fleetcmp.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("fleetcmp").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".fleetcmp.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| crate::error::ConfigError::ParseError(e.to_string()))
                .map_err(crate::error::FleetError::from)
                .with_context(|| {
                    let mut err = format!("Failed to parse config: {}", config_path.display());
                    err.push_str("\n  Tip: Run 'fleetcmp init' to create a new config file");
                    err
                })?;
            config.validate()?;
            Ok(config)
        } else {
            // Use defaults but warn if user explicitly provided a path
            if path.is_some() {
                tracing::warn!(
                    "Config file not found: {}, using default configuration",
                    config_path.display()
                );
            }
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ConfigError;

        if self.download.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.cache.demand_name == self.cache.spot_name {
            return Err(ConfigError::InvalidValue {
                field: "cache.spot_name".to_string(),
                reason: "demand and spot snapshots need distinct names".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
