use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, ensure};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::key::{DEFAULT_DIGITS, DEFAULT_PERIOD, DIGITS_RANGE};

pub const CONFIG_ENV: &str = "GAUTHY_CONFIG";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Colour codes and notices in the terminal
    pub color: bool,
    /// Format applied to bare `--key` secrets
    pub default_digits: usize,
    pub default_period: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            color: true,
            default_digits: DEFAULT_DIGITS,
            default_period: DEFAULT_PERIOD,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    /// A missing file means defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        cfg.validate()?;

        debug!(path = %path.display(), ?cfg, "loaded config");
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            DIGITS_RANGE.contains(&self.default_digits),
            "default_digits must be between 6 and 8, got {}",
            self.default_digits
        );
        ensure!(self.default_period > 0, "default_period must be positive");
        Ok(())
    }
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let mut dir = dirs::config_dir().ok_or_else(|| anyhow!("cannot get config dir"))?;
    dir.push("gauthy");
    Ok(dir.join("config.json"))
}
