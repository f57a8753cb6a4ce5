//! Daemon configuration, loaded from a TOML file.
//!
//! Only `pool.url` and `pool.username` are required; every other field
//! has a default suited to a bench setup with the simulated hash board.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::board::BoardProfile;
use crate::stratum::PoolConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pool: PoolSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub sim: SimSection,
}

/// `[pool]`: the upstream stratum endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    pub url: String,
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Share difficulty suggested to the pool after authorizing. Zero
    /// disables the suggestion.
    #[serde(default = "default_suggest_difficulty")]
    pub suggest_difficulty: u64,
}

/// `[board]`: hash-board characteristics.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardSection {
    #[serde(default = "default_board_name")]
    pub name: String,
    /// Nameplate hashrate in GH/s. Zero disables adaptive job pacing.
    #[serde(default = "default_nominal_gh")]
    pub nominal_gh: f64,
    #[serde(default = "default_min_difficulty")]
    pub min_difficulty: u64,
    #[serde(default = "default_max_difficulty")]
    pub max_difficulty: u64,
    /// Job dispatch interval in milliseconds.
    #[serde(default = "default_job_interval_ms")]
    pub job_interval_ms: u32,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            name: default_board_name(),
            nominal_gh: default_nominal_gh(),
            min_difficulty: default_min_difficulty(),
            max_difficulty: default_max_difficulty(),
            job_interval_ms: default_job_interval_ms(),
        }
    }
}

/// `[sim]`: the simulated hash engine.
#[derive(Debug, Clone, Deserialize)]
pub struct SimSection {
    /// Simulated hashrate in MH/s, kept modest so a debug build keeps up.
    #[serde(default = "default_sim_hashrate_mh")]
    pub hashrate_mh: f64,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            hashrate_mh: default_sim_hashrate_mh(),
        }
    }
}

fn default_password() -> String {
    "x".to_string()
}

fn default_suggest_difficulty() -> u64 {
    8192
}

fn default_board_name() -> String {
    "sim".to_string()
}

fn default_nominal_gh() -> f64 {
    480.0
}

fn default_min_difficulty() -> u64 {
    256
}

fn default_max_difficulty() -> u64 {
    65536
}

fn default_job_interval_ms() -> u32 {
    500
}

fn default_sim_hashrate_mh() -> f64 {
    100.0
}

impl Config {
    /// Read and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pool.url.is_empty() {
            bail!("pool.url must not be empty");
        }
        if self.pool.username.is_empty() {
            bail!("pool.username must not be empty");
        }
        if self.board.min_difficulty == 0 {
            bail!("board.min_difficulty must be at least 1");
        }
        if self.board.min_difficulty > self.board.max_difficulty {
            bail!("board.min_difficulty exceeds board.max_difficulty");
        }
        if self.board.job_interval_ms == 0 {
            bail!("board.job_interval_ms must be nonzero");
        }
        if self.board.nominal_gh < 0.0 {
            bail!("board.nominal_gh must not be negative");
        }
        if self.sim.hashrate_mh <= 0.0 {
            bail!("sim.hashrate_mh must be positive");
        }
        Ok(())
    }

    pub fn board_profile(&self) -> BoardProfile {
        BoardProfile {
            name: self.board.name.clone(),
            nominal_gh: self.board.nominal_gh,
            min_difficulty: self.board.min_difficulty,
            max_difficulty: self.board.max_difficulty,
            job_interval_ms: self.board.job_interval_ms,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.pool.url.clone(),
            username: self.pool.username.clone(),
            password: self.pool.password.clone(),
            suggest_difficulty: (self.pool.suggest_difficulty > 0)
                .then_some(self.pool.suggest_difficulty),
            ..PoolConfig::default()
        }
    }
}
