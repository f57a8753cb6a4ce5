//! Board profile and live-tunable settings.

use tokio::sync::watch;

use crate::asic::DifficultyBounds;

/// Static description of the mining board, loaded from configuration.
#[derive(Debug, Clone)]
pub struct BoardProfile {
    pub name: String,
    /// Rated accelerator throughput in GH/s. Zero disables adaptive job
    /// pacing.
    pub nominal_gh: f64,
    pub min_difficulty: u64,
    pub max_difficulty: u64,
    /// Dispatch interval ceiling in milliseconds.
    pub job_interval_ms: u32,
}

/// Runtime handle to the board.
///
/// The job interval is watch-backed so it can be retuned while the miner
/// runs; the build loop re-reads it on every wake and treats a change as a
/// user override.
pub struct Board {
    profile: BoardProfile,
    job_interval: watch::Sender<u32>,
}

impl Board {
    pub fn new(profile: BoardProfile) -> Self {
        let (job_interval, _) = watch::channel(profile.job_interval_ms);
        Self {
            profile,
            job_interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn nominal_gh(&self) -> f64 {
        self.profile.nominal_gh
    }

    pub fn difficulty_bounds(&self) -> DifficultyBounds {
        DifficultyBounds {
            min: self.profile.min_difficulty,
            max: self.profile.max_difficulty,
        }
    }

    /// Subscribe to the configured job interval.
    pub fn job_interval(&self) -> watch::Receiver<u32> {
        self.job_interval.subscribe()
    }

    /// Override the job interval at runtime.
    pub fn set_job_interval(&self, interval_ms: u32) {
        self.job_interval.send_replace(interval_ms);
    }
}
