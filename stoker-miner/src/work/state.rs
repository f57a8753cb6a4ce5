//! Shared work state between the pool connection and the job builder.

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::asic::DifficultyBounds;

use super::extranonce2::{Extranonce2, Extranonce2Error};
use super::job::{HardwareJob, StratumJob};
use super::merkle;

/// The latest pool-announced work and its dispatch parameters.
///
/// The pool connection mutates this through four setters as messages arrive;
/// the job builder reads it through [`WorkState::assemble`]. One lock guards
/// all of it, held only for the duration of a setter or a single assembly,
/// never across I/O.
///
/// Pool difficulty is double-buffered: `set_pool_difficulty` records what the
/// pool most recently asked for, but dispatched jobs use the value frozen
/// when their template was installed. A difficulty change therefore takes
/// effect on the next `mining.notify`, never retroactively on a template the
/// hardware is already working through.
#[derive(Debug, Default)]
pub struct WorkState {
    inner: Mutex<Inner>,
    wake: Notify,
}

#[derive(Debug)]
struct Inner {
    job: Option<StratumJob>,
    extranonce1: Vec<u8>,
    extranonce2_size: u8,
    pool_difficulty: u64,
    active_difficulty: u64,
    version_mask: u32,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            job: None,
            extranonce1: Vec::new(),
            extranonce2_size: Extranonce2::MIN_SIZE,
            pool_difficulty: Self::DEFAULT_DIFFICULTY,
            active_difficulty: Self::DEFAULT_DIFFICULTY,
            version_mask: 0,
        }
    }
}

impl Inner {
    /// Share difficulty assumed until the pool sends `mining.set_difficulty`.
    const DEFAULT_DIFFICULTY: u64 = 8192;
}

impl WorkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the version-rolling mask (`mining.set_version_mask`).
    pub fn set_version_mask(&self, mask: u32) {
        self.inner.lock().version_mask = mask;
    }

    /// Record the pool's requested share difficulty
    /// (`mining.set_difficulty`).
    ///
    /// Returns whether the value changed, so the caller can decide whether
    /// the event is worth acting on. The new value is not applied to the
    /// current template; it waits for the next installed job.
    pub fn set_pool_difficulty(&self, difficulty: u64) -> bool {
        let mut inner = self.inner.lock();
        let changed = inner.pool_difficulty != difficulty;
        inner.pool_difficulty = difficulty;
        changed
    }

    /// Replace the extranonce window (`mining.subscribe` /
    /// `mining.set_extranonce`).
    ///
    /// The previous prefix is dropped; `size` is the pool's extranonce2
    /// byte width.
    pub fn set_extranonce(&self, prefix: Vec<u8>, size: u8) -> Result<(), Extranonce2Error> {
        // Validate the width up front so assembly can rely on it.
        Extranonce2::new(0, size)?;
        let mut inner = self.inner.lock();
        inner.extranonce1 = prefix;
        inner.extranonce2_size = size;
        Ok(())
    }

    /// Install a new work template (`mining.notify`).
    ///
    /// The previous template is dropped wholesale, the pool difficulty in
    /// force right now is frozen as this template's active difficulty, and
    /// the builder is woken for an immediate out-of-cycle dispatch.
    pub fn install_job(&self, job: StratumJob) {
        {
            let mut inner = self.inner.lock();
            inner.job = Some(job);
            inner.active_difficulty = inner.pool_difficulty;
        }
        self.wake.notify_one();
    }

    /// Wait until [`WorkState::install_job`] signals new work.
    ///
    /// Signals sent while nobody is waiting leave a single stored permit, so
    /// a burst of installs coalesces into one wake. The builder re-reads the
    /// whole state on every wake, which makes coalescing safe.
    pub async fn notified(&self) {
        self.wake.notified().await;
    }

    /// Build one unit of hardware work from the current state.
    ///
    /// Returns `None` while no template has been installed, which is the
    /// normal idle state before the first pool announcement. The counter is
    /// the caller's extranonce2 value for this dispatch; the accelerator
    /// difficulty is the frozen active difficulty clamped to `bounds`.
    pub fn assemble(&self, counter: u32, bounds: DifficultyBounds) -> Option<HardwareJob> {
        let inner = self.inner.lock();
        let job = inner.job.as_ref()?;
        let extranonce2 = Extranonce2::new(counter, inner.extranonce2_size).ok()?;

        let coinbase = merkle::assemble_coinbase(
            &job.coinbase1,
            &inner.extranonce1,
            &extranonce2.to_bytes(),
            &job.coinbase2,
        );
        let merkle_root =
            merkle::fold_merkle_branches(merkle::coinbase_txid(&coinbase), &job.merkle_branches);

        Some(HardwareJob {
            job_id: job.job_id.clone(),
            extranonce2,
            prev_blockhash: job.prev_blockhash,
            merkle_root,
            version: job.version,
            version_mask: inner.version_mask,
            bits: job.bits,
            time: job.time,
            pool_difficulty: inner.active_difficulty,
            asic_difficulty: bounds.clamp(inner.active_difficulty),
        })
    }
}
