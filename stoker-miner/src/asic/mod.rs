//! Hardware abstraction for the hashing accelerator.
//!
//! The job builder talks to whatever searches nonce space through this
//! seam: program a result difficulty mask, queue work, receive results. The
//! accelerator assigns each queued job a slot id from its own 8-bit space
//! and reports results against that id only, which is why dispatched jobs
//! are parked in [`crate::registry::JobRegistry`] until their slot is
//! reused.

pub mod sim;

use async_trait::async_trait;
use bitcoin::block::Version;
use tokio::sync::mpsc;

use crate::work::job::HardwareJob;

/// Difficulty mask range an accelerator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyBounds {
    pub min: u64,
    pub max: u64,
}

impl DifficultyBounds {
    /// Clamp a requested difficulty into the supported range.
    ///
    /// The max cap applies before the min floor, so a very low pool
    /// difficulty can never defeat the hardware's minimum.
    pub fn clamp(&self, difficulty: u64) -> u64 {
        difficulty.min(self.max).max(self.min)
    }
}

/// A nonce the accelerator reported at or above its difficulty mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsicResult {
    /// Slot id of the job this nonce belongs to.
    pub slot: u8,
    pub nonce: u32,
    /// Full version word the hardware hashed with, rolled bits included.
    pub version: Version,
}

/// Errors from accelerator operations.
#[derive(Debug, thiserror::Error)]
pub enum AsicError {
    /// The accelerator's driver task is gone.
    #[error("accelerator offline")]
    Offline,
}

/// The job pipeline's view of a hashing accelerator.
///
/// Implementations are autonomous actors: commands go in through these
/// methods, results come back asynchronously through the receiver handed
/// out by [`Asic::take_result_receiver`].
#[async_trait]
pub trait Asic: Send + Sync {
    /// Program the result mask. Only nonces whose share difficulty reaches
    /// `difficulty` are reported.
    async fn set_job_difficulty_mask(&self, difficulty: u64) -> Result<(), AsicError>;

    /// Queue one unit of work, returning the slot id assigned to it.
    async fn send_work(&self, extranonce2: u32, job: &HardwareJob) -> Result<u8, AsicError>;

    /// The difficulty mask range this accelerator supports.
    fn difficulty_bounds(&self) -> DifficultyBounds;

    /// Take ownership of the result receiver.
    ///
    /// Called once at wiring time, before the accelerator handle is shared.
    fn take_result_receiver(&mut self) -> Option<mpsc::Receiver<AsicResult>>;
}
