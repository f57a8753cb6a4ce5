//! Evaluation of nonces returned by the accelerator.
//!
//! Every result is re-checked in software: the rolled version must stay
//! inside the granted mask and the share must really meet the difficulty
//! the accelerator was programmed with. Anything else counts as a
//! hardware error. Valid shares feed the hashrate estimator, and those
//! that also meet the pool difficulty go out for submission.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::asic::AsicResult;
use crate::difficulty::share_difficulty;
use crate::registry::JobRegistry;
use crate::stratum::Share;
use crate::telemetry::HashrateEstimator;
use crate::tracing::prelude::*;
use crate::work::job::HardwareJob;

/// Verdict on a single accelerator result.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Rolled version bits fall outside the granted mask.
    VersionOutOfMask { delta: u32 },

    /// Share difficulty below the accelerator's programmed threshold.
    BelowAsicTarget { share_difficulty: f64 },

    /// Genuine result, but short of the pool difficulty.
    AsicOnly { share_difficulty: f64 },

    /// Meets the pool difficulty; submit it.
    Submit { share_difficulty: f64, share: Share },
}

/// Judge one result against the job it claims to solve.
pub fn evaluate(job: &HardwareJob, result: &AsicResult) -> Evaluation {
    let delta = job.rolled_bits(result.version);
    if delta & !job.version_mask != 0 {
        return Evaluation::VersionOutOfMask { delta };
    }

    let header = job.header(result.version, result.nonce);
    let share_difficulty = share_difficulty(&header.block_hash());

    if share_difficulty < job.asic_difficulty as f64 {
        Evaluation::BelowAsicTarget { share_difficulty }
    } else if share_difficulty >= job.pool_difficulty as f64 {
        let share = Share {
            job_id: job.job_id.clone(),
            extranonce2: job.extranonce2,
            ntime: job.time,
            nonce: result.nonce,
            version_bits: (job.version_mask != 0).then_some(delta),
        };
        Evaluation::Submit {
            share_difficulty,
            share,
        }
    } else {
        Evaluation::AsicOnly { share_difficulty }
    }
}

/// Receive and judge accelerator results until cancelled.
pub async fn task(
    running: CancellationToken,
    registry: Arc<Mutex<JobRegistry>>,
    telemetry: Arc<Mutex<HashrateEstimator>>,
    mut results: mpsc::Receiver<AsicResult>,
    shares: mpsc::Sender<Share>,
) -> Result<()> {
    let mut best_difficulty = 0.0f64;
    let mut hardware_errors = 0u64;

    while !running.is_cancelled() {
        let result = tokio::select! {
            _ = running.cancelled() => break,
            result = results.recv() => match result {
                Some(result) => result,
                // Accelerator side closed, nothing more will arrive.
                None => break,
            },
        };

        let Some(job) = registry.lock().get(result.slot).cloned() else {
            hardware_errors += 1;
            warn!(
                "Result for unknown job slot {:02X} ({hardware_errors} hardware errors)",
                result.slot
            );
            continue;
        };

        match evaluate(&job, &result) {
            Evaluation::VersionOutOfMask { delta } => {
                hardware_errors += 1;
                warn!(
                    "Rolled version bits {delta:08x} outside mask {:08x} ({hardware_errors} hardware errors)",
                    job.version_mask
                );
            }
            Evaluation::BelowAsicTarget { share_difficulty } => {
                hardware_errors += 1;
                warn!(
                    "Nonce difficulty {share_difficulty:.2} below target {} ({hardware_errors} hardware errors)",
                    job.asic_difficulty
                );
            }
            Evaluation::AsicOnly { share_difficulty } => {
                debug!(
                    "Nonce difficulty {share_difficulty:.2} (target {})",
                    job.asic_difficulty
                );
                note_valid(&telemetry, &mut best_difficulty, &job, share_difficulty);
            }
            Evaluation::Submit {
                share_difficulty,
                share,
            } => {
                debug!(
                    "Nonce difficulty {share_difficulty:.2} meets pool target {}",
                    job.pool_difficulty
                );
                note_valid(&telemetry, &mut best_difficulty, &job, share_difficulty);
                if shares.try_send(share).is_err() {
                    warn!("Share queue full, dropping submission");
                }
            }
        }
    }

    debug!("Result handler stopped");
    Ok(())
}

/// Credit a genuine result to the hashrate estimate and the session best.
fn note_valid(
    telemetry: &Mutex<HashrateEstimator>,
    best_difficulty: &mut f64,
    job: &HardwareJob,
    share_difficulty: f64,
) {
    telemetry.lock().record(job.asic_difficulty);
    if share_difficulty > *best_difficulty {
        *best_difficulty = share_difficulty;
        info!("New best share difficulty {share_difficulty:.2}");
    }
}
