//! The work build loop.
//!
//! One task owns the cadence of the accelerator: it wakes on a paced timer
//! or on fresh pool work, assembles the next hardware job from shared
//! state, programs the difficulty mask when it changes, dispatches, and
//! retunes its own pace from the measured hashrate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::asic::Asic;
use crate::board::Board;
use crate::registry::JobRegistry;
use crate::telemetry::HashrateEstimator;
use crate::tracing::prelude::*;

use super::interval::IntervalController;
use super::state::WorkState;

/// Watch handle to the attached accelerator, `None` until the daemon
/// brings one up.
pub type AsicAttachment = watch::Receiver<Option<Arc<dyn Asic>>>;

/// Build and dispatch hardware jobs until cancelled.
///
/// Wakes on the pacing timer and whenever [`WorkState`] installs a new
/// template. Each wake re-reads the board's configured interval first; a
/// change there is treated as a user override and consumes the wake
/// without building.
pub async fn task(
    running: CancellationToken,
    state: Arc<WorkState>,
    registry: Arc<Mutex<JobRegistry>>,
    telemetry: Arc<Mutex<HashrateEstimator>>,
    attachment: AsicAttachment,
    board: Arc<Board>,
) -> Result<()> {
    let interval_rx = board.job_interval();
    let mut controller = IntervalController::new(*interval_rx.borrow(), board.nominal_gh());

    info!(
        "ASIC job interval {} ms (adaptive {}, nominal {:.1} GH/s)",
        controller.current_ms(),
        if controller.is_adaptive() { "on" } else { "off" },
        controller.nominal_gh(),
    );

    let mut ticker = make_ticker(controller.current_ms());
    let mut extranonce2: u32 = 0;
    let mut last_asic_difficulty: Option<u64> = None;
    let mut last_ntime: Option<u32> = None;
    let mut last_dispatch: Option<Instant> = None;

    while !running.is_cancelled() {
        tokio::select! {
            _ = running.cancelled() => break,
            _ = ticker.tick() => {}
            _ = state.notified() => {}
        }

        // An interval change is pure reconfiguration. Building resumes on
        // the next wake.
        if let Some(period_ms) = controller.reconfigure(*interval_rx.borrow()) {
            ticker = make_ticker(period_ms);
            info!("Job interval updated to {period_ms} ms (user override)");
            continue;
        }

        // Idle until both an accelerator and a work template exist.
        let Some(asic) = attachment.borrow().clone() else {
            continue;
        };
        let Some(job) = state.assemble(extranonce2, asic.difficulty_bounds()) else {
            continue;
        };

        if last_ntime != Some(job.time) {
            last_ntime = Some(job.time);
            info!("New work received, job {}", job.job_id);
        }

        if last_asic_difficulty != Some(job.asic_difficulty) {
            info!("New ASIC difficulty {}", job.asic_difficulty);
            if let Err(error) = asic.set_job_difficulty_mask(job.asic_difficulty).await {
                warn!("Difficulty mask programming failed: {error}");
                continue;
            }
            last_asic_difficulty = Some(job.asic_difficulty);
        }

        let now = Instant::now();
        if let Some(previous) = last_dispatch {
            debug!("job interval {}ms", now.duration_since(previous).as_millis());
        }
        last_dispatch = Some(now);

        let slot = match asic.send_work(extranonce2, &job).await {
            Ok(slot) => slot,
            Err(error) => {
                warn!("Work dispatch failed: {error}");
                continue;
            }
        };
        debug!("Sent job: {slot:02X}");

        registry.lock().store(slot, job);
        extranonce2 = extranonce2.wrapping_add(1);

        let measured_gh = telemetry.lock().hashrate_gh();
        if let Some(rearm) = controller.after_dispatch(measured_gh) {
            ticker = make_ticker(rearm.interval_ms);
            debug!(
                "Adaptive job interval -> {} ms (target {} ms)",
                rearm.interval_ms, rearm.target_ms,
            );
        }
    }

    debug!("Work builder stopped");
    Ok(())
}

/// A fresh pacing timer that first fires one full period from now.
fn make_ticker(period_ms: u32) -> Interval {
    let period = Duration::from_millis(u64::from(period_ms));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
