//! Adaptive pacing of job dispatch.
//!
//! The dispatch cadence should sit near the time the hardware needs to sweep
//! one job's nonce space: replacing jobs much faster wastes dispatch
//! overhead, much slower leaves the chip idle at the end of the space. The
//! controller recomputes a hash-rate-derived target after every dispatch and
//! converges the armed timer period toward it, asymmetrically damped so a
//! fast chip is fed sooner while a slow estimate cannot cause oscillation.

use std::time::Duration;

/// Dispatch intervals are never armed below this, whatever the math says.
pub const MIN_INTERVAL_MS: u32 = 200;

/// Fraction of the full nonce-space sweep time to aim for.
const SAFETY_FACTOR: f64 = 0.7;

/// Measured hash rate below this is treated as not credible and the board's
/// nominal rate is used instead.
const MEASURED_THRESHOLD_GH: f64 = 100.0;

/// Timer re-arms are suppressed while the blended interval stays within this
/// distance of the armed one.
const REARM_HYSTERESIS_MS: u32 = 10;

fn clamp_interval(ms: u32) -> u32 {
    ms.max(MIN_INTERVAL_MS)
}

/// Hash-rate-derived recommendation for the dispatch interval.
///
/// A non-positive rate disables adaptation for the cycle by recommending the
/// configured interval itself. Otherwise the full nonce-space sweep time is
/// scaled by the safety factor, floor-clamped, and capped at the configured
/// ceiling.
pub fn target_ms(rate_gh: f64, configured_ms: u32) -> u32 {
    if rate_gh <= 0.0 {
        return configured_ms;
    }
    let nonces_per_job = 4_294_967_296.0; // 2^32
    let job_seconds = nonces_per_job / (rate_gh * 1e9);
    let target = (job_seconds * 1000.0 * SAFETY_FACTOR).ceil() as u32;
    clamp_interval(target).min(configured_ms)
}

/// Blend the armed interval one damped step toward the target.
///
/// Downward moves react at 1/4 per step so a faster chip is not starved;
/// upward moves at 1/8 per step, additionally capped at the configured
/// ceiling. Division truncates; the truncation direction is load-bearing for
/// the hysteresis behavior and must not be changed to rounding.
pub fn blend(current_ms: u32, target_ms: u32, configured_ms: u32) -> u32 {
    if target_ms < current_ms {
        clamp_interval(((current_ms as u64 * 3 + target_ms as u64) / 4) as u32)
    } else if target_ms > current_ms {
        let blended = ((current_ms as u64 * 7 + target_ms as u64) / 8) as u32;
        clamp_interval(blended.min(configured_ms))
    } else {
        current_ms
    }
}

/// A timer re-arm decided by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rearm {
    /// New period to arm the dispatch timer with.
    pub interval_ms: u32,
    /// The instantaneous target that drove the change.
    pub target_ms: u32,
}

/// Per-task pacing state: the configured ceiling, the armed period, and
/// whether adaptation is enabled at all.
#[derive(Debug)]
pub struct IntervalController {
    configured_ms: u32,
    current_ms: u32,
    /// Raw board setting last observed, before floor clamping. Override
    /// detection compares against this, so a board flapping between two
    /// sub-floor values still re-arms.
    last_raw_ms: u32,
    nominal_gh: f64,
    /// Fixed at construction; a rate that later crosses the credibility
    /// threshold does not turn adaptation on.
    adaptive: bool,
}

impl IntervalController {
    pub fn new(board_interval_ms: u32, nominal_gh: f64) -> Self {
        let configured_ms = clamp_interval(board_interval_ms);
        Self {
            configured_ms,
            current_ms: configured_ms,
            last_raw_ms: board_interval_ms,
            nominal_gh,
            adaptive: nominal_gh > 0.0,
        }
    }

    pub fn current_ms(&self) -> u32 {
        self.current_ms
    }

    pub fn current_period(&self) -> Duration {
        Duration::from_millis(self.current_ms as u64)
    }

    pub fn configured_ms(&self) -> u32 {
        self.configured_ms
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn nominal_gh(&self) -> f64 {
        self.nominal_gh
    }

    /// Apply an externally changed board interval.
    ///
    /// Returns the new period to arm when the raw value differs from the
    /// last observed one. The override discards any adapted state and snaps
    /// the armed period back to the (floor-clamped) configured value.
    pub fn reconfigure(&mut self, board_interval_ms: u32) -> Option<u32> {
        if board_interval_ms == self.last_raw_ms {
            return None;
        }
        self.last_raw_ms = board_interval_ms;
        self.configured_ms = clamp_interval(board_interval_ms);
        self.current_ms = self.configured_ms;
        Some(self.current_ms)
    }

    /// Measured rate if credible, else the board's nominal rate.
    fn effective_rate_gh(&self, measured_gh: f64) -> f64 {
        if measured_gh > MEASURED_THRESHOLD_GH {
            measured_gh
        } else {
            self.nominal_gh
        }
    }

    /// Run one control step after a dispatched job.
    ///
    /// Returns a re-arm decision when the blended interval moved at least
    /// the hysteresis distance. A blended value inside the hysteresis band
    /// is discarded outright rather than accumulated, so sustained noise
    /// near the threshold never creeps the period.
    pub fn after_dispatch(&mut self, measured_gh: f64) -> Option<Rearm> {
        if !self.adaptive {
            return None;
        }

        let target = target_ms(self.effective_rate_gh(measured_gh), self.configured_ms);
        let new = blend(self.current_ms, target, self.configured_ms);

        if new.abs_diff(self.current_ms) < REARM_HYSTERESIS_MS {
            return None;
        }

        self.current_ms = new;
        Some(Rearm {
            interval_ms: new,
            target_ms: target,
        })
    }
}
