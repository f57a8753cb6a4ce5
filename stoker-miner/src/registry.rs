//! Registry of dispatched jobs, keyed by hardware slot id.
//!
//! The hardware identifies results only by the slot id it assigned at
//! submission, so every dispatched job is parked here until its slot is
//! reused. Results that reference an evicted slot are stale by definition.

use crate::work::job::HardwareJob;

/// Uses 256 slots to match the 8-bit job id space of the hardware
/// interface. The dispatcher hands each job over by value; the registry owns
/// it from then on and drops it when the slot is overwritten.
pub struct JobRegistry {
    slots: [Option<HardwareJob>; 256],
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            slots: [const { None }; 256],
        }
    }

    /// Park a job under the slot id the hardware assigned it.
    ///
    /// A job still occupying the slot is evicted; any result it might still
    /// produce will miss on lookup and be treated as stale.
    pub fn store(&mut self, slot: u8, job: HardwareJob) {
        self.slots[slot as usize] = Some(job);
    }

    /// Look up the job a result refers to.
    pub fn get(&self, slot: u8) -> Option<&HardwareJob> {
        self.slots[slot as usize].as_ref()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
