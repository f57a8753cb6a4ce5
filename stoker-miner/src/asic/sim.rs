//! Software-simulated accelerator.
//!
//! Hashes real double-SHA256 over the dispatched job's header in paced
//! batches, reporting any nonce whose share difficulty clears the
//! programmed mask. At software rates and realistic masks results are rare;
//! the point of the simulator is to exercise the dispatch path (slot
//! assignment, mask programming, pacing) against something that behaves
//! like hardware, not to find blocks.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::difficulty::share_difficulty;
use crate::work::job::HardwareJob;

use super::{Asic, AsicError, AsicResult, DifficultyBounds};

/// One batch of hashing per tick, like a chip working between polls.
const BATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Cap on hashes per batch so a generous configured rate cannot stall the
/// runtime; effective simulated rate tops out around 2 MH/s.
const MAX_BATCH: u32 = 200_000;

const MIN_BATCH: u32 = 1_000;

/// Results waiting for the result task. A full queue drops, as a hardware
/// FIFO would.
const RESULT_QUEUE: usize = 64;

/// Handle to a simulated accelerator.
///
/// Spawns its engine task on construction; the engine exits when the last
/// handle is dropped.
pub struct SimAsic {
    commands: mpsc::Sender<Command>,
    results: Option<mpsc::Receiver<AsicResult>>,
    bounds: DifficultyBounds,
}

enum Command {
    SetDifficultyMask(u64),
    SendWork {
        job: HardwareJob,
        reply: oneshot::Sender<u8>,
    },
}

impl SimAsic {
    /// Start a simulated accelerator hashing at roughly `hashrate_mh`
    /// megahashes per second.
    pub fn new(hashrate_mh: f64, bounds: DifficultyBounds) -> Self {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (result_tx, result_rx) = mpsc::channel(RESULT_QUEUE);
        let ticks_per_sec = 1000.0 / BATCH_INTERVAL.as_millis() as f64;
        let engine = Engine {
            commands: command_rx,
            results: result_tx,
            batch: ((hashrate_mh * 1e6 / ticks_per_sec) as u32).clamp(MIN_BATCH, MAX_BATCH),
            mask: u64::MAX,
            job: None,
            slot: 0,
            next_slot: 0,
            nonce: 0,
        };
        tokio::spawn(engine.run());
        Self {
            commands: command_tx,
            results: Some(result_rx),
            bounds,
        }
    }
}

#[async_trait]
impl Asic for SimAsic {
    async fn set_job_difficulty_mask(&self, difficulty: u64) -> Result<(), AsicError> {
        self.commands
            .send(Command::SetDifficultyMask(difficulty))
            .await
            .map_err(|_| AsicError::Offline)
    }

    async fn send_work(&self, extranonce2: u32, job: &HardwareJob) -> Result<u8, AsicError> {
        trace!("queueing work, extranonce2 {extranonce2:08x}");
        let (reply, slot) = oneshot::channel();
        self.commands
            .send(Command::SendWork {
                job: job.clone(),
                reply,
            })
            .await
            .map_err(|_| AsicError::Offline)?;
        slot.await.map_err(|_| AsicError::Offline)
    }

    fn difficulty_bounds(&self) -> DifficultyBounds {
        self.bounds
    }

    fn take_result_receiver(&mut self) -> Option<mpsc::Receiver<AsicResult>> {
        self.results.take()
    }
}

/// The engine's half of the actor: a command queue, the job being worked,
/// and the nonce sweep position.
struct Engine {
    commands: mpsc::Receiver<Command>,
    results: mpsc::Sender<AsicResult>,
    batch: u32,
    /// No results are reported until the first mask is programmed.
    mask: u64,
    job: Option<HardwareJob>,
    slot: u8,
    next_slot: u8,
    nonce: u32,
}

impl Engine {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(BATCH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = ticker.tick() => self.hash_batch(),
            }
        }
        debug!("engine stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::SetDifficultyMask(difficulty) => {
                debug!("difficulty mask set to {difficulty}");
                self.mask = difficulty;
            }
            Command::SendWork { job, reply } => {
                let slot = self.next_slot;
                self.next_slot = self.next_slot.wrapping_add(1);
                trace!("job {} assigned slot {slot:02X}", job.job_id);
                self.slot = slot;
                self.job = Some(job);
                self.nonce = 0;
                let _ = reply.send(slot);
            }
        }
    }

    /// Sweep one batch of nonces over the current job.
    fn hash_batch(&mut self) {
        let Some(job) = &self.job else { return };
        let mask = self.mask as f64;

        for _ in 0..self.batch {
            let header = job.header(job.version, self.nonce);
            if share_difficulty(&header.block_hash()) >= mask {
                let result = AsicResult {
                    slot: self.slot,
                    nonce: self.nonce,
                    version: job.version,
                };
                match self.results.try_send(result) {
                    Ok(()) => debug!("found nonce {:08x} in slot {:02X}", self.nonce, self.slot),
                    Err(mpsc::error::TrySendError::Full(_)) => trace!("result queue full, dropping"),
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                }
            }
            let (next, wrapped) = self.nonce.overflowing_add(1);
            self.nonce = next;
            if wrapped {
                debug!("slot {:02X} nonce space exhausted, rescanning", self.slot);
            }
        }
    }
}
