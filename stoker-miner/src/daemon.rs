//! Daemon lifecycle: component wiring, task supervision, signal
//! handling, and graceful shutdown.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal::unix::{self, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::asic::{sim::SimAsic, Asic};
use crate::board::Board;
use crate::config::Config;
use crate::registry::JobRegistry;
use crate::telemetry::HashrateEstimator;
use crate::tracing::prelude::*;
use crate::work::WorkState;
use crate::{results, stratum, work};

/// Depth of the share submission queue between the result pipeline and
/// the pool client.
const SHARE_QUEUE: usize = 64;

/// The main daemon, coordinating the pool client, the work builder, and
/// the result pipeline around shared work state.
pub struct Daemon {
    config: Config,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Run the daemon until SIGINT or SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        let state = Arc::new(WorkState::new());
        let registry = Arc::new(Mutex::new(JobRegistry::new()));
        let telemetry = Arc::new(Mutex::new(HashrateEstimator::new()));
        let board = Arc::new(Board::new(self.config.board_profile()));

        let (attach_tx, attach_rx) = watch::channel::<Option<Arc<dyn Asic>>>(None);
        let (share_tx, share_rx) = mpsc::channel(SHARE_QUEUE);

        let mut asic = SimAsic::new(self.config.sim.hashrate_mh, board.difficulty_bounds());
        let asic_results = asic
            .take_result_receiver()
            .ok_or_else(|| anyhow::anyhow!("hash engine has no result stream"))?;
        let asic: Arc<dyn Asic> = Arc::new(asic);

        self.tracker.spawn(log_errors(
            "work builder",
            work::builder::task(
                self.shutdown.clone(),
                state.clone(),
                registry.clone(),
                telemetry.clone(),
                attach_rx,
                board.clone(),
            ),
        ));
        self.tracker.spawn(log_errors(
            "pool client",
            stratum::task(
                self.shutdown.clone(),
                self.config.pool_config(),
                state.clone(),
                share_rx,
            ),
        ));
        self.tracker.spawn(log_errors(
            "result pipeline",
            results::task(
                self.shutdown.clone(),
                registry.clone(),
                telemetry.clone(),
                asic_results,
                share_tx,
            ),
        ));
        self.tracker.close();

        // Attach after the builder task is up; it idles until this.
        attach_tx.send_replace(Some(asic));
        info!(
            "Board {} attached ({:.0} MH/s simulated)",
            board.name(),
            self.config.sim.hashrate_mh,
        );

        info!("Started.");
        info!("Set RUST_LOG=stoker_miner=debug to watch job dispatch");

        let mut sigint = unix::signal(SignalKind::interrupt())?;
        let mut sigterm = unix::signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            },
        }

        trace!("Shutting down.");
        self.shutdown.cancel();

        self.tracker.wait().await;
        info!("Exiting.");

        Ok(())
    }
}

async fn log_errors(name: &'static str, task: impl Future<Output = anyhow::Result<()>>) {
    if let Err(error) = task.await {
        error!("{name} failed: {error:#}");
    }
}
