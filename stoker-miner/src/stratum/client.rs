//! Stratum v1 pool client.
//!
//! The client runs as one supervising task: it dials the pool, performs
//! the handshake (configure, subscribe, authorize), then settles into a
//! session loop that applies server notifications to the shared
//! [`WorkState`] and submits shares from the results channel. A lost
//! session is retried after a fixed delay until shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::tracing::prelude::*;
use crate::work::WorkState;

use super::connection::{Connection, Transport};
use super::error::{StratumError, StratumResult};
use super::messages::{self, JsonRpcMessage, Share};

/// Version-rolling mask requested from the pool (general-purpose bits
/// 13..=28).
const REQUESTED_VERSION_MASK: &str = "1fffe000";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pool connection configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pool URL (`stratum+tcp://host:port` or `host:port`).
    pub url: String,

    /// Worker username, typically a payout address with a worker suffix.
    pub username: String,

    pub password: String,

    pub user_agent: String,

    /// Share difficulty suggested right after authorization, `None` to
    /// accept the pool default.
    pub suggest_difficulty: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: "x".to_string(),
            user_agent: concat!("stoker-miner/", env!("CARGO_PKG_VERSION")).to_string(),
            suggest_difficulty: None,
        }
    }
}

/// Accept/reject counts across the life of the process.
#[derive(Debug, Default)]
struct ShareTally {
    accepted: u64,
    rejected: u64,
}

/// A submitted share awaiting the pool's verdict, keyed by request id.
struct PendingShare {
    job_id: String,
    nonce: u32,
}

/// One connected session with the pool.
///
/// Built fresh for every (re)connection; in-flight submits do not survive
/// a session because their request ids die with the socket.
struct Session<'a> {
    config: &'a PoolConfig,
    state: &'a WorkState,
    shares: &'a mut mpsc::Receiver<Share>,
    shutdown: &'a CancellationToken,
    tally: &'a mut ShareTally,
    next_id: u64,
    pending: HashMap<u64, PendingShare>,
}

impl<'a> Session<'a> {
    fn new(
        config: &'a PoolConfig,
        state: &'a WorkState,
        shares: &'a mut mpsc::Receiver<Share>,
        shutdown: &'a CancellationToken,
        tally: &'a mut ShareTally,
    ) -> Self {
        Self {
            config,
            state,
            shares,
            shutdown,
            tally,
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run the session to completion over `conn`.
    ///
    /// Returns `Ok` on shutdown, `Err` when the session should be retried.
    async fn run(mut self, mut conn: impl Transport) -> StratumResult<()> {
        self.handshake(&mut conn).await?;

        loop {
            tokio::select! {
                result = conn.read_message() => match result {
                    Ok(Some(message)) => self.handle_message(message)?,
                    Ok(None) => {
                        info!("Connection closed by pool");
                        return Err(StratumError::Disconnected);
                    }
                    Err(StratumError::InvalidMessage(detail)) => {
                        warn!("Ignoring malformed pool message: {detail}");
                    }
                    Err(error) => return Err(error),
                },

                share = self.shares.recv() => match share {
                    Some(share) => self.submit(&mut conn, share).await?,
                    // Producer gone, the daemon is tearing down.
                    None => return Ok(()),
                },

                _ = self.shutdown.cancelled() => return Ok(()),
            }
        }
    }

    async fn handshake(&mut self, conn: &mut dyn Transport) -> StratumResult<()> {
        if let Some(mask) = self.configure_version_rolling(conn).await? {
            info!("Pool authorized version rolling mask {mask:#010x}");
            self.state.set_version_mask(mask);
        }

        self.subscribe(conn).await?;
        self.authorize(conn).await?;
        debug!("Authorized as {}", self.config.username);

        if let Some(difficulty) = self.config.suggest_difficulty {
            self.suggest_difficulty(conn, difficulty).await?;
        }

        Ok(())
    }

    /// Send a request and wait for its response.
    ///
    /// Stratum interleaves notifications with request/response pairs, so
    /// this loops over incoming messages and applies notifications until
    /// the matching response arrives.
    async fn send_request(
        &mut self,
        conn: &mut dyn Transport,
        method: &str,
        params: Value,
    ) -> StratumResult<JsonRpcMessage> {
        let id = self.next_id();
        conn.write_message(&JsonRpcMessage::request(id, method, params))
            .await?;

        tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            loop {
                tokio::select! {
                    result = conn.read_message() => {
                        let message = result?.ok_or(StratumError::Disconnected)?;
                        match message {
                            JsonRpcMessage::Response { id: response_id, .. }
                                if response_id == id =>
                            {
                                return Ok(message);
                            }
                            JsonRpcMessage::Response { id: other, .. } => {
                                debug!("Response for request {other} while waiting on {id}");
                            }
                            JsonRpcMessage::Request { id: None, method, params } => {
                                if let Err(error) = self.apply_notification(&method, &params) {
                                    warn!("Notification during handshake: {error}");
                                }
                            }
                            JsonRpcMessage::Request { id: Some(_), method, .. } => {
                                warn!("Pool sent a request during handshake: {method}");
                            }
                        }
                    }
                    _ = self.shutdown.cancelled() => {
                        return Err(StratumError::Disconnected);
                    }
                }
            }
        })
        .await
        .map_err(|_| StratumError::Timeout)?
    }

    /// Negotiate version rolling with `mining.configure`.
    ///
    /// Optional extension; a pool that errors out or stays silent leaves
    /// the miner rolling nothing.
    async fn configure_version_rolling(
        &mut self,
        conn: &mut dyn Transport,
    ) -> StratumResult<Option<u32>> {
        let params = json!([
            ["version-rolling"],
            {"version-rolling.mask": REQUESTED_VERSION_MASK}
        ]);

        match self.send_request(conn, "mining.configure", params).await {
            Ok(JsonRpcMessage::Response {
                result: Some(result),
                error: None,
                ..
            }) => {
                let accepted = result
                    .get("version-rolling")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if !accepted {
                    debug!("Pool declined version rolling");
                    return Ok(None);
                }

                let mask = result
                    .get("version-rolling.mask")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        StratumError::InvalidMessage("version-rolling.mask missing".to_string())
                    })?;
                let mask = u32::from_str_radix(mask.trim_start_matches("0x"), 16)
                    .map_err(|_| {
                        StratumError::InvalidMessage("version-rolling.mask not hex".to_string())
                    })?;
                Ok(Some(mask))
            }
            Ok(JsonRpcMessage::Response { error: Some(_), .. }) => {
                debug!("Pool does not support mining.configure");
                Ok(None)
            }
            Ok(_) => Ok(None),
            Err(StratumError::Timeout) => {
                debug!("Pool ignored mining.configure");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn subscribe(&mut self, conn: &mut dyn Transport) -> StratumResult<()> {
        let response = self
            .send_request(conn, "mining.subscribe", json!([self.config.user_agent]))
            .await?;

        match response {
            JsonRpcMessage::Response {
                result: Some(result),
                error: None,
                ..
            } => {
                // Result shape: [[subscriptions...], extranonce1, extranonce2_size]
                let fields = result.as_array().ok_or_else(|| {
                    StratumError::InvalidMessage("subscribe result not an array".to_string())
                })?;
                if fields.len() < 3 {
                    return Err(StratumError::InvalidMessage(
                        "subscribe result too short".to_string(),
                    ));
                }

                let extranonce1 = fields[1].as_str().ok_or_else(|| {
                    StratumError::InvalidMessage("extranonce1 not a string".to_string())
                })?;
                let prefix = hex::decode(extranonce1).map_err(|e| {
                    StratumError::InvalidMessage(format!("extranonce1 hex: {e}"))
                })?;

                let size = fields[2].as_u64().ok_or_else(|| {
                    StratumError::InvalidMessage("extranonce2_size not a number".to_string())
                })?;
                let size = u8::try_from(size).map_err(|_| {
                    StratumError::SubscriptionFailed(format!("extranonce2_size {size} out of range"))
                })?;

                self.state
                    .set_extranonce(prefix, size)
                    .map_err(|e| StratumError::SubscriptionFailed(e.to_string()))?;

                debug!("Subscribed, extranonce1 0x{extranonce1}, {size} byte extranonce2");
                Ok(())
            }
            JsonRpcMessage::Response {
                error: Some(error), ..
            } => Err(StratumError::SubscriptionFailed(format!("{error:?}"))),
            _ => Err(StratumError::UnexpectedResponse(
                "mining.subscribe".to_string(),
            )),
        }
    }

    async fn authorize(&mut self, conn: &mut dyn Transport) -> StratumResult<()> {
        let response = self
            .send_request(
                conn,
                "mining.authorize",
                json!([self.config.username, self.config.password]),
            )
            .await?;

        match response {
            JsonRpcMessage::Response {
                result: Some(result),
                error: None,
                ..
            } => {
                if result.as_bool().unwrap_or(false) {
                    Ok(())
                } else {
                    Err(StratumError::AuthorizationFailed(
                        "pool returned false".to_string(),
                    ))
                }
            }
            JsonRpcMessage::Response {
                error: Some(error), ..
            } => Err(StratumError::AuthorizationFailed(format!("{error:?}"))),
            _ => Err(StratumError::UnexpectedResponse(
                "mining.authorize".to_string(),
            )),
        }
    }

    /// Hint the preferred share difficulty.
    ///
    /// Sent with an id because some pools drop clients that send it as a
    /// notification. No reply is awaited; pools that honor the hint answer
    /// indirectly with `mining.set_difficulty`, and a direct response
    /// lands in the session loop as a stray.
    async fn suggest_difficulty(
        &mut self,
        conn: &mut dyn Transport,
        difficulty: u64,
    ) -> StratumResult<()> {
        debug!("Suggesting difficulty {difficulty}");
        let id = self.next_id();
        conn.write_message(&JsonRpcMessage::request(
            id,
            "mining.suggest_difficulty",
            json!([difficulty]),
        ))
        .await
    }

    /// Submit a share without blocking the session loop.
    ///
    /// The pool's verdict is matched back up by request id in
    /// [`Session::resolve_response`].
    async fn submit(&mut self, conn: &mut dyn Transport, share: Share) -> StratumResult<()> {
        let id = self.next_id();
        debug!(
            "Submitting share, job {} nonce {:08x}",
            share.job_id, share.nonce
        );

        let message = JsonRpcMessage::request(
            id,
            "mining.submit",
            Value::Array(share.to_stratum_params(&self.config.username)),
        );
        self.pending.insert(
            id,
            PendingShare {
                job_id: share.job_id,
                nonce: share.nonce,
            },
        );
        conn.write_message(&message).await
    }

    fn handle_message(&mut self, message: JsonRpcMessage) -> StratumResult<()> {
        match message {
            JsonRpcMessage::Request {
                id: None,
                method,
                params,
            } => {
                if let Err(error) = self.apply_notification(&method, &params) {
                    if matches!(error, StratumError::Disconnected) {
                        return Err(error);
                    }
                    warn!("Notification handling failed: {error}");
                }
            }
            JsonRpcMessage::Response { id, result, error } => {
                self.resolve_response(id, result, error);
            }
            JsonRpcMessage::Request {
                id: Some(_),
                method,
                ..
            } => {
                warn!("Pool sent a request: {method}");
            }
        }
        Ok(())
    }

    /// Apply a server notification to the shared work state.
    fn apply_notification(&mut self, method: &str, params: &Value) -> StratumResult<()> {
        match method {
            "mining.notify" => {
                let params = params.as_array().ok_or_else(|| {
                    StratumError::InvalidMessage("mining.notify params not an array".to_string())
                })?;
                let job = messages::parse_notify(params).map_err(StratumError::InvalidMessage)?;
                debug!(
                    "Work notification, job {} ({} branches{})",
                    job.job_id,
                    job.merkle_branches.len(),
                    if job.clean_jobs { ", clean" } else { "" },
                );
                self.state.install_job(job);
            }

            "mining.set_difficulty" => {
                let difficulty = params
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        StratumError::InvalidMessage("set_difficulty params malformed".to_string())
                    })?;
                if self.state.set_pool_difficulty(difficulty) {
                    info!("Pool difficulty {difficulty}");
                }
            }

            "mining.set_version_mask" => {
                let mask = params
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        StratumError::InvalidMessage(
                            "set_version_mask params malformed".to_string(),
                        )
                    })?;
                let mask = u32::from_str_radix(mask.trim_start_matches("0x"), 16)
                    .map_err(|_| {
                        StratumError::InvalidMessage("version mask not hex".to_string())
                    })?;
                info!("Version rolling mask {mask:#010x}");
                self.state.set_version_mask(mask);
            }

            "mining.set_extranonce" => {
                let fields = params.as_array().ok_or_else(|| {
                    StratumError::InvalidMessage("set_extranonce params malformed".to_string())
                })?;
                if fields.len() < 2 {
                    return Err(StratumError::InvalidMessage(
                        "set_extranonce params too short".to_string(),
                    ));
                }
                let prefix = fields[0]
                    .as_str()
                    .ok_or_else(|| {
                        StratumError::InvalidMessage("extranonce1 not a string".to_string())
                    })
                    .and_then(|s| {
                        hex::decode(s).map_err(|e| {
                            StratumError::InvalidMessage(format!("extranonce1 hex: {e}"))
                        })
                    })?;
                let size = fields[1]
                    .as_u64()
                    .and_then(|s| u8::try_from(s).ok())
                    .ok_or_else(|| {
                        StratumError::InvalidMessage("extranonce2_size malformed".to_string())
                    })?;
                self.state
                    .set_extranonce(prefix, size)
                    .map_err(|e| StratumError::InvalidMessage(e.to_string()))?;
                debug!("Extranonce updated, {size} byte extranonce2");
            }

            "client.reconnect" => {
                info!("Pool requested reconnect");
                return Err(StratumError::Disconnected);
            }

            _ => {
                warn!("Unknown notification method {method}");
            }
        }
        Ok(())
    }

    /// Match a response to a pending submit and record the verdict.
    fn resolve_response(&mut self, id: u64, result: Option<Value>, error: Option<Value>) {
        let Some(share) = self.pending.remove(&id) else {
            debug!("Stray response for request {id}");
            return;
        };

        let accepted = error.is_none() && result.and_then(|v| v.as_bool()).unwrap_or(false);
        if accepted {
            self.tally.accepted += 1;
            info!(
                "Share accepted, job {} nonce {:08x} ({} accepted, {} rejected)",
                share.job_id, share.nonce, self.tally.accepted, self.tally.rejected,
            );
        } else {
            self.tally.rejected += 1;
            // Error shape: [code, "message", traceback]
            let reason = error
                .as_ref()
                .and_then(Value::as_array)
                .and_then(|a| a.get(1))
                .and_then(Value::as_str)
                .unwrap_or("pool returned false");
            warn!(
                "Share rejected, job {}: {reason} ({} accepted, {} rejected)",
                share.job_id, self.tally.accepted, self.tally.rejected,
            );
        }
    }
}

/// Maintain the pool connection until cancelled.
///
/// Runs one session at a time and retries after a fixed delay whenever a
/// session ends for any reason other than shutdown. Shares queued while
/// disconnected are submitted by the next session; the pool rejects any
/// whose job has gone stale.
pub async fn task(
    running: CancellationToken,
    config: PoolConfig,
    state: Arc<WorkState>,
    mut shares: mpsc::Receiver<Share>,
) -> Result<()> {
    let mut tally = ShareTally::default();

    while !running.is_cancelled() {
        info!("Connecting to {}", config.url);
        let outcome = match Connection::connect(&config.url).await {
            Ok(conn) => {
                Session::new(&config, &state, &mut shares, &running, &mut tally)
                    .run(conn)
                    .await
            }
            Err(error) => Err(error),
        };

        match outcome {
            Ok(()) => break,
            Err(error) => warn!("Pool session ended: {error}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = running.cancelled() => break,
        }
    }

    debug!("Pool client stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asic::DifficultyBounds;
    use crate::stratum::connection::{MockTransport, MockTransportHandle};
    use crate::work::test_blocks::block_881423 as golden;
    use tokio::task::JoinHandle;

    const WIDE: DifficultyBounds = DifficultyBounds {
        min: 1,
        max: u64::MAX,
    };

    fn test_config() -> PoolConfig {
        PoolConfig {
            url: "stratum+tcp://pool.example:3333".to_string(),
            username: "worker".to_string(),
            suggest_difficulty: Some(8192),
            ..PoolConfig::default()
        }
    }

    fn response(id: u64, result: Value) -> JsonRpcMessage {
        JsonRpcMessage::Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error_response(id: u64, error: Value) -> JsonRpcMessage {
        JsonRpcMessage::Response {
            id,
            result: None,
            error: Some(error),
        }
    }

    fn golden_notify() -> JsonRpcMessage {
        let branches: Vec<Value> = golden::MERKLE_BRANCHES
            .iter()
            .map(|branch| Value::String(hex::encode(branch)))
            .collect();
        JsonRpcMessage::notification(
            "mining.notify",
            json!([
                "6a3f",
                golden::NOTIFY_PREVHASH,
                hex::encode(golden::coinbase1_bytes()),
                hex::encode(golden::coinbase2_bytes()),
                branches,
                "2e596000",
                "17029a8a",
                "679ac169",
                true
            ]),
        )
    }

    struct Rig {
        state: Arc<WorkState>,
        shares: mpsc::Sender<Share>,
        shutdown: CancellationToken,
        handle: JoinHandle<StratumResult<()>>,
    }

    fn spawn_session(config: PoolConfig) -> (Rig, MockTransportHandle) {
        let (transport, handle) = MockTransport::pair();
        let state = Arc::new(WorkState::default());
        let (share_tx, share_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let session = tokio::spawn({
            let state = state.clone();
            let shutdown = shutdown.clone();
            async move {
                let mut shares = share_rx;
                let mut tally = ShareTally::default();
                Session::new(&config, &state, &mut shares, &shutdown, &mut tally)
                    .run(transport)
                    .await
            }
        });

        (
            Rig {
                state,
                shares: share_tx,
                shutdown,
                handle: session,
            },
            handle,
        )
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    /// Drive the handshake from the pool side, accepting version rolling.
    async fn run_handshake(pool: &mut MockTransportHandle) {
        let configure = pool.recv().await;
        assert_eq!(configure.method(), Some("mining.configure"));
        pool.send(response(
            configure.id().unwrap(),
            json!({"version-rolling": true, "version-rolling.mask": "1fffe000"}),
        ));

        let subscribe = pool.recv().await;
        assert_eq!(subscribe.method(), Some("mining.subscribe"));
        pool.send(response(
            subscribe.id().unwrap(),
            json!([
                [["mining.notify", "ae6812eb4cd7735a302a8a9dd95cf71f"]],
                "04830cee",
                4
            ]),
        ));

        let authorize = pool.recv().await;
        assert_eq!(authorize.method(), Some("mining.authorize"));
        pool.send(response(authorize.id().unwrap(), json!(true)));

        let suggest = pool.recv().await;
        assert_eq!(suggest.method(), Some("mining.suggest_difficulty"));
    }

    #[tokio::test]
    async fn test_handshake_and_notify_program_work_state() {
        let (rig, mut pool) = spawn_session(test_config());

        let configure = pool.recv().await;
        match &configure {
            JsonRpcMessage::Request { params, .. } => {
                assert_eq!(
                    *params,
                    json!([
                        ["version-rolling"],
                        {"version-rolling.mask": "1fffe000"}
                    ])
                );
            }
            JsonRpcMessage::Response { .. } => panic!("expected request"),
        }
        pool.send(response(
            configure.id().unwrap(),
            json!({"version-rolling": true, "version-rolling.mask": "1fffe000"}),
        ));

        let subscribe = pool.recv().await;
        pool.send(response(
            subscribe.id().unwrap(),
            json!([[], "04830cee", 4]),
        ));
        let authorize = pool.recv().await;
        pool.send(response(authorize.id().unwrap(), json!(true)));

        let suggest = pool.recv().await;
        match &suggest {
            JsonRpcMessage::Request { method, params, .. } => {
                assert_eq!(method, "mining.suggest_difficulty");
                assert_eq!(*params, json!([8192]));
            }
            JsonRpcMessage::Response { .. } => panic!("expected request"),
        }

        pool.send(golden_notify());
        settle().await;

        let job = rig
            .state
            .assemble(golden::extranonce2().value(), WIDE)
            .unwrap();
        assert_eq!(job.merkle_root, *golden::MERKLE_ROOT);
        assert_eq!(job.version_mask, 0x1fffe000);

        rig.shutdown.cancel();
        rig.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_configure_declined_leaves_mask_clear() {
        let config = PoolConfig {
            suggest_difficulty: None,
            ..test_config()
        };
        let (rig, mut pool) = spawn_session(config);

        let configure = pool.recv().await;
        pool.send(error_response(
            configure.id().unwrap(),
            json!([20, "Method not found", null]),
        ));

        let subscribe = pool.recv().await;
        assert_eq!(subscribe.method(), Some("mining.subscribe"));
        pool.send(response(
            subscribe.id().unwrap(),
            json!([[], "04830cee", 4]),
        ));
        let authorize = pool.recv().await;
        pool.send(response(authorize.id().unwrap(), json!(true)));

        pool.send(golden_notify());
        settle().await;

        // No suggest_difficulty was configured, so nothing else was written.
        assert!(pool.try_recv().is_none());

        let job = rig.state.assemble(0, WIDE).unwrap();
        assert_eq!(job.version_mask, 0);

        rig.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_share_submit_roundtrip() {
        let (rig, mut pool) = spawn_session(test_config());
        run_handshake(&mut pool).await;

        rig.shares
            .send(Share {
                job_id: "6a3f".to_string(),
                extranonce2: golden::extranonce2(),
                ntime: golden::TIME,
                nonce: golden::NONCE,
                version_bits: None,
            })
            .await
            .unwrap();

        let submit = pool.recv().await;
        let submit_id = submit.id().unwrap();
        match submit {
            JsonRpcMessage::Request { method, params, .. } => {
                assert_eq!(method, "mining.submit");
                assert_eq!(
                    params,
                    json!(["worker", "6a3f", "220cf1ad", "679ac169", "ff05fb02"])
                );
            }
            JsonRpcMessage::Response { .. } => panic!("expected request"),
        }
        pool.send(response(submit_id, json!(true)));

        // A rejected share with version bits.
        rig.shares
            .send(Share {
                job_id: "6a3f".to_string(),
                extranonce2: golden::extranonce2(),
                ntime: golden::TIME,
                nonce: golden::NONCE,
                version_bits: Some(0x0004_6000),
            })
            .await
            .unwrap();

        let submit = pool.recv().await;
        let submit_id = submit.id().unwrap();
        match submit {
            JsonRpcMessage::Request { params, .. } => {
                assert_eq!(params[5], json!("00046000"));
            }
            JsonRpcMessage::Response { .. } => panic!("expected request"),
        }
        pool.send(error_response(
            submit_id,
            json!([23, "Low difficulty share", null]),
        ));
        settle().await;

        // The session keeps serving notifications after both verdicts.
        pool.send(golden_notify());
        settle().await;
        assert!(rig.state.assemble(0, WIDE).is_some());

        rig.shutdown.cancel();
        rig.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_set_difficulty_applies_to_next_template() {
        let (rig, mut pool) = spawn_session(test_config());
        run_handshake(&mut pool).await;

        pool.send(JsonRpcMessage::notification(
            "mining.set_difficulty",
            json!([16384]),
        ));
        pool.send(golden_notify());
        settle().await;

        let job = rig.state.assemble(0, WIDE).unwrap();
        assert_eq!(job.pool_difficulty, 16384);

        rig.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_pool_reconnect_request_ends_session() {
        let (rig, mut pool) = spawn_session(test_config());
        run_handshake(&mut pool).await;

        pool.send(JsonRpcMessage::notification("client.reconnect", json!([])));
        let outcome = rig.handle.await.unwrap();
        assert!(matches!(outcome, Err(StratumError::Disconnected)));
    }

    #[tokio::test]
    async fn test_malformed_notification_is_skipped() {
        let (rig, mut pool) = spawn_session(test_config());
        run_handshake(&mut pool).await;

        pool.send(JsonRpcMessage::notification(
            "mining.notify",
            json!(["only", "three", "params"]),
        ));
        pool.send(JsonRpcMessage::notification(
            "mining.set_difficulty",
            json!(["not a number"]),
        ));
        settle().await;
        assert!(rig.state.assemble(0, WIDE).is_none());

        pool.send(golden_notify());
        settle().await;
        assert!(rig.state.assemble(0, WIDE).is_some());

        rig.shutdown.cancel();
        rig.handle.await.unwrap().unwrap();
    }
}
