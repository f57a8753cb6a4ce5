//! Stratum v1 mining protocol client.
//!
//! JSON-RPC over TCP with newline-delimited messages. The client applies
//! server notifications (`mining.notify`, `mining.set_difficulty`,
//! `mining.set_version_mask`, `mining.set_extranonce`) straight to the
//! shared work state and submits shares handed to it over a channel,
//! correlating the pool's verdicts by request id.

mod client;
mod connection;
mod error;
mod messages;

pub use client::{task, PoolConfig};
pub use error::{StratumError, StratumResult};
pub use messages::Share;
