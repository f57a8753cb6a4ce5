//! Stratum v1 wire types and JSON-RPC serialization.

use bitcoin::block::Version;
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::work::extranonce2::Extranonce2;
use crate::work::job::StratumJob;

/// JSON-RPC message envelope.
///
/// Stratum predates JSON-RPC 2.0 and deviates from it: notifications carry
/// `id: null` instead of omitting the field, errors are plain arrays, and
/// there is no version field. A small custom envelope fits those quirks
/// better than a spec-compliant library would.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Request or notification, from either side.
    Request {
        /// `None` for notifications.
        id: Option<u64>,
        method: String,
        params: Value,
    },

    /// Response to a request.
    Response {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
}

impl JsonRpcMessage {
    pub fn request(id: u64, method: impl Into<String>, params: Value) -> Self {
        JsonRpcMessage::Request {
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    #[cfg(test)]
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        JsonRpcMessage::Request {
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            JsonRpcMessage::Request { id, .. } => *id,
            JsonRpcMessage::Response { id, .. } => Some(*id),
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request { method, .. } => Some(method),
            JsonRpcMessage::Response { .. } => None,
        }
    }
}

/// Parse `mining.notify` parameters into a work template.
///
/// All numeric fields arrive as big-endian hex strings. Errors carry the
/// offending field name so a bad notification can be logged and skipped.
pub fn parse_notify(params: &[Value]) -> Result<StratumJob, String> {
    if params.len() < 9 {
        return Err("mining.notify params too short".to_string());
    }

    let job_id = params[0].as_str().ok_or("job_id not a string")?.to_string();

    let prev_blockhash = parse_prev_blockhash(params[1].as_str().ok_or("prevhash not a string")?)?;

    let coinbase1 = hex::decode(params[2].as_str().ok_or("coinbase1 not a string")?)
        .map_err(|e| format!("coinbase1 hex: {e}"))?;
    let coinbase2 = hex::decode(params[3].as_str().ok_or("coinbase2 not a string")?)
        .map_err(|e| format!("coinbase2 hex: {e}"))?;

    let merkle_branches = params[4]
        .as_array()
        .ok_or("merkle branches not an array")?
        .iter()
        .map(|branch| parse_merkle_node(branch.as_str().ok_or("merkle branch not a string")?))
        .collect::<Result<Vec<_>, _>>()?;

    let version = Version::from_consensus(parse_hex_u32(&params[5], "version")? as i32);
    let bits = CompactTarget::from_consensus(parse_hex_u32(&params[6], "nbits")?);
    let time = parse_hex_u32(&params[7], "ntime")?;
    let clean_jobs = params[8].as_bool().ok_or("clean_jobs not a bool")?;

    Ok(StratumJob {
        job_id,
        prev_blockhash,
        version,
        bits,
        time,
        coinbase1,
        coinbase2,
        merkle_branches,
        clean_jobs,
    })
}

fn parse_hex_u32(value: &Value, field: &str) -> Result<u32, String> {
    let s = value.as_str().ok_or_else(|| format!("{field} not a string"))?;
    u32::from_str_radix(s, 16).map_err(|e| format!("{field} hex: {e}"))
}

/// Parse the previous block hash from its Stratum encoding.
///
/// Stratum transmits the hash as eight 32-bit words, each hex-encoded
/// big-endian while the words themselves stay in wire order. Reversing the
/// bytes within each 4-byte word recovers the internal byte array.
fn parse_prev_blockhash(hex: &str) -> Result<BlockHash, String> {
    let mut bytes = hex::decode(hex).map_err(|e| format!("prevhash hex: {e}"))?;
    if bytes.len() != 32 {
        return Err(format!("prevhash wrong length: {}", bytes.len()));
    }
    for word in bytes.chunks_mut(4) {
        word.reverse();
    }
    BlockHash::from_slice(&bytes).map_err(|e| format!("prevhash: {e}"))
}

fn parse_merkle_node(hex: &str) -> Result<TxMerkleNode, String> {
    let bytes = hex::decode(hex).map_err(|e| format!("merkle node hex: {e}"))?;
    TxMerkleNode::from_slice(&bytes).map_err(|e| format!("merkle node: {e}"))
}

/// A found share on its way to the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub job_id: String,
    pub extranonce2: Extranonce2,
    pub ntime: u32,
    pub nonce: u32,
    /// Version bits rolled by the accelerator, present only when a
    /// version-rolling mask is active.
    pub version_bits: Option<u32>,
}

impl Share {
    /// Encode as `mining.submit` parameters.
    pub fn to_stratum_params(&self, username: &str) -> Vec<Value> {
        let mut params = vec![
            Value::String(username.to_string()),
            Value::String(self.job_id.clone()),
            Value::String(self.extranonce2.to_string()),
            Value::String(format!("{:08x}", self.ntime)),
            Value::String(format!("{:08x}", self.nonce)),
        ];
        if let Some(bits) = self.version_bits {
            params.push(Value::String(format!("{bits:08x}")));
        }
        params
    }
}
