//! Job types flowing through the generation pipeline.

use bitcoin::block::{self, Header};
use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};

use super::extranonce2::Extranonce2;

/// A work template announced by the pool via `mining.notify`.
///
/// Fields are kept in header byte order; the wire-format quirks (hex
/// encoding, the word-swapped previous hash) are undone at the protocol
/// boundary before one of these is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratumJob {
    /// Pool-assigned identifier, echoed back in every submit.
    pub job_id: String,
    pub prev_blockhash: BlockHash,
    pub version: block::Version,
    pub bits: CompactTarget,
    /// Pool's ntime for the template, seconds since the epoch.
    pub time: u32,
    pub coinbase1: Vec<u8>,
    pub coinbase2: Vec<u8>,
    pub merkle_branches: Vec<TxMerkleNode>,
    /// When set, abandon work on earlier templates immediately.
    pub clean_jobs: bool,
}

/// One fully-built unit of work, ready for the hardware.
///
/// Carries everything needed later to reconstruct the block header for a
/// nonce the chip returns: the submit identifiers, the merkle root this
/// extranonce2 produced, and the difficulties in force at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareJob {
    pub job_id: String,
    pub extranonce2: Extranonce2,
    pub prev_blockhash: BlockHash,
    pub merkle_root: TxMerkleNode,
    /// Base header version before any rolling.
    pub version: block::Version,
    /// Bits the hardware is allowed to roll within the version field.
    pub version_mask: u32,
    pub bits: CompactTarget,
    pub time: u32,
    /// Pool share target at dispatch, for submit gating.
    pub pool_difficulty: u64,
    /// Difficulty the hardware was masked to at dispatch.
    pub asic_difficulty: u64,
}

impl HardwareJob {
    /// Rebuild the block header for a result the hardware reported.
    ///
    /// `version` is the full rolled version word from the result, not the
    /// rolled bits alone.
    pub fn header(&self, version: block::Version, nonce: u32) -> Header {
        Header {
            version,
            prev_blockhash: self.prev_blockhash,
            merkle_root: self.merkle_root,
            time: self.time,
            bits: self.bits,
            nonce,
        }
    }

    /// Version bits the hardware rolled, relative to the job's base version.
    pub fn rolled_bits(&self, version: block::Version) -> u32 {
        (version.to_consensus() ^ self.version.to_consensus()) as u32
    }
}
