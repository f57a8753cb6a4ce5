//! Coinbase assembly and merkle root folding.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::TxMerkleNode;

/// Assemble the full coinbase transaction from its job fragments.
///
/// Pools split the coinbase around the extranonce window: the miner owns the
/// bytes between coinbase1 and coinbase2 and fills them with extranonce1
/// (fixed per connection) followed by its own extranonce2.
pub fn assemble_coinbase(
    coinbase1: &[u8],
    extranonce1: &[u8],
    extranonce2: &[u8],
    coinbase2: &[u8],
) -> Vec<u8> {
    let mut tx =
        Vec::with_capacity(coinbase1.len() + extranonce1.len() + extranonce2.len() + coinbase2.len());
    tx.extend_from_slice(coinbase1);
    tx.extend_from_slice(extranonce1);
    tx.extend_from_slice(extranonce2);
    tx.extend_from_slice(coinbase2);
    tx
}

/// Double-SHA256 of an assembled coinbase, as a merkle leaf.
pub fn coinbase_txid(coinbase: &[u8]) -> TxMerkleNode {
    TxMerkleNode::from_byte_array(sha256d::Hash::hash(coinbase).to_byte_array())
}

/// Fold the coinbase txid up the pool-provided branch path.
///
/// Each step hashes the running value with the next branch node appended,
/// exactly the left-to-right order `mining.notify` lists them in. An empty
/// branch list leaves the coinbase txid as the root (a block with only the
/// coinbase).
pub fn fold_merkle_branches(coinbase_txid: TxMerkleNode, branches: &[TxMerkleNode]) -> TxMerkleNode {
    let mut root = coinbase_txid;
    let mut buf = [0u8; 64];
    for branch in branches {
        buf[..32].copy_from_slice(root.as_byte_array());
        buf[32..].copy_from_slice(branch.as_byte_array());
        root = TxMerkleNode::from_byte_array(sha256d::Hash::hash(&buf).to_byte_array());
    }
    root
}
