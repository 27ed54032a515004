//! Hashing utilities for hivesync
//!
//! - BLAKE3 content digests for log lines
//! - HRW (Highest Random Weight) for picking the peers responsible for a key

use crate::dht::PeerId;

/// Short content digest used in log lines (first 8 bytes, hex)
pub fn short_digest(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hex::encode(&hash.as_bytes()[..8])
}

fn weight(key: &str, peer: &PeerId) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key.as_bytes());
    hasher.update(peer.as_str().as_bytes());
    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(prefix)
}

/// HRW (Highest Random Weight) ordering of peers for a key
///
/// Given a key and a set of peers, returns peers sorted by their weight
/// (deterministic based on key). Placement stays stable as peers come and go.
pub fn hrw_hash(key: &str, peers: &[PeerId]) -> Vec<PeerId> {
    let mut weights: Vec<(&PeerId, u64)> = peers.iter().map(|p| (p, weight(key, p))).collect();

    // Sort by weight (descending)
    weights.sort_by(|a, b| b.1.cmp(&a.1));

    weights.into_iter().map(|(peer, _)| peer.clone()).collect()
}

/// Select the N peers responsible for `key`
pub fn select_replicas(key: &str, peers: &[PeerId], n: usize) -> Vec<PeerId> {
    let mut sorted = hrw_hash(key, peers);
    sorted.truncate(n);
    sorted
}
