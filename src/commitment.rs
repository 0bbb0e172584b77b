//! Commitment-reveal randomness.
//!
//! The operator generates a secret seed and publishes its hash *before*
//! any entry is accepted. After the draw closes, the seed is revealed and
//! anyone can recompute both the commitment and the winning index from
//! public data. The operator cannot steer the outcome it committed to.
//!
//! ## Protocol
//! 1. `generate_seed()` at draw creation (32 bytes, OS CSPRNG)
//! 2. `commit_seed(seed)` published while entries are sold
//! 3. `winning_index(seed, total_entries)` at settlement
//! 4. `verify_seed(seed, commitment)` by the engine and by any auditor
//!
//! Each hash lives in its own domain so a commitment can never be confused
//! with a winner digest or a ticket seal.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Domain tag for seed commitments
pub const COMMIT_DOMAIN: &str = "COMMIT:";

/// Domain tag for winner-index derivation
pub const WINNER_DOMAIN: &str = "WINNER:";

/// Domain tag for ticket seals
pub const TICKET_DOMAIN: &str = "TICKET:";

/// Seed length in raw bytes (64 hex chars encoded)
pub const SEED_BYTES: usize = 32;

/// Generate a fresh secret seed: 32 bytes from the OS CSPRNG, encoded as
/// 64 lowercase hex characters.
pub fn generate_seed() -> String {
    let mut bytes = [0u8; SEED_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way commitment to a seed: hex SHA-256 of `"COMMIT:" || seed`.
///
/// Preimage resistance means publishing this reveals nothing about the
/// seed itself.
pub fn commit_seed(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(COMMIT_DOMAIN.as_bytes());
    hasher.update(seed.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive the winning entry index from a revealed seed.
///
/// Hashes `"WINNER:" || seed`, interprets the first 8 digest bytes as a
/// big-endian u64 and reduces modulo `total_entries`. Identical inputs
/// always produce identical output, which is what makes a settled draw
/// independently reproducible.
///
/// Returns `None` when `total_entries` is zero: there is no index to
/// select from an empty entry list.
pub fn winning_index(seed: &str, total_entries: u64) -> Option<u64> {
    if total_entries == 0 {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(WINNER_DOMAIN.as_bytes());
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    Some(u64::from_be_bytes(prefix) % total_entries)
}

/// Recompute the commitment for a seed and compare against the published
/// hash. Used internally before trusting a stored seed and externally by
/// auditors.
pub fn verify_seed(seed: &str, commitment: &str) -> bool {
    commit_seed(seed) == commitment
}

/// Keyed tamper seal over a ticket's immutable fields.
///
/// Binds every recorded attribute plus a server-only secret, so a client
/// cannot forge or alter a ticket undetected. The secret is injected
/// configuration (`EngineConfig::ticket_seal_secret`), never ambient
/// state, so it can be rotated without touching call sites.
pub fn seal_ticket(
    ticket_id: &str,
    draw_id: &str,
    user_id: &str,
    position: u64,
    purchased_at: u64,
    secret: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(TICKET_DOMAIN.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(b"|");
    hasher.update(ticket_id.as_bytes());
    hasher.update(b"|");
    hasher.update(draw_id.as_bytes());
    hasher.update(b"|");
    hasher.update(user_id.as_bytes());
    hasher.update(b"|");
    hasher.update(position.to_be_bytes());
    hasher.update(b"|");
    hasher.update(purchased_at.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute a ticket seal from stored fields and compare.
pub fn verify_ticket_seal(
    seal: &str,
    ticket_id: &str,
    draw_id: &str,
    user_id: &str,
    position: u64,
    purchased_at: u64,
    secret: &str,
) -> bool {
    seal_ticket(ticket_id, draw_id, user_id, position, purchased_at, secret) == seal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_format() {
        let seed = generate_seed();
        assert_eq!(seed.len(), 64);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn test_seeds_are_unique() {
        let a = generate_seed();
        let b = generate_seed();
        assert_ne!(a, b);
    }

    #[test]
    fn test_commit_is_deterministic() {
        let seed = generate_seed();
        assert_eq!(commit_seed(&seed), commit_seed(&seed));
        assert_eq!(commit_seed(&seed).len(), 64);
    }

    #[test]
    fn test_verify_seed_roundtrip() {
        let seed = generate_seed();
        let commitment = commit_seed(&seed);
        assert!(verify_seed(&seed, &commitment));
        assert!(!verify_seed(&generate_seed(), &commitment));
    }

    #[test]
    fn test_commit_and_winner_domains_differ() {
        // The same seed must never produce the same digest in both domains
        let seed = generate_seed();
        let mut hasher = Sha256::new();
        hasher.update(WINNER_DOMAIN.as_bytes());
        hasher.update(seed.as_bytes());
        let winner_digest = hex::encode(hasher.finalize());
        assert_ne!(commit_seed(&seed), winner_digest);
    }

    #[test]
    fn test_winning_index_deterministic_and_in_range() {
        let seed = generate_seed();
        for total in [1u64, 2, 3, 10, 1000] {
            let idx = winning_index(&seed, total).unwrap();
            assert!(idx < total);
            assert_eq!(winning_index(&seed, total).unwrap(), idx);
        }
    }

    #[test]
    fn test_winning_index_empty_entries() {
        assert!(winning_index(&generate_seed(), 0).is_none());
    }

    #[test]
    fn test_winning_index_varies_with_seed() {
        // With 1000 slots, 64 random seeds landing on one index is
        // astronomically unlikely
        let indices: std::collections::HashSet<u64> = (0..64)
            .map(|_| winning_index(&generate_seed(), 1000).unwrap())
            .collect();
        assert!(indices.len() > 1);
    }

    #[test]
    fn test_seal_detects_tampering() {
        let seal = seal_ticket("t1", "d1", "alice", 3, 1700000000, "secret");
        assert!(verify_ticket_seal(&seal, "t1", "d1", "alice", 3, 1700000000, "secret"));
        // Any altered field breaks the seal
        assert!(!verify_ticket_seal(&seal, "t2", "d1", "alice", 3, 1700000000, "secret"));
        assert!(!verify_ticket_seal(&seal, "t1", "d1", "bob", 3, 1700000000, "secret"));
        assert!(!verify_ticket_seal(&seal, "t1", "d1", "alice", 4, 1700000000, "secret"));
        assert!(!verify_ticket_seal(&seal, "t1", "d1", "alice", 3, 1700000001, "secret"));
    }

    #[test]
    fn test_seal_depends_on_secret() {
        let a = seal_ticket("t1", "d1", "alice", 1, 0, "secret_a");
        let b = seal_ticket("t1", "d1", "alice", 1, 0, "secret_b");
        assert_ne!(a, b);
    }
}
