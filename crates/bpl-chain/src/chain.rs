use bpl_types::BitemporalRecord;

use crate::hasher::{compute_hash, GENESIS_HASH};

/// A participant in the hash chain.
pub trait ChainLink {
    /// Position in the global append order (1-based).
    fn sequence(&self) -> i64;
    /// The link's own hash, lowercase hex.
    fn hash(&self) -> &str;
    /// The predecessor's hash, or [`GENESIS_HASH`] for sequence 1.
    fn previous_hash(&self) -> &str;
    /// Canonical payload bytes for hash recomputation.
    fn payload_bytes(&self) -> Result<Vec<u8>, ChainError>;
}

impl ChainLink for BitemporalRecord {
    fn sequence(&self) -> i64 {
        self.sequence_number
    }

    fn hash(&self) -> &str {
        &self.hash
    }

    fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    fn payload_bytes(&self) -> Result<Vec<u8>, ChainError> {
        self.canonical_payload()
            .map_err(|e| ChainError::Serialization(e.to_string()))
    }
}

/// Whole-chain verifier over contiguous, sequence-ordered links.
///
/// Checks three things for every link:
/// 1. Sequence numbers are contiguous from the first link's sequence
/// 2. `previous_hash` matches the predecessor's `hash` (genesis for seq 1)
/// 3. The stored `hash` equals the recomputed digest of the payload
pub struct ChainVerifier;

impl ChainVerifier {
    /// Verify a contiguous run of links. An empty slice is a valid chain.
    pub fn verify_chain(links: &[impl ChainLink]) -> Result<(), ChainError> {
        let Some(first) = links.first() else {
            return Ok(());
        };

        if first.sequence() == 1 && first.previous_hash() != GENESIS_HASH {
            return Err(ChainError::GenesisMismatch {
                found: first.previous_hash().to_string(),
            });
        }

        let mut expected_seq = first.sequence();
        let mut expected_prev: Option<&str> = None;

        for link in links {
            if link.sequence() != expected_seq {
                return Err(ChainError::SequenceGap {
                    expected: expected_seq,
                    found: link.sequence(),
                });
            }
            if let Some(prev) = expected_prev {
                if link.previous_hash() != prev {
                    return Err(ChainError::BrokenLink {
                        seq: link.sequence(),
                    });
                }
            }

            let computed = compute_hash(link.previous_hash(), &link.payload_bytes()?);
            if computed != link.hash() {
                return Err(ChainError::HashMismatch {
                    seq: link.sequence(),
                });
            }

            expected_prev = Some(link.hash());
            expected_seq += 1;
        }

        Ok(())
    }

    /// Verify one link against its known predecessor hash.
    pub fn verify_link(link: &impl ChainLink, predecessor_hash: &str) -> Result<(), ChainError> {
        if link.previous_hash() != predecessor_hash {
            return Err(ChainError::BrokenLink {
                seq: link.sequence(),
            });
        }
        let computed = compute_hash(link.previous_hash(), &link.payload_bytes()?);
        if computed != link.hash() {
            return Err(ChainError::HashMismatch {
                seq: link.sequence(),
            });
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("first record does not link to the genesis constant (found {found})")]
    GenesisMismatch { found: String },

    #[error("sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: i64, found: i64 },

    #[error("broken link at seq {seq}: previous_hash does not match predecessor")]
    BrokenLink { seq: i64 },

    #[error("hash mismatch at seq {seq}: stored hash differs from recomputed")]
    HashMismatch { seq: i64 },

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestLink {
        seq: i64,
        hash: String,
        prev: String,
        payload: Vec<u8>,
    }

    impl ChainLink for TestLink {
        fn sequence(&self) -> i64 {
            self.seq
        }
        fn hash(&self) -> &str {
            &self.hash
        }
        fn previous_hash(&self) -> &str {
            &self.prev
        }
        fn payload_bytes(&self) -> Result<Vec<u8>, ChainError> {
            Ok(self.payload.clone())
        }
    }

    fn build_chain(count: usize) -> Vec<TestLink> {
        let mut chain = Vec::new();
        let mut prev = GENESIS_HASH.to_string();

        for i in 0..count {
            let payload = format!("link-{i}").into_bytes();
            let hash = compute_hash(&prev, &payload);
            chain.push(TestLink {
                seq: (i + 1) as i64,
                hash: hash.clone(),
                prev: prev.clone(),
                payload,
            });
            prev = hash;
        }

        chain
    }

    #[test]
    fn empty_chain_is_valid() {
        let chain: Vec<TestLink> = vec![];
        assert!(ChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn single_link_chain() {
        let chain = build_chain(1);
        assert!(ChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn multi_link_chain() {
        let chain = build_chain(10);
        assert!(ChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn first_link_must_reference_genesis() {
        let mut chain = build_chain(1);
        chain[0].prev = "1".repeat(64);
        let err = ChainVerifier::verify_chain(&chain).unwrap_err();
        assert!(matches!(err, ChainError::GenesisMismatch { .. }));
    }

    #[test]
    fn sequence_gap_detected() {
        let mut chain = build_chain(3);
        chain[2].seq = 5;
        let err = ChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::SequenceGap { expected: 3, found: 5 });
    }

    #[test]
    fn broken_link_detected() {
        let mut chain = build_chain(3);
        chain[2].prev = "9".repeat(64);
        // Recompute the hash so only the link itself is wrong.
        chain[2].hash = compute_hash(&chain[2].prev, &chain[2].payload);
        let err = ChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::BrokenLink { seq: 3 });
    }

    #[test]
    fn tampered_payload_detected() {
        let mut chain = build_chain(3);
        chain[1].payload = b"tampered".to_vec();
        let err = ChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::HashMismatch { seq: 2 });
    }

    #[test]
    fn verify_link_against_predecessor() {
        let chain = build_chain(2);
        assert!(ChainVerifier::verify_link(&chain[1], &chain[0].hash).is_ok());
        assert!(matches!(
            ChainVerifier::verify_link(&chain[1], GENESIS_HASH),
            Err(ChainError::BrokenLink { seq: 2 })
        ));
    }

    #[test]
    fn bitemporal_record_implements_chain_link() {
        use chrono::{TimeZone, Utc};

        let when = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut record = BitemporalRecord {
            record_id: "rec-1".into(),
            sequence_number: 1,
            entity_id: "e1".into(),
            entity_type: "contact".into(),
            event_type: "created".into(),
            field_name: "name".into(),
            old_value: serde_json::Value::Null,
            new_value: serde_json::json!("Ada"),
            transaction_time: when,
            valid_time: when,
            user_id: "u1".into(),
            reason: None,
            source_system: None,
            correlation_id: None,
            hash: String::new(),
            previous_hash: GENESIS_HASH.to_string(),
        };
        record.hash = compute_hash(GENESIS_HASH, &record.payload_bytes().unwrap());

        assert!(ChainVerifier::verify_chain(std::slice::from_ref(&record)).is_ok());

        record.new_value = serde_json::json!("Eve");
        assert!(matches!(
            ChainVerifier::verify_chain(std::slice::from_ref(&record)),
            Err(ChainError::HashMismatch { seq: 1 })
        ));
    }

    #[test]
    fn mid_chain_slice_verifies_without_genesis() {
        // A verifier handed seqs 2..=3 should not demand the genesis link.
        let chain = build_chain(3);
        assert!(ChainVerifier::verify_chain(&chain[1..]).is_ok());
    }
}
