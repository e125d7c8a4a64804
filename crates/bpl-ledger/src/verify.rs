//! Hash-chain integrity verification.
//!
//! The verifier recomputes digests and checks predecessor links; it reports
//! what it finds and repairs nothing. A "corrected" ledger would no longer
//! be tamper-evident.

use tracing::error;

use bpl_chain::{ChainError, ChainLink, ChainVerifier, GENESIS_HASH};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Outcome of a batch verification walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationReport {
    /// Records examined, including the breaking one if any.
    pub records_checked: u64,
    /// The first break found; the walk stops there.
    pub first_break: Option<ChainBreak>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.first_break.is_none()
    }
}

/// A specific point where the chain fails to verify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainBreak {
    pub seq: i64,
    pub kind: BreakKind,
    pub detail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakKind {
    /// A sequence number inside the requested range has no record.
    MissingRecord,
    /// The stored hash differs from the recomputed digest.
    HashMismatch,
    /// `previous_hash` does not match the predecessor's hash.
    LinkMismatch,
}

/// Read-only integrity checks over any [`LedgerReader`].
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Verify one record against its immediate predecessor.
    ///
    /// Returns `false` when the stored hash does not recompute or the
    /// predecessor link is wrong; errors only on lookup failures.
    pub fn verify_record<R: LedgerReader>(
        reader: &R,
        record_id: &str,
    ) -> Result<bool, LedgerError> {
        let record = reader
            .get_by_id(record_id)?
            .ok_or_else(|| LedgerError::NotFound(record_id.to_string()))?;

        let predecessor_hash = if record.sequence_number == 1 {
            GENESIS_HASH.to_string()
        } else {
            match reader.get(record.sequence_number - 1)? {
                Some(predecessor) => predecessor.hash,
                None => {
                    error!(
                        seq = record.sequence_number,
                        "integrity violation: predecessor record missing"
                    );
                    return Ok(false);
                }
            }
        };

        match ChainVerifier::verify_link(&record, &predecessor_hash) {
            Ok(()) => Ok(true),
            Err(ChainError::Serialization(e)) => Err(LedgerError::Serialization(e)),
            Err(e) => {
                error!(seq = record.sequence_number, %e, "integrity violation detected");
                Ok(false)
            }
        }
    }

    /// Walk a contiguous sequence range and report the first break.
    pub fn verify_range<R: LedgerReader>(
        reader: &R,
        from_seq: i64,
        to_seq: i64,
    ) -> Result<VerificationReport, LedgerError> {
        if from_seq < 1 || from_seq > to_seq {
            return Err(LedgerError::InvalidRange {
                from: from_seq,
                to: to_seq,
            });
        }

        let mut predecessor_hash = if from_seq == 1 {
            GENESIS_HASH.to_string()
        } else {
            match reader.get(from_seq - 1)? {
                Some(predecessor) => predecessor.hash,
                None => {
                    return Ok(Self::broken(
                        0,
                        from_seq - 1,
                        BreakKind::MissingRecord,
                        "predecessor of range start is missing".to_string(),
                    ));
                }
            }
        };

        let mut records_checked = 0u64;
        for seq in from_seq..=to_seq {
            records_checked += 1;

            let Some(record) = reader.get(seq)? else {
                return Ok(Self::broken(
                    records_checked,
                    seq,
                    BreakKind::MissingRecord,
                    format!("no record at seq {seq}"),
                ));
            };

            if record.previous_hash != predecessor_hash {
                return Ok(Self::broken(
                    records_checked,
                    seq,
                    BreakKind::LinkMismatch,
                    "previous_hash does not match predecessor".to_string(),
                ));
            }

            let payload = record
                .payload_bytes()
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            let computed = bpl_chain::compute_hash(&record.previous_hash, &payload);
            if computed != record.hash {
                return Ok(Self::broken(
                    records_checked,
                    seq,
                    BreakKind::HashMismatch,
                    "stored hash differs from recomputed digest".to_string(),
                ));
            }

            predecessor_hash = record.hash;
        }

        Ok(VerificationReport {
            records_checked,
            first_break: None,
        })
    }

    /// Verify the entire ledger from genesis.
    pub fn verify_all<R: LedgerReader>(reader: &R) -> Result<VerificationReport, LedgerError> {
        let count = reader.record_count()? as i64;
        if count == 0 {
            return Ok(VerificationReport {
                records_checked: 0,
                first_break: None,
            });
        }
        Self::verify_range(reader, 1, count)
    }

    /// Verify the entire ledger and fail on the first break.
    ///
    /// For callers that treat a broken chain as fatal (startup checks,
    /// pre-export guards) rather than something to report on.
    pub fn require_valid<R: LedgerReader>(reader: &R) -> Result<(), LedgerError> {
        let report = Self::verify_all(reader)?;
        match report.first_break {
            None => Ok(()),
            Some(brk) => Err(LedgerError::IntegrityViolation {
                seq: brk.seq,
                reason: brk.detail,
            }),
        }
    }

    fn broken(
        records_checked: u64,
        seq: i64,
        kind: BreakKind,
        detail: String,
    ) -> VerificationReport {
        error!(seq, ?kind, %detail, "integrity violation detected");
        VerificationReport {
            records_checked,
            first_break: Some(ChainBreak { seq, kind, detail }),
        }
    }
}
