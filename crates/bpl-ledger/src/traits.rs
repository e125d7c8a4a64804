use bpl_types::{AppendRequest, BitemporalRecord, RecordRef, TimeRange};

use crate::error::LedgerError;

/// Write boundary: the sole path by which records enter the ledger.
pub trait LedgerWriter: Send + Sync {
    /// Validate, sequence, hash-chain, and durably persist one record.
    ///
    /// Exactly one durable write, or none. A caller never observes a
    /// partially-written record.
    fn append(&self, request: AppendRequest) -> Result<BitemporalRecord, LedgerError>;
}

/// Read boundary for queries, verification, and export.
///
/// Readers operate only on already-committed, immutable records; they never
/// block writers and never observe in-flight appends.
pub trait LedgerReader: Send + Sync {
    fn record_count(&self) -> Result<u64, LedgerError>;

    /// The most recently committed record, if any.
    fn head(&self) -> Result<Option<RecordRef>, LedgerError>;

    /// Point lookup by sequence number.
    fn get(&self, sequence: i64) -> Result<Option<BitemporalRecord>, LedgerError>;

    /// Point lookup by record id.
    fn get_by_id(&self, record_id: &str) -> Result<Option<BitemporalRecord>, LedgerError>;

    /// Inclusive sequence range read; `from_seq` must be >= 1 and <= `to_seq`.
    fn read_range(&self, from_seq: i64, to_seq: i64)
        -> Result<Vec<BitemporalRecord>, LedgerError>;

    /// Records whose `transaction_time` falls in `range`, ordered by
    /// `(transaction_time, sequence_number)` ascending.
    ///
    /// At most `max` records are materialized, so a caller's scan budget
    /// caps the work done, not just the result size. Pass `usize::MAX` for
    /// an unbounded scan.
    fn scan_transaction_time(
        &self,
        range: &TimeRange,
        max: usize,
    ) -> Result<Vec<BitemporalRecord>, LedgerError>;

    /// Records whose `valid_time` falls in `range`, ordered by
    /// `(valid_time, sequence_number)` ascending. At most `max` records.
    fn scan_valid_time(
        &self,
        range: &TimeRange,
        max: usize,
    ) -> Result<Vec<BitemporalRecord>, LedgerError>;

    /// All records for one entity (optionally one field), ordered by
    /// `(transaction_time, sequence_number)` ascending. At most `max`
    /// records.
    fn scan_entity(
        &self,
        entity_id: &str,
        field_name: Option<&str>,
        max: usize,
    ) -> Result<Vec<BitemporalRecord>, LedgerError>;
}
