//! Read-side query operations: history retrieval, temporal range scans,
//! and general filtered queries with sort and pagination.

use bpl_types::{BitemporalRecord, QueryFilter, SortBy, SortOrder, TimeRange};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Query operations over any [`LedgerReader`].
///
/// Every result honors the shared ordering rule: ties on the sort key break
/// by `sequence_number` ascending, so query output is always deterministic.
pub struct QueryEngine {
    scan_limit: usize,
}

impl QueryEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            scan_limit: config.query_scan_limit,
        }
    }

    /// Full change history of one entity (optionally one field), ordered by
    /// `(transaction_time, sequence_number)` ascending.
    pub fn history<R: LedgerReader>(
        &self,
        reader: &R,
        entity_id: &str,
        field_name: Option<&str>,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        let records = reader.scan_entity(entity_id, field_name, self.scan_cap())?;
        self.check_budget(records.len())?;
        Ok(records)
    }

    /// Inclusive range scan on the transaction-time axis.
    pub fn events_by_transaction_time<R: LedgerReader>(
        &self,
        reader: &R,
        range: &TimeRange,
        filter: &QueryFilter,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        range.validate().map_err(|e| LedgerError::Query(e.to_string()))?;
        filter.validate().map_err(|e| LedgerError::Query(e.to_string()))?;

        let candidates = reader.scan_transaction_time(range, self.scan_cap())?;
        self.check_budget(candidates.len())?;
        Ok(candidates.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Inclusive range scan on the valid-time axis.
    pub fn events_by_valid_time<R: LedgerReader>(
        &self,
        reader: &R,
        range: &TimeRange,
        filter: &QueryFilter,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        range.validate().map_err(|e| LedgerError::Query(e.to_string()))?;
        filter.validate().map_err(|e| LedgerError::Query(e.to_string()))?;

        let candidates = reader.scan_valid_time(range, self.scan_cap())?;
        self.check_budget(candidates.len())?;
        Ok(candidates.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// General filtered query with sort, limit, and offset.
    ///
    /// The narrowest applicable index feeds the candidate set; residual
    /// constraints are applied as predicates.
    pub fn find<R: LedgerReader>(
        &self,
        reader: &R,
        filter: &QueryFilter,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        filter.validate().map_err(|e| LedgerError::Query(e.to_string()))?;

        let candidates = if let Some(range) = &filter.transaction_time {
            reader.scan_transaction_time(range, self.scan_cap())?
        } else if let Some(range) = &filter.valid_time {
            reader.scan_valid_time(range, self.scan_cap())?
        } else if filter.entity_ids.len() == 1 {
            reader.scan_entity(&filter.entity_ids[0], None, self.scan_cap())?
        } else {
            let count = reader.record_count()? as usize;
            if count == 0 {
                vec![]
            } else {
                // Over budget is knowable before touching a single record.
                self.check_budget(count)?;
                reader.read_range(1, count as i64)?
            }
        };
        self.check_budget(candidates.len())?;

        let mut matched: Vec<BitemporalRecord> =
            candidates.into_iter().filter(|r| filter.matches(r)).collect();
        sort_records(&mut matched, filter.sort_by, filter.sort_order);

        let offset = filter.offset.unwrap_or(0);
        let matched: Vec<BitemporalRecord> = match filter.limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };
        Ok(matched)
    }

    /// Reader scans are capped at budget + 1: one extra record is enough to
    /// tell "over budget" apart from "exactly at budget" without letting
    /// the scan run on.
    fn scan_cap(&self) -> usize {
        self.scan_limit.saturating_add(1)
    }

    fn check_budget(&self, scanned: usize) -> Result<(), LedgerError> {
        if scanned > self.scan_limit {
            return Err(LedgerError::ScanLimitExceeded {
                limit: self.scan_limit,
            });
        }
        Ok(())
    }
}

/// Sort in place by the requested key, ties broken by sequence number.
pub(crate) fn sort_records(
    records: &mut [BitemporalRecord],
    sort_by: SortBy,
    sort_order: SortOrder,
) {
    records.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::TransactionTime => a
                .transaction_time
                .cmp(&b.transaction_time)
                .then(a.sequence_number.cmp(&b.sequence_number)),
            SortBy::ValidTime => a
                .valid_time
                .cmp(&b.valid_time)
                .then(a.sequence_number.cmp(&b.sequence_number)),
            SortBy::SequenceNumber => a.sequence_number.cmp(&b.sequence_number),
        };
        match sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
