//! Orderings over the record stream so range scans avoid full scans.
//!
//! The index holds nothing that cannot be rebuilt by rescanning records in
//! sequence order; it is updated in the same critical section as the append
//! (or rebuilt wholesale) so queries never see a visibility gap.

use std::collections::BTreeSet;
use std::ops::Bound;

use chrono::{DateTime, Utc};

use bpl_types::{BitemporalRecord, TimeRange};

/// Secondary orderings over the durable record arena.
///
/// Keys carry the sequence number as the final component, which both makes
/// every key unique and bakes in the `(time, sequence_number)` tie-break
/// that all temporal queries share.
#[derive(Debug, Default)]
pub struct BitemporalIndex {
    by_transaction: BTreeSet<(DateTime<Utc>, i64)>,
    by_valid: BTreeSet<(DateTime<Utc>, i64)>,
    by_entity: BTreeSet<(String, String, DateTime<Utc>, i64)>,
}

impl BitemporalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one committed record.
    pub fn insert(&mut self, record: &BitemporalRecord) {
        let seq = record.sequence_number;
        self.by_transaction.insert((record.transaction_time, seq));
        self.by_valid.insert((record.valid_time, seq));
        self.by_entity.insert((
            record.entity_id.clone(),
            record.field_name.clone(),
            record.transaction_time,
            seq,
        ));
    }

    /// Rebuild from scratch by rescanning the record stream.
    pub fn rebuild(records: &[BitemporalRecord]) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.by_transaction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_transaction.is_empty()
    }

    /// Sequence numbers of records whose `transaction_time` falls in
    /// `range`, in `(transaction_time, sequence_number)` order.
    pub fn transaction_range(&self, range: &TimeRange) -> Vec<i64> {
        Self::time_range(&self.by_transaction, range)
    }

    /// Sequence numbers of records whose `valid_time` falls in `range`, in
    /// `(valid_time, sequence_number)` order.
    pub fn valid_range(&self, range: &TimeRange) -> Vec<i64> {
        Self::time_range(&self.by_valid, range)
    }

    /// Sequence numbers of records for one entity, optionally narrowed to
    /// one field.
    ///
    /// With a field the result is already `(transaction_time, seq)` ordered;
    /// without one the key order is `(field_name, transaction_time, seq)`,
    /// so callers wanting a pure temporal order must re-sort.
    pub fn entity_seqs(&self, entity_id: &str, field_name: Option<&str>) -> Vec<i64> {
        match field_name {
            Some(field) => {
                let lower = Bound::Included((
                    entity_id.to_string(),
                    field.to_string(),
                    DateTime::<Utc>::MIN_UTC,
                    i64::MIN,
                ));
                let upper = Bound::Included((
                    entity_id.to_string(),
                    field.to_string(),
                    DateTime::<Utc>::MAX_UTC,
                    i64::MAX,
                ));
                self.by_entity
                    .range((lower, upper))
                    .map(|(_, _, _, seq)| *seq)
                    .collect()
            }
            None => {
                let lower = Bound::Included((
                    entity_id.to_string(),
                    String::new(),
                    DateTime::<Utc>::MIN_UTC,
                    i64::MIN,
                ));
                self.by_entity
                    .range((lower, Bound::Unbounded))
                    .take_while(|(eid, _, _, _)| eid == entity_id)
                    .map(|(_, _, _, seq)| *seq)
                    .collect()
            }
        }
    }

    fn time_range(set: &BTreeSet<(DateTime<Utc>, i64)>, range: &TimeRange) -> Vec<i64> {
        let lower = match range.start {
            Some(start) => Bound::Included((start, i64::MIN)),
            None => Bound::Unbounded,
        };
        let upper = match range.end {
            Some(end) => Bound::Included((end, i64::MAX)),
            None => Bound::Unbounded,
        };
        set.range((lower, upper)).map(|(_, seq)| *seq).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpl_types::parse_timestamp;
    use serde_json::json;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    fn record(seq: i64, entity: &str, field: &str, tx: &str, valid: &str) -> BitemporalRecord {
        BitemporalRecord {
            record_id: format!("r{seq}"),
            sequence_number: seq,
            entity_id: entity.into(),
            entity_type: "contact".into(),
            event_type: "field_changed".into(),
            field_name: field.into(),
            old_value: json!(null),
            new_value: json!(seq),
            transaction_time: ts(tx),
            valid_time: ts(valid),
            user_id: "u1".into(),
            reason: None,
            source_system: None,
            correlation_id: None,
            hash: String::new(),
            previous_hash: String::new(),
        }
    }

    fn sample() -> Vec<BitemporalRecord> {
        vec![
            record(1, "e1", "name", "2024-01-10T00:00:00Z", "2024-01-01T00:00:00Z"),
            record(2, "e2", "name", "2024-01-20T00:00:00Z", "2023-06-01T00:00:00Z"),
            // Backfill: recorded later than seq 2 but with an earlier
            // transaction_time.
            record(3, "e1", "email", "2024-01-15T00:00:00Z", "2024-02-01T00:00:00Z"),
            record(4, "e1", "name", "2024-01-10T00:00:00Z", "2024-01-05T00:00:00Z"),
        ]
    }

    #[test]
    fn transaction_range_is_inclusive_and_tie_broken_by_seq() {
        let index = BitemporalIndex::rebuild(&sample());
        let seqs = index.transaction_range(&TimeRange::between(
            ts("2024-01-10T00:00:00Z"),
            ts("2024-01-15T00:00:00Z"),
        ));
        // Two records share 2024-01-10; sequence breaks the tie.
        assert_eq!(seqs, vec![1, 4, 3]);
    }

    #[test]
    fn valid_range_orders_on_its_own_axis() {
        let index = BitemporalIndex::rebuild(&sample());
        let seqs = index.valid_range(&TimeRange::default());
        assert_eq!(seqs, vec![2, 1, 4, 3]);
    }

    #[test]
    fn entity_scan_narrowed_to_field() {
        let index = BitemporalIndex::rebuild(&sample());
        assert_eq!(index.entity_seqs("e1", Some("name")), vec![1, 4]);
        assert_eq!(index.entity_seqs("e1", Some("email")), vec![3]);
        assert_eq!(index.entity_seqs("e1", Some("missing")), Vec::<i64>::new());
    }

    #[test]
    fn entity_scan_all_fields_does_not_leak_other_entities() {
        let index = BitemporalIndex::rebuild(&sample());
        let mut seqs = index.entity_seqs("e1", None);
        seqs.sort_unstable();
        assert_eq!(seqs, vec![1, 3, 4]);
        assert_eq!(index.entity_seqs("e", None), Vec::<i64>::new());
    }

    #[test]
    fn incremental_insert_matches_rebuild() {
        let records = sample();
        let mut incremental = BitemporalIndex::new();
        for record in &records {
            incremental.insert(record);
        }
        let rebuilt = BitemporalIndex::rebuild(&records);

        let all = TimeRange::default();
        assert_eq!(incremental.transaction_range(&all), rebuilt.transaction_range(&all));
        assert_eq!(incremental.valid_range(&all), rebuilt.valid_range(&all));
        assert_eq!(incremental.entity_seqs("e1", None), rebuilt.entity_seqs("e1", None));
        assert_eq!(incremental.len(), rebuilt.len());
    }

    #[test]
    fn empty_index() {
        let index = BitemporalIndex::new();
        assert!(index.is_empty());
        assert!(index.transaction_range(&TimeRange::default()).is_empty());
        assert!(index.entity_seqs("e1", None).is_empty());
    }
}
