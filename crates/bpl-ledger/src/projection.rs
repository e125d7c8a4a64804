//! State reconstruction: fold an entity's history through a temporal lens.
//!
//! All four reconstruction variants share one fold; they differ only in
//! which records the lens admits. This is deliberate — four hand-written
//! algorithms would inevitably drift apart on ordering semantics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use bpl_types::BitemporalRecord;

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Which slice of the bitemporal plane a reconstruction observes.
///
/// Every variant folds admitted records in `(transaction_time,
/// sequence_number)` order — corrections apply in the order they were
/// *learned*. In particular, `TruthAt` lets a later-recorded retroactive
/// correction override an earlier-recorded one even when both carry the
/// same valid time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalLens {
    /// Everything the ledger holds today.
    Current,
    /// What did we know as of transaction time T?
    KnowledgeAt(DateTime<Utc>),
    /// What was true as of valid time V, given everything known today?
    TruthAt(DateTime<Utc>),
    /// What did we believe, as of transaction time T, was true at valid
    /// time V?
    Bitemporal {
        transaction: DateTime<Utc>,
        valid: DateTime<Utc>,
    },
}

impl TemporalLens {
    /// Returns `true` if the record is visible through this lens.
    pub fn admits(&self, record: &BitemporalRecord) -> bool {
        match self {
            Self::Current => true,
            Self::KnowledgeAt(t) => record.transaction_time <= *t,
            Self::TruthAt(v) => record.valid_time <= *v,
            Self::Bitemporal { transaction, valid } => {
                record.transaction_time <= *transaction && record.valid_time <= *valid
            }
        }
    }
}

/// The reconstructed field values of one entity under one lens.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityState {
    pub entity_id: String,
    pub lens: TemporalLens,
    /// Each field's value is the `new_value` of the last-applied record for
    /// that field.
    pub fields: BTreeMap<String, Value>,
    pub records_applied: u64,
    /// Sequence number of the last record folded in, if any.
    pub last_sequence: Option<i64>,
}

/// Deterministic state reconstruction over any [`LedgerReader`].
pub struct StateProjector;

impl StateProjector {
    /// Fold the entity's admitted history into field values.
    pub fn reconstruct<R: LedgerReader>(
        reader: &R,
        entity_id: &str,
        lens: TemporalLens,
    ) -> Result<EntityState, LedgerError> {
        // Already (transaction_time, sequence_number) ordered. Unbounded:
        // reconstruction must see the full admitted history.
        let history = reader.scan_entity(entity_id, None, usize::MAX)?;

        let mut fields = BTreeMap::new();
        let mut records_applied = 0u64;
        let mut last_sequence = None;

        for record in history.iter().filter(|r| lens.admits(r)) {
            fields.insert(record.field_name.clone(), record.new_value.clone());
            records_applied += 1;
            last_sequence = Some(record.sequence_number);
        }

        Ok(EntityState {
            entity_id: entity_id.to_string(),
            lens,
            fields,
            records_applied,
            last_sequence,
        })
    }

    /// Everything the ledger holds today.
    pub fn current_state<R: LedgerReader>(
        reader: &R,
        entity_id: &str,
    ) -> Result<EntityState, LedgerError> {
        Self::reconstruct(reader, entity_id, TemporalLens::Current)
    }

    /// What did we know as of transaction time `t`?
    pub fn knowledge_at<R: LedgerReader>(
        reader: &R,
        entity_id: &str,
        t: DateTime<Utc>,
    ) -> Result<EntityState, LedgerError> {
        Self::reconstruct(reader, entity_id, TemporalLens::KnowledgeAt(t))
    }

    /// What was true as of valid time `v`, given everything known today?
    pub fn truth_at<R: LedgerReader>(
        reader: &R,
        entity_id: &str,
        v: DateTime<Utc>,
    ) -> Result<EntityState, LedgerError> {
        Self::reconstruct(reader, entity_id, TemporalLens::TruthAt(v))
    }

    /// What did we believe at transaction time `t` was true at valid time
    /// `v`?
    pub fn bitemporal<R: LedgerReader>(
        reader: &R,
        entity_id: &str,
        t: DateTime<Utc>,
        v: DateTime<Utc>,
    ) -> Result<EntityState, LedgerError> {
        Self::reconstruct(
            reader,
            entity_id,
            TemporalLens::Bitemporal {
                transaction: t,
                valid: v,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use bpl_types::{parse_timestamp, AppendRequest};

    use crate::memory::InMemoryLedger;
    use crate::traits::LedgerWriter;

    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    fn append(
        ledger: &InMemoryLedger,
        entity: &str,
        field: &str,
        old: serde_json::Value,
        new: serde_json::Value,
        tx: &str,
        valid: &str,
    ) {
        let mut req = AppendRequest::new(entity, "contact", "field_changed", field, ts(valid), "u1");
        req.old_value = old;
        req.new_value = new;
        req.transaction_time = Some(ts(tx));
        ledger.append(req).unwrap();
    }

    #[test]
    fn current_state_takes_last_applied_per_field() {
        let ledger = InMemoryLedger::default();
        // Scenario: two changes to one field, equal valid times.
        append(&ledger, "e1", "a", json!(null), json!("X"), "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z");
        append(&ledger, "e1", "a", json!("X"), json!("Y"), "2024-01-02T00:00:00Z", "2024-01-01T00:00:00Z");
        append(&ledger, "e1", "b", json!(null), json!(7), "2024-01-03T00:00:00Z", "2024-01-01T00:00:00Z");

        let state = StateProjector::current_state(&ledger, "e1").unwrap();
        assert_eq!(state.fields.get("a"), Some(&json!("Y")));
        assert_eq!(state.fields.get("b"), Some(&json!(7)));
        assert_eq!(state.records_applied, 3);
        assert_eq!(state.last_sequence, Some(3));
    }

    #[test]
    fn knowledge_at_ignores_later_recorded_facts() {
        let ledger = InMemoryLedger::default();
        append(&ledger, "e1", "f", json!(null), json!("V1"), "2024-01-10T00:00:00Z", "2024-01-01T00:00:00Z");
        append(&ledger, "e1", "f", json!("V1"), json!("V2"), "2024-02-10T00:00:00Z", "2024-01-01T00:00:00Z");

        // Between the two recordings we still believed V1.
        let mid = StateProjector::knowledge_at(&ledger, "e1", ts("2024-01-20T00:00:00Z")).unwrap();
        assert_eq!(mid.fields.get("f"), Some(&json!("V1")));

        let after = StateProjector::knowledge_at(&ledger, "e1", ts("2024-03-01T00:00:00Z")).unwrap();
        assert_eq!(after.fields.get("f"), Some(&json!("V2")));

        let before = StateProjector::knowledge_at(&ledger, "e1", ts("2023-12-01T00:00:00Z")).unwrap();
        assert!(before.fields.is_empty());
        assert_eq!(before.records_applied, 0);
    }

    #[test]
    fn truth_at_applies_retroactive_corrections_in_learned_order() {
        let ledger = InMemoryLedger::default();
        // Recorded first, effective D1.
        append(&ledger, "e1", "f", json!(null), json!("V1"), "2024-01-10T00:00:00Z", "2023-07-01T00:00:00Z");
        // Recorded later, same valid time: a retroactive correction.
        append(&ledger, "e1", "f", json!("V1"), json!("V2"), "2024-02-10T00:00:00Z", "2023-07-01T00:00:00Z");

        let truth = StateProjector::truth_at(&ledger, "e1", ts("2023-07-01T00:00:00Z")).unwrap();
        assert_eq!(truth.fields.get("f"), Some(&json!("V2")));

        // Before the valid time nothing was true yet.
        let earlier = StateProjector::truth_at(&ledger, "e1", ts("2023-06-01T00:00:00Z")).unwrap();
        assert!(earlier.fields.is_empty());
    }

    #[test]
    fn bitemporal_combines_both_axes() {
        let ledger = InMemoryLedger::default();
        append(&ledger, "e1", "f", json!(null), json!("V1"), "2024-01-10T00:00:00Z", "2023-07-01T00:00:00Z");
        append(&ledger, "e1", "f", json!("V1"), json!("V2"), "2024-02-10T00:00:00Z", "2023-07-01T00:00:00Z");

        // As known between the recordings: V1 was true at D1.
        let belief = StateProjector::bitemporal(
            &ledger,
            "e1",
            ts("2024-01-20T00:00:00Z"),
            ts("2023-07-01T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(belief.fields.get("f"), Some(&json!("V1")));

        // As known today: V2.
        let now = StateProjector::bitemporal(
            &ledger,
            "e1",
            ts("2024-12-01T00:00:00Z"),
            ts("2023-07-01T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(now.fields.get("f"), Some(&json!("V2")));
    }

    #[test]
    fn future_valid_time_is_invisible_to_truth_queries() {
        let ledger = InMemoryLedger::default();
        // A scheduled change: effective in the future.
        append(&ledger, "e1", "status", json!("active"), json!("retired"), "2024-01-01T00:00:00Z", "2030-01-01T00:00:00Z");

        let today = StateProjector::truth_at(&ledger, "e1", ts("2024-06-01T00:00:00Z")).unwrap();
        assert!(today.fields.is_empty());

        // But we already know about it.
        let current = StateProjector::current_state(&ledger, "e1").unwrap();
        assert_eq!(current.fields.get("status"), Some(&json!("retired")));
    }

    #[test]
    fn soft_delete_is_just_a_value() {
        let ledger = InMemoryLedger::default();
        append(&ledger, "e1", "status", json!("active"), json!("deleted"), "2024-01-02T00:00:00Z", "2024-01-02T00:00:00Z");

        let state = StateProjector::current_state(&ledger, "e1").unwrap();
        assert_eq!(state.fields.get("status"), Some(&json!("deleted")));
    }

    #[test]
    fn unknown_entity_reconstructs_to_empty_state() {
        let ledger = InMemoryLedger::default();
        let state = StateProjector::current_state(&ledger, "ghost").unwrap();
        assert!(state.fields.is_empty());
        assert_eq!(state.last_sequence, None);
    }
}
