use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::temporal::{canonical_time, canonical_time_opt, format_canonical};

/// One immutable entry in the provenance ledger.
///
/// A record captures a single change to a single field of a tracked entity,
/// stamped on both temporal axes: `transaction_time` (when the ledger
/// learned of the change) and `valid_time` (when the change was effective
/// in reality). Neither axis constrains the other; backfills and
/// retroactive corrections are ordinary records.
///
/// Records are created exactly once by the append pipeline and are never
/// updated or deleted. Tampering with any stored field breaks the hash
/// chain (`hash` / `previous_hash`) and is detectable by the verifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitemporalRecord {
    /// Opaque unique identifier (UUID v7, assigned by the ledger).
    pub record_id: String,
    /// Global, gapless append order starting at 1.
    pub sequence_number: i64,
    pub entity_id: String,
    pub entity_type: String,
    pub event_type: String,
    pub field_name: String,
    /// Value before the change. `Value::Null` is the explicit "no value".
    #[serde(default)]
    pub old_value: Value,
    /// Value after the change.
    #[serde(default)]
    pub new_value: Value,
    /// When the record was durably written. Monotonic only with respect to
    /// `sequence_number`, not in wall-clock terms.
    #[serde(with = "canonical_time")]
    pub transaction_time: DateTime<Utc>,
    /// When the change was effective in reality. Unconstrained relative to
    /// `transaction_time`.
    #[serde(with = "canonical_time")]
    pub valid_time: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// SHA-256 digest of `previous_hash` + canonical payload, lowercase hex.
    pub hash: String,
    /// `hash` of the predecessor, or the genesis constant for sequence 1.
    pub previous_hash: String,
}

/// The hashed view of a record: every field except identity and the hashes
/// themselves, in fixed order. Absent optionals are omitted entirely, which
/// keeps "no reason given" distinguishable from any literal value.
#[derive(Serialize)]
struct HashPayload<'a> {
    entity_id: &'a str,
    entity_type: &'a str,
    event_type: &'a str,
    field_name: &'a str,
    old_value: &'a Value,
    new_value: &'a Value,
    transaction_time: String,
    valid_time: String,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<&'a str>,
}

impl BitemporalRecord {
    /// Canonical byte encoding of the record's hashed fields.
    ///
    /// Deterministic: fixed field order, canonical timestamp strings, and
    /// sorted object keys inside structured values (`serde_json`'s map is
    /// ordered). Two logically equal records always encode identically.
    pub fn canonical_payload(&self) -> Result<Vec<u8>, TypeError> {
        let payload = HashPayload {
            entity_id: &self.entity_id,
            entity_type: &self.entity_type,
            event_type: &self.event_type,
            field_name: &self.field_name,
            old_value: &self.old_value,
            new_value: &self.new_value,
            transaction_time: format_canonical(&self.transaction_time),
            valid_time: format_canonical(&self.valid_time),
            user_id: &self.user_id,
            reason: self.reason.as_deref(),
            source_system: self.source_system.as_deref(),
            correlation_id: self.correlation_id.as_deref(),
        };
        serde_json::to_vec(&payload).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// Lightweight reference to a committed record (ledger head, lookups).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub sequence_number: i64,
    pub record_id: String,
    pub hash: String,
}

impl From<&BitemporalRecord> for RecordRef {
    fn from(record: &BitemporalRecord) -> Self {
        Self {
            sequence_number: record.sequence_number,
            record_id: record.record_id.clone(),
            hash: record.hash.clone(),
        }
    }
}

/// Caller-supplied fields for a new record.
///
/// The ledger assigns `record_id`, `sequence_number`, `hash`, and
/// `previous_hash`; `transaction_time` defaults to the commit time when
/// omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppendRequest {
    pub entity_id: String,
    pub entity_type: String,
    pub event_type: String,
    pub field_name: String,
    #[serde(default)]
    pub old_value: Value,
    #[serde(default)]
    pub new_value: Value,
    #[serde(
        default,
        with = "canonical_time_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_time: Option<DateTime<Utc>>,
    #[serde(with = "canonical_time")]
    pub valid_time: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl AppendRequest {
    /// Minimal request with the required fields; values default to null.
    pub fn new(
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
        event_type: impl Into<String>,
        field_name: impl Into<String>,
        valid_time: DateTime<Utc>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type: entity_type.into(),
            event_type: event_type.into(),
            field_name: field_name.into(),
            old_value: Value::Null,
            new_value: Value::Null,
            transaction_time: None,
            valid_time,
            user_id: user_id.into(),
            reason: None,
            source_system: None,
            correlation_id: None,
        }
    }

    /// Check that every required field is present and non-empty.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.entity_id.is_empty() {
            return Err(TypeError::EmptyField("entity_id"));
        }
        if self.entity_type.is_empty() {
            return Err(TypeError::EmptyField("entity_type"));
        }
        if self.event_type.is_empty() {
            return Err(TypeError::EmptyField("event_type"));
        }
        if self.field_name.is_empty() {
            return Err(TypeError::EmptyField("field_name"));
        }
        if self.user_id.is_empty() {
            return Err(TypeError::EmptyField("user_id"));
        }
        Ok(())
    }
}
