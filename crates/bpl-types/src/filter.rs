use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::record::BitemporalRecord;
use crate::temporal::TimeRange;

/// Sort key for read-side queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    TransactionTime,
    ValidTime,
    SequenceNumber,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Read-side filter, sort, and pagination shape.
///
/// Empty lists mean "no constraint on that dimension". Time ranges are
/// inclusive on both bounds. The same filter drives queries and exports so
/// the two can never disagree about what matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub entity_ids: Vec<String>,
    pub entity_types: Vec<String>,
    pub event_types: Vec<String>,
    pub field_names: Vec<String>,
    pub user_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_time: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_time: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl QueryFilter {
    /// Filter down to a single entity.
    pub fn for_entity(entity_id: impl Into<String>) -> Self {
        Self {
            entity_ids: vec![entity_id.into()],
            ..Self::default()
        }
    }

    /// Returns `true` if the record passes every constraint.
    pub fn matches(&self, record: &BitemporalRecord) -> bool {
        if !self.entity_ids.is_empty() && !self.entity_ids.contains(&record.entity_id) {
            return false;
        }
        if !self.entity_types.is_empty() && !self.entity_types.contains(&record.entity_type) {
            return false;
        }
        if !self.event_types.is_empty() && !self.event_types.contains(&record.event_type) {
            return false;
        }
        if !self.field_names.is_empty() && !self.field_names.contains(&record.field_name) {
            return false;
        }
        if !self.user_ids.is_empty() && !self.user_ids.contains(&record.user_id) {
            return false;
        }
        if let Some(range) = &self.transaction_time {
            if !range.contains(&record.transaction_time) {
                return false;
            }
        }
        if let Some(range) = &self.valid_time {
            if !range.contains(&record.valid_time) {
                return false;
            }
        }
        true
    }

    /// Reject conflicting constraints (e.g. inverted time ranges).
    pub fn validate(&self) -> Result<(), TypeError> {
        if let Some(range) = &self.transaction_time {
            range.validate()?;
        }
        if let Some(range) = &self.valid_time {
            range.validate()?;
        }
        Ok(())
    }
}
