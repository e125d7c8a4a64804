use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Format a timestamp in the canonical ledger form: RFC 3339 UTC with
/// millisecond precision and a `Z` suffix.
///
/// The canonical form is used everywhere a timestamp becomes bytes — hash
/// payloads, JSON export, CSV cells — so that one instant always encodes
/// to one string.
pub fn format_canonical(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// Sub-millisecond precision is truncated so a parsed timestamp always
/// round-trips through [`format_canonical`].
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TypeError> {
    let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| TypeError::InvalidTimestamp {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    let utc = parsed.with_timezone(&Utc);
    let millis = utc.timestamp_millis();
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| TypeError::InvalidTimestamp {
        value: value.to_string(),
        reason: "timestamp out of range".to_string(),
    })
}

/// Truncate a timestamp to canonical (millisecond) precision.
pub fn truncate_to_canonical(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

/// Serde adapter storing timestamps in the canonical string form.
pub mod canonical_time {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&format_canonical(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional canonical timestamps.
pub mod canonical_time_opt {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => ser.serialize_some(&format_canonical(ts)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(de)?;
        raw.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// An inclusive range over one temporal axis.
///
/// `None` bounds are open: `TimeRange::default()` matches every timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRange {
    #[serde(with = "canonical_time_opt", skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(with = "canonical_time_opt", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Range with both bounds, inclusive.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Range open at the end.
    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Range open at the start.
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Returns `true` if `ts` falls inside the range (bounds inclusive).
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        if let Some(start) = &self.start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = &self.end {
            if ts > end {
                return false;
            }
        }
        true
    }

    /// Reject ranges whose start is after their end.
    pub fn validate(&self) -> Result<(), TypeError> {
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            if start > end {
                return Err(TypeError::InvalidTimeRange {
                    start: format_canonical(start),
                    end: format_canonical(end),
                });
            }
        }
        Ok(())
    }
}
