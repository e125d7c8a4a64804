/// Errors produced while constructing or encoding BPL types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("required field is empty: {0}")]
    EmptyField(&'static str),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: String, end: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
