use bpl_types::TypeError;

/// Errors produced by ledger operations.
///
/// Every failure is an explicit return; none leaves a partially-visible
/// record behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// An append request failed field validation. The ledger is unchanged.
    #[error("validation failed: {0}")]
    Validation(TypeError),

    /// The append lost the tail race after bounded retries. The caller
    /// should retry the whole append.
    #[error("append lost the tail race after {attempts} attempts")]
    Contention { attempts: u32 },

    /// Detected by the verifier only; reported, never auto-repaired.
    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: i64, reason: String },

    /// Invalid or conflicting query filter.
    #[error("invalid query: {0}")]
    Query(String),

    /// A query examined more records than the configured scan budget allows.
    #[error("query scan budget exceeded: {limit} records")]
    ScanLimitExceeded { limit: usize },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid sequence range: from={from}, to={to}")]
    InvalidRange { from: i64, to: i64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}
