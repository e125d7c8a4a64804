use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Tunables for the ledger runtime.
///
/// All fields have serde defaults, so a partial TOML document (or an empty
/// one) yields a working configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How many times an append may re-read the tail after losing a race
    /// before failing with [`LedgerError::Contention`].
    pub max_append_retries: u32,
    /// Upper bound on candidate records a single query call may examine.
    pub query_scan_limit: usize,
    /// Ledger size above which exports stream in batches instead of
    /// materializing the filtered set.
    pub export_stream_threshold: usize,
    /// Records fetched per batch on the streaming export path.
    pub export_batch_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_append_retries: 8,
            query_scan_limit: 100_000,
            export_stream_threshold: 10_000,
            export_batch_size: 1_000,
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from TOML text, falling back to defaults for
    /// absent keys.
    pub fn from_toml_str(raw: &str) -> Result<Self, LedgerError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would wedge the ledger.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_append_retries == 0 {
            return Err(LedgerError::Config(
                "max_append_retries must be at least 1".into(),
            ));
        }
        if self.query_scan_limit == 0 {
            return Err(LedgerError::Config(
                "query_scan_limit must be at least 1".into(),
            ));
        }
        if self.export_batch_size == 0 {
            return Err(LedgerError::Config(
                "export_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LedgerConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn partial_toml_overrides_one_field() {
        let config = LedgerConfig::from_toml_str("max_append_retries = 3").unwrap();
        assert_eq!(config.max_append_retries, 3);
        assert_eq!(config.query_scan_limit, LedgerConfig::default().query_scan_limit);
    }

    #[test]
    fn zero_retries_rejected() {
        let err = LedgerConfig::from_toml_str("max_append_retries = 0").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = LedgerConfig::from_toml_str("max_append_retries = []").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
