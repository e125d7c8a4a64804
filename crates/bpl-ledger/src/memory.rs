//! In-memory ledger implementation for tests, local demos, and embedding.
//!
//! The append pipeline here is the reference for any durable backend: the
//! same tail snapshot / hash-outside-the-lock / recheck-and-commit shape
//! maps onto a database row lock or compare-and-swap loop.

use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;
use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, warn};

use bpl_chain::{compute_hash, GENESIS_HASH};
use bpl_types::temporal::truncate_to_canonical;
use bpl_types::{AppendRequest, BitemporalRecord, RecordRef, TimeRange};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::index::BitemporalIndex;
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory ledger: an arena of immutable records plus derived indexes.
///
/// The only shared mutable state is the tail — the `(last_sequence,
/// last_hash)` pair implied by the end of the arena. All appends funnel
/// through [`LedgerWriter::append`]; reads operate on committed records
/// only.
pub struct InMemoryLedger {
    config: LedgerConfig,
    inner: RwLock<LedgerState>,
    #[cfg(test)]
    rival: Mutex<Option<AppendRequest>>,
}

#[derive(Default)]
struct LedgerState {
    /// Append-only arena keyed by `sequence_number - 1`.
    records: Vec<BitemporalRecord>,
    index: BitemporalIndex,
    by_record_id: HashMap<String, i64>,
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(LedgerState::default()),
            #[cfg(test)]
            rival: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The tail as seen by a new append: `(last_sequence, last_hash)`.
    fn tail_snapshot(&self) -> Result<(i64, String), LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(match state.records.last() {
            Some(last) => (last.sequence_number, last.hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        })
    }

    fn sorted_by_transaction(mut records: Vec<BitemporalRecord>) -> Vec<BitemporalRecord> {
        records.sort_by(|a, b| {
            a.transaction_time
                .cmp(&b.transaction_time)
                .then(a.sequence_number.cmp(&b.sequence_number))
        });
        records
    }
}

#[cfg(test)]
impl InMemoryLedger {
    /// Out-of-band mutation bypassing the append pipeline. Exists only so
    /// tamper-detection tests can forge committed records.
    pub(crate) fn tamper(&self, seq: i64, forge: impl FnOnce(&mut BitemporalRecord)) {
        let mut state = self.inner.write().unwrap();
        forge(&mut state.records[(seq - 1) as usize]);
    }

    /// Queue a rival append that commits between the next append's tail
    /// snapshot and its commit attempt, forcing the tail race to be lost.
    pub(crate) fn contend_once(&self, rival: AppendRequest) {
        *self.rival.lock().unwrap() = Some(rival);
    }

    fn commit_rival(&self) -> Result<(), LedgerError> {
        let rival = self.rival.lock().unwrap().take();
        if let Some(rival) = rival {
            self.append(rival)?;
        }
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl LedgerWriter for InMemoryLedger {
    fn append(&self, request: AppendRequest) -> Result<BitemporalRecord, LedgerError> {
        request.validate().map_err(LedgerError::Validation)?;

        let transaction_time =
            truncate_to_canonical(request.transaction_time.unwrap_or_else(Utc::now));
        let valid_time = truncate_to_canonical(request.valid_time);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let (tail_seq, tail_hash) = self.tail_snapshot()?;

            let mut record = BitemporalRecord {
                record_id: uuid::Uuid::now_v7().to_string(),
                sequence_number: tail_seq + 1,
                entity_id: request.entity_id.clone(),
                entity_type: request.entity_type.clone(),
                event_type: request.event_type.clone(),
                field_name: request.field_name.clone(),
                old_value: request.old_value.clone(),
                new_value: request.new_value.clone(),
                transaction_time,
                valid_time,
                user_id: request.user_id.clone(),
                reason: request.reason.clone(),
                source_system: request.source_system.clone(),
                correlation_id: request.correlation_id.clone(),
                hash: String::new(),
                previous_hash: tail_hash,
            };

            // The digest is the expensive part; compute it outside the
            // exclusive section so concurrent appends only serialize on the
            // commit itself.
            let payload = record
                .canonical_payload()
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            record.hash = compute_hash(&record.previous_hash, &payload);

            #[cfg(test)]
            self.commit_rival()?;

            {
                let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
                if state.records.len() as i64 != tail_seq {
                    if attempts >= self.config.max_append_retries {
                        return Err(LedgerError::Contention { attempts });
                    }
                    warn!(attempts, "ledger tail moved during append; retrying");
                    continue;
                }

                state.index.insert(&record);
                state
                    .by_record_id
                    .insert(record.record_id.clone(), record.sequence_number);
                state.records.push(record.clone());
            }

            debug!(
                seq = record.sequence_number,
                entity_id = %record.entity_id,
                field = %record.field_name,
                "record appended"
            );
            return Ok(record);
        }
    }
}

impl LedgerReader for InMemoryLedger {
    fn record_count(&self) -> Result<u64, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.records.len() as u64)
    }

    fn head(&self) -> Result<Option<RecordRef>, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.records.last().map(RecordRef::from))
    }

    fn get(&self, sequence: i64) -> Result<Option<BitemporalRecord>, LedgerError> {
        if sequence < 1 {
            return Ok(None);
        }
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.records.get((sequence - 1) as usize).cloned())
    }

    fn get_by_id(&self, record_id: &str) -> Result<Option<BitemporalRecord>, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let Some(seq) = state.by_record_id.get(record_id) else {
            return Ok(None);
        };
        Ok(state.records.get((seq - 1) as usize).cloned())
    }

    fn read_range(
        &self,
        from_seq: i64,
        to_seq: i64,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        if from_seq < 1 || from_seq > to_seq {
            return Err(LedgerError::InvalidRange {
                from: from_seq,
                to: to_seq,
            });
        }

        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let start = (from_seq - 1) as usize;
        if start >= state.records.len() {
            return Ok(vec![]);
        }
        let end_exclusive = (to_seq as usize).min(state.records.len());
        Ok(state.records[start..end_exclusive].to_vec())
    }

    fn scan_transaction_time(
        &self,
        range: &TimeRange,
        max: usize,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state
            .index
            .transaction_range(range)
            .into_iter()
            .take(max)
            .filter_map(|seq| state.records.get((seq - 1) as usize).cloned())
            .collect())
    }

    fn scan_valid_time(
        &self,
        range: &TimeRange,
        max: usize,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state
            .index
            .valid_range(range)
            .into_iter()
            .take(max)
            .filter_map(|seq| state.records.get((seq - 1) as usize).cloned())
            .collect())
    }

    fn scan_entity(
        &self,
        entity_id: &str,
        field_name: Option<&str>,
        max: usize,
    ) -> Result<Vec<BitemporalRecord>, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let records: Vec<BitemporalRecord> = state
            .index
            .entity_seqs(entity_id, field_name)
            .into_iter()
            .take(max)
            .filter_map(|seq| state.records.get((seq - 1) as usize).cloned())
            .collect();
        // The per-field index order is (field, transaction_time, seq); the
        // contract here is pure (transaction_time, seq).
        Ok(Self::sorted_by_transaction(records))
    }
}
