//! Append-only bitemporal provenance ledger (BPL).
//!
//! This crate is the heart of BPL. It provides:
//! - The append pipeline: validate, globally sequence, hash-chain, persist
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - `InMemoryLedger` implementation for tests and embedding
//! - `BitemporalIndex` orderings over both temporal axes
//! - `QueryEngine` for history, range scans, and filtered queries
//! - `StateProjector` — the four temporal reconstructions as one fold
//! - `IntegrityVerifier` — hash-chain verification, report-only
//! - `ExportFormatter` — streaming JSON/CSV export
//!
//! The ledger treats `event_type`, `field_name`, and values as opaque; it
//! records and orders changes but never interprets them. Records live
//! forever: the only lifecycle events are "created" and "read".

pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod memory;
pub mod projection;
pub mod query;
pub mod traits;
pub mod verify;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use export::{ExportFormat, ExportFormatter, EXPORT_COLUMNS};
pub use index::BitemporalIndex;
pub use memory::InMemoryLedger;
pub use projection::{EntityState, StateProjector, TemporalLens};
pub use query::QueryEngine;
pub use traits::{LedgerReader, LedgerWriter};
pub use verify::{BreakKind, ChainBreak, IntegrityVerifier, VerificationReport};
