//! Foundation types for the Bitemporal Provenance Ledger (BPL).
//!
//! This crate provides the record model, canonical timestamp handling, and
//! query filter types used throughout the BPL system. Every other BPL crate
//! depends on `bpl-types`.
//!
//! # Key Types
//!
//! - [`BitemporalRecord`] — The immutable unit of record, hash-chained
//! - [`AppendRequest`] — Caller-supplied fields for a new record
//! - [`RecordRef`] — Lightweight reference to a committed record
//! - [`TimeRange`] — Inclusive range over either temporal axis
//! - [`QueryFilter`] — Read-side filter, sort, and pagination shape

pub mod error;
pub mod filter;
pub mod record;
pub mod temporal;

pub use error::TypeError;
pub use filter::{QueryFilter, SortBy, SortOrder};
pub use record::{AppendRequest, BitemporalRecord, RecordRef};
pub use temporal::{format_canonical, parse_timestamp, TimeRange};
