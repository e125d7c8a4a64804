//! Hash-chain primitives for the Bitemporal Provenance Ledger (BPL).
//!
//! This crate owns the cryptographic definition of the ledger:
//! - SHA-256 record hashing over canonical payload bytes ([`compute_hash`])
//! - The genesis constant preceding the first record ([`GENESIS_HASH`])
//! - The [`ChainLink`] trait and whole-chain verification ([`ChainVerifier`])

pub mod chain;
pub mod hasher;

pub use chain::{ChainError, ChainLink, ChainVerifier};
pub use hasher::{compute_hash, GENESIS_HASH};
