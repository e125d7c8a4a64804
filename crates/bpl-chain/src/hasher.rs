use sha2::{Digest, Sha256};

/// The fixed `previous_hash` of the first record: 64 ASCII `'0'` characters.
///
/// Deliberately not a real digest, so no honest record can ever collide
/// with it.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Compute a record hash: SHA-256 over the previous hash (its hex characters
/// as ASCII bytes) concatenated with the canonical payload bytes, rendered
/// as lowercase hex.
///
/// Folding the predecessor's hash into every digest is what makes the chain
/// tamper-evident: changing any committed record invalidates its own hash
/// and every link after it.
pub fn compute_hash(previous_hash: &str, payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(payload);
    hex::encode(hasher.finalize())
}
