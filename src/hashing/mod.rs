//! BLAKE3 helpers for memo keys and fallback-store point ids.

use blake3::Hasher;

/// Full 256-bit digest of a chunk or query text, used as the embedding memo key.
#[inline]
pub fn hash_text(text: &str) -> [u8; 32] {
    *blake3::hash(text.as_bytes()).as_bytes()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// # Point ids
///
/// Qdrant point ids are `u64` (or UUIDs), while document ids are caller-supplied strings. The
/// first 8 bytes of the BLAKE3 digest become the id. The string id is also stored in the point
/// payload, so a collision overwrites a point rather than returning the wrong text under the
/// right id.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    digest_prefix(&blake3::hash(data))
}

/// Point id for a document id inside a named collection.
#[inline]
pub fn point_id_for(collection: &str, document_id: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(collection.as_bytes());
    hasher.update(b"|");
    hasher.update(document_id.as_bytes());

    digest_prefix(&hasher.finalize())
}

fn digest_prefix(hash: &blake3::Hash) -> u64 {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
