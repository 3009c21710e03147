use std::collections::HashMap;

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{PointStruct, ScoredPoint, Value};

use super::VectorDbError;
use crate::cache::{DocumentChunk, Metadata, SearchHit};
use crate::hashing::point_id_for;

pub const PAYLOAD_DOC_ID: &str = "doc_id";
pub const PAYLOAD_TEXT: &str = "text";
pub const PAYLOAD_METADATA: &str = "metadata";
pub const PAYLOAD_INDEXED_AT: &str = "indexed_at";

/// Builds the Qdrant point for one chunk. Metadata travels as a JSON string so arbitrary
/// nesting survives the round trip.
pub fn chunk_to_point(collection: &str, chunk: &DocumentChunk, vector: Vec<f32>) -> PointStruct {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert(PAYLOAD_DOC_ID.to_string(), chunk.id.clone().into());
    payload.insert(PAYLOAD_TEXT.to_string(), chunk.text.clone().into());
    payload.insert(
        PAYLOAD_METADATA.to_string(),
        serde_json::Value::Object(chunk.metadata.clone())
            .to_string()
            .into(),
    );
    payload.insert(
        PAYLOAD_INDEXED_AT.to_string(),
        chrono::Utc::now().timestamp_millis().into(),
    );

    PointStruct::new(point_id_for(collection, &chunk.id), vector, payload)
}

/// Converts a Qdrant hit back into a [`SearchHit`], turning the cosine similarity score into a
/// distance.
pub fn hit_from_scored_point(point: ScoredPoint) -> Result<SearchHit, VectorDbError> {
    let point_id = match point.id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Num(n)) => n,
        _ => 0,
    };
    let payload = point.payload;

    let id = payload
        .get(PAYLOAD_DOC_ID)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| VectorDbError::InvalidPayload {
            point_id,
            message: format!("missing '{PAYLOAD_DOC_ID}'"),
        })?;

    let text = payload
        .get(PAYLOAD_TEXT)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();

    let metadata = match payload.get(PAYLOAD_METADATA).and_then(|v| v.as_str()) {
        Some(raw) => serde_json::from_str::<Metadata>(raw).map_err(|e| {
            VectorDbError::InvalidPayload {
                point_id,
                message: e.to_string(),
            }
        })?,
        None => Metadata::new(),
    };

    Ok(SearchHit {
        id,
        text,
        metadata,
        score: similarity_to_distance(point.score),
    })
}

/// Qdrant reports cosine similarity; the cache reports cosine distance.
#[inline]
pub fn similarity_to_distance(similarity: f32) -> f32 {
    1.0 - similarity.clamp(-1.0, 1.0)
}
