use std::future::Future;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeleteCollectionBuilder, DeletePointsBuilder, Distance,
    PointStruct, PointsIdsList, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use tracing::{debug, instrument, warn};

use super::WriteConsistency;
use super::error::{StoreOp, VectorDbError};
use super::model::{chunk_to_point, hit_from_scored_point};
use crate::cache::{DocumentChunk, SearchHit};
use crate::hashing::point_id_for;

/// Async vector store contract shared by the RAM cache, the persistent fallback and the
/// cached facade.
///
/// `search` returns at most `k` hits ordered by ascending cosine distance.
pub trait VectorStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts or replaces documents with their embeddings.
    fn add(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Nearest neighbours of `query`.
    fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>, Self::Error>> + Send;

    /// Removes every document.
    fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

#[derive(Clone)]
/// Persistent store backed by one Qdrant collection.
pub struct QdrantStore {
    client: Qdrant,
    url: String,
    collection: String,
    vector_size: u64,
    consistency: WriteConsistency,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .field("vector_size", &self.vector_size)
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Creates a client for `url`. No request is made until the first operation.
    pub fn new(
        url: &str,
        collection: impl Into<String>,
        vector_size: u64,
    ) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.into(),
            vector_size,
            consistency: WriteConsistency::default(),
        })
    }

    /// Connects and makes sure the collection exists.
    pub async fn connect(
        url: &str,
        collection: impl Into<String>,
        vector_size: u64,
    ) -> Result<Self, VectorDbError> {
        let store = Self::new(url, collection, vector_size)?;
        store.ensure_collection().await?;
        Ok(store)
    }

    pub fn with_consistency(mut self, consistency: WriteConsistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn client(&self) -> &Qdrant {
        &self.client
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn vector_size(&self) -> u64 {
        self.vector_size
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| self.connection_error(e))?;
        Ok(())
    }

    /// Returns `true` if the collection exists.
    pub async fn collection_exists(&self) -> Result<bool, VectorDbError> {
        self.client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| self.connection_error(e))
    }

    /// Creates the collection with cosine distance if it is missing.
    pub async fn ensure_collection(&self) -> Result<(), VectorDbError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let vectors_config = VectorParamsBuilder::new(self.vector_size, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await
            .map_err(|e| VectorDbError::operation(StoreOp::CreateCollection, &self.collection, e))?;

        debug!(collection = %self.collection, size = self.vector_size, "Created collection");
        Ok(())
    }

    /// Upserts chunks; ids map to stable point ids so re-adding replaces.
    #[instrument(skip_all, fields(collection = %self.collection, batch = chunks.len()))]
    pub async fn upsert_chunks(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), VectorDbError> {
        if chunks.len() != embeddings.len() {
            return Err(VectorDbError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut points: Vec<PointStruct> = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            self.check_dim(embedding)?;
            points.push(chunk_to_point(&self.collection, chunk, embedding.clone()));
        }

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(&self.collection, points).wait(self.consistency.into()),
            )
            .await
            .map_err(|e| VectorDbError::operation(StoreOp::Upsert, &self.collection, e))?;

        Ok(())
    }

    /// Cosine search. Points whose payload cannot be decoded are skipped.
    #[instrument(skip_all, fields(collection = %self.collection, k = k))]
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorDbError> {
        self.check_dim(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorDbError::operation(StoreOp::Search, &self.collection, e))?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| match hit_from_scored_point(point) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable point");
                    None
                }
            })
            .collect();

        Ok(hits)
    }

    /// Deletes documents by id.
    pub async fn delete_documents(&self, ids: &[String]) -> Result<(), VectorDbError> {
        if ids.is_empty() {
            return Ok(());
        }

        let points_selector = PointsIdsList {
            ids: ids
                .iter()
                .map(|id| point_id_for(&self.collection, id).into())
                .collect(),
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(points_selector)
                    .wait(true),
            )
            .await
            .map_err(|e| VectorDbError::operation(StoreOp::Delete, &self.collection, e))?;

        Ok(())
    }

    /// Drops and recreates the collection.
    pub async fn clear(&self) -> Result<(), VectorDbError> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(DeleteCollectionBuilder::new(&self.collection))
                .await
                .map_err(|e| {
                    VectorDbError::operation(StoreOp::DropCollection, &self.collection, e)
                })?;
        }
        self.ensure_collection().await
    }

    fn connection_error(&self, err: impl std::fmt::Display) -> VectorDbError {
        VectorDbError::ConnectionFailed {
            url: self.url.clone(),
            message: err.to_string(),
        }
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), VectorDbError> {
        if vector.len() as u64 != self.vector_size {
            return Err(VectorDbError::InvalidDimension {
                expected: self.vector_size as usize,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorStore for QdrantStore {
    type Error = VectorDbError;

    async fn add(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), VectorDbError> {
        self.upsert_chunks(chunks, embeddings).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorDbError> {
        self.search(query, k).await
    }

    async fn clear(&self) -> Result<(), VectorDbError> {
        self.clear().await
    }
}
