//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. byte sizes) from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is fixed when a cache is constructed. Every embedding that crosses a
//! module boundary (embedder output, cache insert, query vector, fallback store) must match it.
//! Use [`DimConfig`] to carry the dimension through initialization and
//! [`validate_embedding_dim`] at boundaries to reject mismatches before any memory is touched.

/// Default embedding dimension (MiniLM-class sentence encoders).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Bytes per embedding element (`f32`).
pub const F32_BYTES: usize = std::mem::size_of::<f32>();

pub const DEFAULT_EMBEDDING_BYTES: usize = DEFAULT_EMBEDDING_DIM * F32_BYTES;

/// Default arena budget: 256 MiB.
pub const DEFAULT_MEMORY_BUDGET_BYTES: usize = 256 * 1024 * 1024;

pub const DEFAULT_MAX_DOCUMENTS: usize = 100_000;

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Share of the arena budget reserved for each region. The four shares sum to 1.0.
pub const VECTOR_REGION_SHARE: f64 = 0.80;
pub const METADATA_REGION_SHARE: f64 = 0.15;
pub const INDEX_REGION_SHARE: f64 = 0.04;
pub const LRU_REGION_SHARE: f64 = 0.01;

/// Vector-region utilization above which inserts evict first.
pub const DEFAULT_HIGH_WATERMARK: f64 = 0.9;

/// Embedding memo size that triggers trimming in `optimize()`.
pub const DEFAULT_MEMO_TRIM_THRESHOLD: usize = 10_000;

/// Entries kept by the memo after trimming.
pub const DEFAULT_MEMO_RETAIN: usize = 5_000;

/// Runtime dimension configuration for modules that support dynamic embedding sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration with the specified embedding dimension.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Returns an error if `embedding_dim` is zero.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }

    /// Returns the number of bytes one embedding occupies in an arena slot.
    pub fn slot_bytes(&self) -> usize {
        self.embedding_dim * F32_BYTES
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DimValidationError {
    #[error("embedding dimension cannot be zero")]
    ZeroDimension,
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use stratum::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// validate_embedding_dim(384, DEFAULT_EMBEDDING_DIM).unwrap();
/// assert!(validate_embedding_dim(768, DEFAULT_EMBEDDING_DIM).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_config_default() {
        let config = DimConfig::default();
        assert_eq!(config.embedding_dim, DEFAULT_EMBEDDING_DIM);
        assert_eq!(config.slot_bytes(), DEFAULT_EMBEDDING_BYTES);
    }

    #[test]
    fn test_dim_config_validate_zero() {
        let config = DimConfig::new(0);
        assert_eq!(config.validate(), Err(DimValidationError::ZeroDimension));
    }

    #[test]
    fn test_dim_config_accepts_odd_dimensions() {
        assert!(DimConfig::new(3).validate().is_ok());
        assert_eq!(DimConfig::new(3).slot_bytes(), 12);
    }

    #[test]
    fn test_region_shares_sum_to_one() {
        let total =
            VECTOR_REGION_SHARE + METADATA_REGION_SHARE + INDEX_REGION_SHARE + LRU_REGION_SHARE;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_embedding_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(768, 384),
            Err(DimValidationError::DimensionMismatch {
                expected: 384,
                actual: 768
            })
        );
        assert!(validate_embedding_dim(384, 384).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = DimValidationError::ZeroDimension;
        assert_eq!(err.to_string(), "embedding dimension cannot be zero");

        let err = DimValidationError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains("768"));
    }
}
