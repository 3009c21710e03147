//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `STRATUM_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{EvictionStrategy, RamCacheConfig};
use crate::constants::{
    BYTES_PER_GB, DEFAULT_EMBEDDING_DIM, DEFAULT_MAX_DOCUMENTS, DEFAULT_MEMORY_BUDGET_BYTES,
};
use crate::embedding::HttpEmbedderConfig;
use crate::store::{MirrorMode, StoreConfig};
use crate::vectordb::{DEFAULT_COLLECTION_NAME, DEFAULT_QDRANT_URL};

/// Default model name sent to the HTTP embedder.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Process configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `STRATUM_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Arena budget in bytes. Default: 256 MiB.
    pub memory_budget_bytes: usize,

    /// Embedding length. Default: `384`.
    pub embedding_dim: usize,

    /// Ceiling on cached documents. Default: `100_000`.
    pub max_documents: usize,

    pub eviction: EvictionStrategy,

    /// Degrade to the persistent store on RAM failures. Default: `true`.
    pub fallback_enabled: bool,

    /// Default: background.
    pub mirror_mode: MirrorMode,

    /// Prime the embedding memo at startup. Default: `true`.
    pub warmup_enabled: bool,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Qdrant collection. Default: `stratum_chunks`.
    pub collection: String,

    /// Base URL of an OpenAI-compatible embeddings service. Unset selects the stub embedder.
    pub embedding_url: Option<String>,

    pub embedding_model: String,

    pub embedding_api_key: Option<String>,

    /// Where an external snapshot of the cache would go. Carried only.
    pub persist_hint: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            max_documents: DEFAULT_MAX_DOCUMENTS,
            eviction: EvictionStrategy::Lru,
            fallback_enabled: true,
            mirror_mode: MirrorMode::Background,
            warmup_enabled: true,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_url: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            persist_hint: None,
        }
    }
}

impl Config {
    const ENV_MEMORY_BUDGET_BYTES: &'static str = "STRATUM_MEMORY_BUDGET_BYTES";
    const ENV_MEMORY_BUDGET_GB: &'static str = "STRATUM_MEMORY_BUDGET_GB";
    const ENV_EMBEDDING_DIM: &'static str = "STRATUM_EMBEDDING_DIM";
    const ENV_MAX_DOCUMENTS: &'static str = "STRATUM_MAX_DOCUMENTS";
    const ENV_EVICTION: &'static str = "STRATUM_EVICTION";
    const ENV_FALLBACK_ENABLED: &'static str = "STRATUM_FALLBACK_ENABLED";
    const ENV_MIRROR_MODE: &'static str = "STRATUM_MIRROR_MODE";
    const ENV_WARMUP_ENABLED: &'static str = "STRATUM_WARMUP_ENABLED";
    const ENV_QDRANT_URL: &'static str = "STRATUM_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "STRATUM_COLLECTION";
    const ENV_EMBEDDING_URL: &'static str = "STRATUM_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "STRATUM_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "STRATUM_EMBEDDING_API_KEY";
    const ENV_PERSIST_HINT: &'static str = "STRATUM_PERSIST_HINT";

    /// Every variable [`from_env`](Self::from_env) reads.
    pub const ENV_VARS: &'static [&'static str] = &[
        Self::ENV_MEMORY_BUDGET_BYTES,
        Self::ENV_MEMORY_BUDGET_GB,
        Self::ENV_EMBEDDING_DIM,
        Self::ENV_MAX_DOCUMENTS,
        Self::ENV_EVICTION,
        Self::ENV_FALLBACK_ENABLED,
        Self::ENV_MIRROR_MODE,
        Self::ENV_WARMUP_ENABLED,
        Self::ENV_QDRANT_URL,
        Self::ENV_COLLECTION,
        Self::ENV_EMBEDDING_URL,
        Self::ENV_EMBEDDING_MODEL,
        Self::ENV_EMBEDDING_API_KEY,
        Self::ENV_PERSIST_HINT,
    ];

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let memory_budget_bytes = match Self::parse_usize_from_env(Self::ENV_MEMORY_BUDGET_BYTES)? {
            Some(bytes) => bytes,
            None => Self::parse_gb_from_env(Self::ENV_MEMORY_BUDGET_GB)?
                .unwrap_or(defaults.memory_budget_bytes),
        };
        let embedding_dim = Self::parse_usize_from_env(Self::ENV_EMBEDDING_DIM)?
            .unwrap_or(defaults.embedding_dim);
        let max_documents = Self::parse_usize_from_env(Self::ENV_MAX_DOCUMENTS)?
            .unwrap_or(defaults.max_documents);
        let eviction =
            Self::parse_choice_from_env(Self::ENV_EVICTION)?.unwrap_or(defaults.eviction);
        let fallback_enabled = Self::parse_bool_from_env(Self::ENV_FALLBACK_ENABLED)?
            .unwrap_or(defaults.fallback_enabled);
        let mirror_mode =
            Self::parse_choice_from_env(Self::ENV_MIRROR_MODE)?.unwrap_or(defaults.mirror_mode);
        let warmup_enabled = Self::parse_bool_from_env(Self::ENV_WARMUP_ENABLED)?
            .unwrap_or(defaults.warmup_enabled);
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let collection = Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection);
        let embedding_url = Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_URL);
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let embedding_api_key = Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY);
        let persist_hint =
            Self::parse_optional_string_from_env(Self::ENV_PERSIST_HINT).map(PathBuf::from);

        Ok(Self {
            memory_budget_bytes,
            embedding_dim,
            max_documents,
            eviction,
            fallback_enabled,
            mirror_mode,
            warmup_enabled,
            qdrant_url,
            collection,
            embedding_url,
            embedding_model,
            embedding_api_key,
            persist_hint,
        })
    }

    /// Checks invariants the component configs rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ram_cache_config()
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                name: "cache",
                reason: e.to_string(),
            })?;

        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_COLLECTION,
                reason: "must not be empty".to_string(),
            });
        }
        if self.fallback_enabled && self.qdrant_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_QDRANT_URL,
                reason: "required when the fallback is enabled".to_string(),
            });
        }

        Ok(())
    }

    /// RAM cache settings.
    pub fn ram_cache_config(&self) -> RamCacheConfig {
        let mut config =
            RamCacheConfig::new(self.memory_budget_bytes, self.embedding_dim, self.max_documents)
                .eviction(self.eviction);
        if let Some(path) = &self.persist_hint {
            config = config.persist_hint(path.clone());
        }
        config
    }

    /// Facade settings.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .fallback_enabled(self.fallback_enabled)
            .mirror_mode(self.mirror_mode)
            .warmup(self.warmup_enabled)
    }

    /// HTTP embedder settings, if an embedding service is configured.
    pub fn http_embedder_config(&self) -> Option<HttpEmbedderConfig> {
        self.embedding_url.as_ref().map(|url| {
            let config =
                HttpEmbedderConfig::new(url.clone(), self.embedding_model.clone(), self.embedding_dim);
            match &self.embedding_api_key {
                Some(key) => config.api_key(key.clone()),
                None => config,
            }
        })
    }

    fn parse_usize_from_env(name: &'static str) -> Result<Option<usize>, ConfigError> {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|source| ConfigError::InvalidInteger {
                    name,
                    value,
                    source,
                }),
            None => Ok(None),
        }
    }

    fn parse_gb_from_env(name: &'static str) -> Result<Option<usize>, ConfigError> {
        let Some(value) = Self::parse_optional_string_from_env(name) else {
            return Ok(None);
        };
        let gb: f64 = value.parse().map_err(|source| ConfigError::InvalidFloat {
            name,
            value: value.clone(),
            source,
        })?;
        if !gb.is_finite() || gb <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name,
                reason: format!("'{value}' must be a positive number of gigabytes"),
            });
        }
        Ok(Some((gb * BYTES_PER_GB) as usize))
    }

    fn parse_bool_from_env(name: &'static str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = Self::parse_optional_string_from_env(name) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidBool { name, value }),
        }
    }

    fn parse_choice_from_env<T>(name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr<Err = String>,
    {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|reason| ConfigError::InvalidChoice { name, reason }),
            None => Ok(None),
        }
    }

    fn parse_string_from_env(name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
