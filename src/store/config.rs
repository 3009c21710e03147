use crate::cache::{CacheError, CacheResult};
use crate::constants::{DEFAULT_MEMO_RETAIN, DEFAULT_MEMO_TRIM_THRESHOLD};

/// How successful RAM inserts are copied into the fallback store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// RAM only; the fallback is written only when RAM rejects a batch.
    Disabled,
    /// `add_documents` returns once both stores hold the batch.
    Synchronous,
    /// `add_documents` returns after the RAM insert; the fallback write is a tracked
    /// background task whose failure is logged.
    #[default]
    Background,
}

impl std::str::FromStr for MirrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(MirrorMode::Disabled),
            "sync" | "synchronous" => Ok(MirrorMode::Synchronous),
            "background" | "async" => Ok(MirrorMode::Background),
            other => Err(format!("unknown mirror mode '{other}'")),
        }
    }
}

/// Representative queries embedded at startup to prime the memo.
pub const DEFAULT_WARMUP_QUERIES: &[&str] = &[
    "What assignments are due this week?",
    "Summarize the course syllabus",
    "When is the next exam?",
    "Explain the grading policy",
    "What topics were covered in the last lecture?",
];

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub ram_cache_enabled: bool,
    pub fallback_enabled: bool,
    pub mirror_mode: MirrorMode,
    pub warmup_enabled: bool,
    pub warmup_queries: Vec<String>,
    /// Memo size above which [`optimize`](super::CachedVectorStore::optimize) trims.
    pub memo_trim_threshold: usize,
    /// Entries kept by a trim.
    pub memo_retain: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ram_cache_enabled: true,
            fallback_enabled: true,
            mirror_mode: MirrorMode::default(),
            warmup_enabled: true,
            warmup_queries: DEFAULT_WARMUP_QUERIES
                .iter()
                .map(|q| q.to_string())
                .collect(),
            memo_trim_threshold: DEFAULT_MEMO_TRIM_THRESHOLD,
            memo_retain: DEFAULT_MEMO_RETAIN,
        }
    }
}

impl StoreConfig {
    /// RAM cache only: no fallback, no warmup.
    pub fn ram_only() -> Self {
        Self {
            fallback_enabled: false,
            mirror_mode: MirrorMode::Disabled,
            warmup_enabled: false,
            ..Default::default()
        }
    }

    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn ram_cache_enabled(mut self, enabled: bool) -> Self {
        self.ram_cache_enabled = enabled;
        self
    }

    pub fn mirror_mode(mut self, mode: MirrorMode) -> Self {
        self.mirror_mode = mode;
        self
    }

    pub fn warmup(mut self, enabled: bool) -> Self {
        self.warmup_enabled = enabled;
        self
    }

    pub fn warmup_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.warmup_queries = queries.into_iter().map(Into::into).collect();
        self
    }

    pub fn memo_limits(mut self, trim_threshold: usize, retain: usize) -> Self {
        self.memo_trim_threshold = trim_threshold;
        self.memo_retain = retain;
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.memo_retain > self.memo_trim_threshold {
            return Err(CacheError::Config {
                reason: format!(
                    "memo_retain ({}) must not exceed memo_trim_threshold ({})",
                    self.memo_retain, self.memo_trim_threshold
                ),
            });
        }
        if !self.ram_cache_enabled && !self.fallback_enabled {
            return Err(CacheError::Config {
                reason: "at least one of the RAM cache and the fallback store must be enabled"
                    .to_string(),
            });
        }
        Ok(())
    }
}
