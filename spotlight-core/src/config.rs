//! Aggregate configuration for the spotlight subsystem.
//!
//! Loaded the way this workspace loads its root config: a JSON file on
//! disk, falling back to built-in defaults (and writing them out) when the
//! file is absent, so a fresh deployment doesn't need a hand-authored
//! config to start.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotlightConfig {
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub indexer: IndexerConfig,
    pub outbox: OutboxConfig,
    pub ranker: RankerConfig,
    pub refresh_queue: RefreshQueueConfig,
}

/// Per-request latency budget and per-stage timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub total_budget: Duration,
    pub engine_timeout: Duration,
    pub agent_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            total_budget: Duration::from_millis(800),
            engine_timeout: Duration::from_millis(400),
            agent_timeout: Duration::from_millis(300),
        }
    }
}

/// In-process response cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(2),
            capacity: 512,
        }
    }
}

/// Full-sync indexing pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

/// Outbox polling tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 200,
        }
    }
}

/// Lexical/vector score blending weights. Must sum to roughly 1.0; not
/// enforced, since a caller intentionally over- or under-weighting is a
/// valid tuning choice. The title-match bonus tiers are fixed constants,
/// not configurable here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankerConfig {
    pub lexical_weight: f32,
    pub vector_weight: f32,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            lexical_weight: 0.75,
            vector_weight: 0.25,
        }
    }
}

/// Bounded-channel capacity for the background reindex-request queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefreshQueueConfig {
    pub capacity: usize,
}

impl Default for RefreshQueueConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            indexer: IndexerConfig::default(),
            outbox: OutboxConfig::default(),
            ranker: RankerConfig::default(),
            refresh_queue: RefreshQueueConfig::default(),
        }
    }
}

impl SpotlightConfig {
    /// Loads configuration from `path`, creating it with defaults if it
    /// doesn't exist yet.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let config: Self = serde_json::from_str(&contents)?;
                info!(path = %path.display(), "loaded spotlight configuration");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config file unreadable, using defaults");
                let config = Self::default();
                config.save(path).await?;
                Ok(config)
            }
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let serialized = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, serialized).await?;
        info!(path = %path.display(), "wrote spotlight configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SpotlightConfig::default();
        assert_eq!(config.cache.ttl, Duration::from_secs(2));
        assert_eq!(config.cache.capacity, 512);
        assert_eq!(config.indexer.batch_size, 500);
        assert_eq!(config.outbox.batch_size, 200);
        assert!((config.ranker.lexical_weight + config.ranker.vector_weight - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn load_writes_defaults_when_missing() {
        let path = std::env::temp_dir().join(format!("spotlight-config-test-{}.json", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;

        let config = SpotlightConfig::load(&path).await.unwrap();
        assert_eq!(config.cache.capacity, 512);

        let reloaded = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(reloaded.contains("\"capacity\": 512"));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
