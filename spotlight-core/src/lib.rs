//! Shared types, contracts, configuration and error taxonomy for the
//! spotlight search subsystem. Every other crate in this workspace depends
//! on this one; it has no dependency on any of them.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod types;

pub use config::{CacheConfig, IndexerConfig, OutboxConfig, RankerConfig, RefreshQueueConfig, SearchConfig, SpotlightConfig};
pub use errors::{ErrNoAgentAnswer, SpotlightError};
pub use metrics::{NoopMetrics, SpotlightMetrics};
pub use types::{
    AccessPolicy, AgentAnswer, DocumentEvent, DocumentRef, Intent, Principal, SearchDocument,
    SearchHit, SearchRequest, SearchResponse, SearchTelemetry, SuggestedAction, Visibility,
    DEFAULT_TOP_K, MAX_TOP_K,
};
