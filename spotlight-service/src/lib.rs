//! The spotlight search orchestrator (`SpotlightService`) and the full-sync
//! indexing pipeline (`IndexerPipeline`). The metrics hook trait every
//! stage reports through lives in `spotlight_core` so engines outside this
//! crate (the Postgres outbox processor) can report through it too.

pub mod pipeline;
pub mod service;

#[cfg(test)]
mod e2e;

pub use pipeline::IndexerPipeline;
pub use service::SpotlightService;
pub use spotlight_core::{NoopMetrics, SpotlightMetrics};
