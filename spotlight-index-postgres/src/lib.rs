//! PostgreSQL-backed hybrid (lexical + vector) index engine, the outbox
//! processor that drains tenant-scoped change events into it, and the
//! preflight/schema helpers both depend on.
//!
//! Grounded in this workspace's `TenantManager` (`sqlx::query` with
//! positional binds, `row.try_get` plus `serde_json` for JSONB columns,
//! `CREATE TABLE IF NOT EXISTS` run from `new()` rather than a separate
//! migration step).

pub mod engine;
pub mod outbox;
pub mod schema;

pub use engine::PostgresIndexEngine;
pub use outbox::OutboxProcessor;
pub use schema::preflight;
