#![deny(missing_docs)]
//! deck_core: shared building blocks (config, KV, logging, script store, run simulator).

/// Configuration helpers (AppId, dirs, load_or_init, etc.)
pub mod cfg;
/// Error type of the KV layer and the script store.
pub mod error;
/// Simple file-backed and in-memory KV stores with serde helpers.
pub mod store;
/// Tracing/log initialization helpers.
pub mod logx;
/// Script records, statuses, log entries and the export format.
pub mod script;
/// Stored recurrence configuration.
pub mod schedule;
/// Demo records and the template gallery.
pub mod catalog;
/// The script store: records plus logs, persisted on every mutation.
pub mod registry;
/// Deadline-ordered deferred task queue.
pub mod timers;
/// Timed status transitions of a simulated run.
pub mod simulator;
/// Dashboard counters.
pub mod stats;

pub use error::StoreError;
pub use registry::ScriptStore;
pub use simulator::{RunSimulator, RunTiming};
