//! Storage and migration engine for the ticklog time tracker.
//! This crate owns every persisted invariant: project tree integrity,
//! timer/record consistency, additive schema migration and cost statistics.

pub mod config;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod storage;
pub mod store;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::project::{Project, ProjectId, ProjectPatch, ProjectSort};
pub use model::record::{NewRecord, ProjectStats, RecordId, RecordPatch, TimeRecord};
pub use model::timer::TimerState;
pub use model::{Millis, ValidationError};
pub use storage::{
    AdapterError, AdapterResult, MemoryAdapter, SqliteAdapter, StorageAdapter, PROJECTS_KEY,
    RECORDS_KEY, TIMER_KEY,
};
pub use store::{
    CascadeSummary, Clock, EntityStore, ManualClock, StoreError, StoreResult, SystemClock,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
