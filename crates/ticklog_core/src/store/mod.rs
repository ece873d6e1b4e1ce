//! Entity store: the authoritative in-memory cache over a backing adapter.
//!
//! # Responsibility
//! - Load, migrate and heal the persisted collections.
//! - Own project tree, record, timer and aggregation operations.
//!
//! # Invariants
//! - Every mutation is applied in memory first, then the touched collection
//!   is written in full; a failed write is returned, not rolled back.
//! - Reads hand out owned snapshots.
//! - Unknown identifiers on update/delete are silent no-ops.

mod clock;
mod entity_store;
mod forest;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity_store::{CascadeSummary, EntityStore};

use crate::model::project::ProjectId;
use crate::model::ValidationError;
use crate::storage::AdapterError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Durable write failed; memory already holds the new state.
    Adapter(AdapterError),
    /// A collection could not be serialized.
    Encode(serde_json::Error),
    /// Input rejected before any mutation.
    Validation(ValidationError),
    /// Re-parenting would make a project its own ancestor.
    CycleDetected {
        project_id: ProjectId,
        parent_id: ProjectId,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adapter(err) => write!(f, "durable write failed: {err}"),
            Self::Encode(err) => write!(f, "failed to encode collection: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::CycleDetected {
                project_id,
                parent_id,
            } => write!(
                f,
                "moving project {project_id} under {parent_id} would create a cycle"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Adapter(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::CycleDetected { .. } => None,
        }
    }
}

impl From<AdapterError> for StoreError {
    fn from(value: AdapterError) -> Self {
        Self::Adapter(value)
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
