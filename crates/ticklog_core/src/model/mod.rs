//! Domain model for projects, time records and running timers.
//!
//! # Responsibility
//! - Define the persisted shapes of the three stored collections.
//! - Define patch types used by update operations.
//! - Validate numeric invariants before anything is written.
//!
//! # Invariants
//! - Identity fields (`id`, `created_at`, record `project_id`/`start_time`)
//!   are not reachable through any patch type.
//! - Unknown persisted fields are kept in `extra` and written back unchanged.

pub mod project;
pub mod record;
pub mod timer;

use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Epoch milliseconds.
pub type Millis = i64;

/// Validation failures raised before a write reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Hourly rate is negative, NaN or infinite.
    InvalidHourlyRate(f64),
    /// Record end time precedes its start time.
    EndBeforeStart { start_time: Millis, end_time: Millis },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHourlyRate(rate) => {
                write!(f, "hourly rate must be a finite non-negative number, got {rate}")
            }
            Self::EndBeforeStart {
                start_time,
                end_time,
            } => write!(f, "record end {end_time} precedes start {start_time}"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_hourly_rate(rate: f64) -> Result<(), ValidationError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidHourlyRate(rate))
    }
}

/// Reads a persisted hourly rate. `null` is what a NaN rate serializes to,
/// and loads as zero.
pub(crate) fn rate_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
