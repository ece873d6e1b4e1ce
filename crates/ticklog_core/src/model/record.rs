//! Time record entity and derived statistics.
//!
//! # Invariants
//! - `end_time == None` marks an open interval; at most one per project.
//! - `hourly_rate` is captured at creation and never follows later
//!   project rate edits.

use super::project::ProjectId;
use super::{validate_hourly_rate, Millis, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RecordId = String;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// One timed work interval billed at a fixed hourly rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRecord {
    pub id: RecordId,
    pub project_id: ProjectId,
    pub start_time: Millis,
    pub end_time: Option<Millis>,
    #[serde(deserialize_with = "super::rate_or_zero")]
    pub hourly_rate: f64,
    #[serde(default)]
    pub note: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TimeRecord {
    /// Builds a record with a freshly generated id.
    pub fn from_new(record: NewRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: record.project_id,
            start_time: record.start_time,
            end_time: record.end_time,
            hourly_rate: record.hourly_rate,
            note: record.note,
            extra: Map::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Closed duration in milliseconds; open records count as zero.
    pub fn duration(&self) -> Millis {
        self.end_time
            .map_or(0, |end| end.saturating_sub(self.start_time))
    }

    /// Cost at this record's own rate; open records cost nothing.
    pub fn cost(&self) -> f64 {
        self.duration() as f64 / MILLIS_PER_HOUR * self.hourly_rate
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_hourly_rate(self.hourly_rate)?;
        match self.end_time {
            Some(end_time) if end_time < self.start_time => Err(ValidationError::EndBeforeStart {
                start_time: self.start_time,
                end_time,
            }),
            _ => Ok(()),
        }
    }

    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(rate) = patch.hourly_rate {
            self.hourly_rate = rate;
        }
        if let Some(note) = &patch.note {
            self.note = note.clone();
        }
    }
}

/// Input for `add_record`; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub project_id: ProjectId,
    pub start_time: Millis,
    pub end_time: Option<Millis>,
    pub hourly_rate: f64,
    pub note: String,
}

/// Partial record update. `id`, `project_id` and `start_time` are fixed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// `Some(None)` reopens the interval.
    pub end_time: Option<Option<Millis>>,
    pub hourly_rate: Option<f64>,
    pub note: Option<String>,
}

impl RecordPatch {
    pub fn note(value: impl Into<String>) -> Self {
        Self {
            note: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn end_time(value: Millis) -> Self {
        Self {
            end_time: Some(Some(value)),
            ..Self::default()
        }
    }
}

/// Aggregate over a set of records. Derived, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectStats {
    pub total_duration: Millis,
    pub total_cost: f64,
    pub record_count: usize,
}

impl ProjectStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TimeRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut stats, record| {
                stats.total_duration = stats.total_duration.saturating_add(record.duration());
                stats.total_cost += record.cost();
                stats.record_count += 1;
                stats
            })
    }
}

impl std::ops::Add for ProjectStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total_duration: self.total_duration.saturating_add(rhs.total_duration),
            total_cost: self.total_cost + rhs.total_cost,
            record_count: self.record_count + rhs.record_count,
        }
    }
}
