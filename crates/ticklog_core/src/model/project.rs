//! Project entity.
//!
//! # Invariants
//! - `parent_id` chains form a forest; `None` marks a top-level project.
//! - `sort_order` is only meaningful among siblings.

use super::{validate_hourly_rate, Millis, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque project identifier. Legacy data may carry non-UUID ids.
pub type ProjectId = String;

/// A named billable work bucket, optionally nested under another project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(deserialize_with = "super::rate_or_zero")]
    pub hourly_rate: f64,
    pub created_at: Millis,
    pub parent_id: Option<ProjectId>,
    pub sort_order: i64,
    /// Bumped on every timer start; drives "recent" ordering.
    pub last_used_at: Millis,
    /// Fields written by newer builds or other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Creates a top-level or nested project stamped at `now`.
    pub fn new(
        name: impl Into<String>,
        hourly_rate: f64,
        parent_id: Option<ProjectId>,
        now: Millis,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            hourly_rate,
            created_at: now,
            parent_id,
            sort_order: 0,
            last_used_at: now,
            extra: Map::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_hourly_rate(self.hourly_rate)
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Merges a patch; identity fields are untouched.
    pub fn apply(&mut self, patch: &ProjectPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(rate) = patch.hourly_rate {
            self.hourly_rate = rate;
        }
        if let Some(parent_id) = &patch.parent_id {
            self.parent_id = parent_id.clone();
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(last_used_at) = patch.last_used_at {
            self.last_used_at = last_used_at;
        }
    }
}

/// Partial project update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub hourly_rate: Option<f64>,
    /// `Some(None)` moves the project to the top level.
    pub parent_id: Option<Option<ProjectId>>,
    pub sort_order: Option<i64>,
    pub last_used_at: Option<Millis>,
}

impl ProjectPatch {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            name: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn hourly_rate(value: f64) -> Self {
        Self {
            hourly_rate: Some(value),
            ..Self::default()
        }
    }

    pub fn parent(value: Option<ProjectId>) -> Self {
        Self {
            parent_id: Some(value),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.hourly_rate {
            Some(rate) => validate_hourly_rate(rate),
            None => Ok(()),
        }
    }
}

/// Ordering applied to top-level projects by `get_sorted_projects`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectSort {
    /// `sort_order` ascending.
    #[default]
    Manual,
    /// `last_used_at` descending.
    Recent,
    /// Case-insensitive name ascending.
    Name,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_stamps_both_timestamps() {
        let project = Project::new("Client A", 80.0, None, 1_000);
        assert_eq!(project.created_at, 1_000);
        assert_eq!(project.last_used_at, 1_000);
        assert_eq!(project.sort_order, 0);
        assert!(project.is_top_level());
    }

    #[test]
    fn apply_leaves_identity_fields_alone() {
        let mut project = Project::new("Client A", 80.0, None, 1_000);
        let id = project.id.clone();
        project.apply(&ProjectPatch {
            name: Some("Client B".to_string()),
            parent_id: Some(Some("p-parent".to_string())),
            ..ProjectPatch::default()
        });
        assert_eq!(project.id, id);
        assert_eq!(project.created_at, 1_000);
        assert_eq!(project.name, "Client B");
        assert_eq!(project.parent_id.as_deref(), Some("p-parent"));
        assert_eq!(project.hourly_rate, 80.0);
    }

    #[test]
    fn negative_or_nan_rate_is_rejected() {
        assert!(ProjectPatch::hourly_rate(-1.0).validate().is_err());
        assert!(ProjectPatch::hourly_rate(f64::NAN).validate().is_err());
        assert!(ProjectPatch::hourly_rate(0.0).validate().is_ok());
    }

    #[test]
    fn serializes_with_camel_case_and_null_parent() {
        let project = Project::new("Client A", 80.0, None, 1_000);
        let value = serde_json::to_value(&project).expect("project should serialize");
        assert_eq!(value["parentId"], Value::Null);
        assert_eq!(value["hourlyRate"], 80.0);
        assert_eq!(value["lastUsedAt"], 1_000);
    }

    #[test]
    fn unknown_fields_survive_a_decode_encode_cycle() {
        let raw = serde_json::json!({
            "id": "p1",
            "name": "Legacy",
            "hourlyRate": 10,
            "createdAt": 5,
            "parentId": null,
            "sortOrder": 0,
            "lastUsedAt": 5,
            "color": "#ff0000"
        });
        let project: Project = serde_json::from_value(raw).expect("project should decode");
        assert_eq!(project.extra.get("color"), Some(&Value::from("#ff0000")));
        let encoded = serde_json::to_value(&project).expect("project should encode");
        assert_eq!(encoded["color"], "#ff0000");
    }
}
