//! Running timer registry.

use super::project::ProjectId;
use super::Millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project id → start time of its running timer.
///
/// A project is running iff it has an entry; each entry is backed by one
/// open `TimeRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    #[serde(default)]
    pub active_timers: BTreeMap<ProjectId, Millis>,
}

impl TimerState {
    pub fn is_running(&self, project_id: &str) -> bool {
        self.active_timers.contains_key(project_id)
    }

    pub fn started_at(&self, project_id: &str) -> Option<Millis> {
        self.active_timers.get(project_id).copied()
    }

    pub fn running_count(&self) -> usize {
        self.active_timers.len()
    }
}
