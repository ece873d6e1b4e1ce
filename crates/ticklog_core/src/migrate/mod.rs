//! Schema migration for persisted blobs.
//!
//! # Responsibility
//! - Upgrade loosely-typed decoded values from any known older shape to the
//!   current one before typed decoding.
//! - Decode the three stored collections from raw blob text.
//!
//! # Invariants
//! - Migrations are additive: fields are only ever inserted, never removed
//!   or rewritten.
//! - Unknown fields pass through untouched.
//! - An element that fails to decode is dropped alone; only a blob that is
//!   not an array falls back to an empty collection.
//! - A step only fires when its field is absent, so re-running the chain on
//!   current data is a no-op.
//!
//! # Schema history
//! - v1: projects without `parentId`; single-slot timer `{projectId, startTime}`.
//! - v2: `parentId` on projects; timer becomes `{activeTimers: {..}}`.
//! - v3: `sortOrder` and `lastUsedAt` on projects.

mod project;
mod timer;

pub use project::{migrate_project, PROJECT_STEPS};
pub use timer::migrate_timer_state;

use crate::model::project::Project;
use crate::model::record::TimeRecord;
use crate::model::timer::TimerState;
use crate::model::Millis;
use crate::storage::{PROJECTS_KEY, RECORDS_KEY};
use log::{debug, warn};
use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// One "if field missing, set default" upgrade.
#[derive(Clone, Copy)]
pub struct MigrationStep {
    /// Stable name used in logs.
    pub name: &'static str,
    /// Field inserted by this step.
    pub field: &'static str,
    /// Produces the default from the object as seen so far and the current time.
    pub default: fn(&JsonObject, Millis) -> Value,
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("name", &self.name)
            .field("field", &self.field)
            .finish()
    }
}

impl MigrationStep {
    /// Applies this step alone. Returns whether the field was inserted.
    pub fn apply(&self, object: &mut JsonObject, now: Millis) -> bool {
        if object.contains_key(self.field) {
            return false;
        }
        let value = (self.default)(object, now);
        object.insert(self.field.to_string(), value);
        debug!(
            "event=migration_step module=migrate status=applied step={}",
            self.name
        );
        true
    }
}

/// Runs `steps` in order over an object value. Non-objects are returned as-is.
pub fn apply_steps(value: Value, steps: &[MigrationStep], now: Millis) -> Value {
    match value {
        Value::Object(mut object) => {
            for step in steps {
                step.apply(&mut object, now);
            }
            Value::Object(object)
        }
        other => other,
    }
}

/// Decodes and migrates the `projects` blob.
///
/// Fails only when the blob is not a JSON array. Elements that still do not
/// decode after migration are skipped with a warning.
pub fn decode_projects(raw: &str, now: Millis) -> serde_json::Result<Vec<Project>> {
    decode_elements(raw, PROJECTS_KEY, |item| migrate_project(item, now))
}

/// Decodes the `records` blob element by element. Records have no versioned
/// fields yet.
pub fn decode_records(raw: &str) -> serde_json::Result<Vec<TimeRecord>> {
    decode_elements(raw, RECORDS_KEY, |item| item)
}

fn decode_elements<T: DeserializeOwned>(
    raw: &str,
    key: &'static str,
    upgrade: impl Fn(Value) -> Value,
) -> serde_json::Result<Vec<T>> {
    let Value::Array(items) = serde_json::from_str::<Value>(raw)? else {
        return Err(serde_json::Error::custom(format!(
            "`{key}` blob is not an array"
        )));
    };

    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value(upgrade(item)) {
            Ok(value) => decoded.push(value),
            Err(err) => warn!(
                "event=blob_decode module=migrate status=skipped key={key} index={index} error={err}"
            ),
        }
    }
    Ok(decoded)
}

/// Decodes and migrates the `timer` blob.
pub fn decode_timer_state(raw: &str) -> serde_json::Result<TimerState> {
    let value: Value = serde_json::from_str(raw)?;
    serde_json::from_value(migrate_timer_state(value))
}

/// JavaScript-style truthiness, which legacy writers relied on.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
