//! Project upgrade chain.

use super::{apply_steps, JsonObject, MigrationStep};
use crate::model::Millis;
use serde_json::Value;

/// Ordered project steps: v1→v2 (`parentId`), v2→v3 (`sortOrder`, `lastUsedAt`).
pub const PROJECT_STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "project_parent_id",
        field: "parentId",
        default: null_default,
    },
    MigrationStep {
        name: "project_sort_order",
        field: "sortOrder",
        default: zero_default,
    },
    MigrationStep {
        name: "project_last_used_at",
        field: "lastUsedAt",
        default: last_used_at_default,
    },
];

fn null_default(_: &JsonObject, _: Millis) -> Value {
    Value::Null
}

fn zero_default(_: &JsonObject, _: Millis) -> Value {
    Value::from(0)
}

fn last_used_at_default(object: &JsonObject, now: Millis) -> Value {
    match object.get("createdAt") {
        Some(created_at) if !created_at.is_null() => created_at.clone(),
        _ => Value::from(now),
    }
}

/// Upgrades one raw project value to the current shape.
pub fn migrate_project(value: Value, now: Millis) -> Value {
    apply_steps(value, PROJECT_STEPS, now)
}
