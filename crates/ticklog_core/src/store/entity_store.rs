//! Entity store implementation.
//!
//! # Responsibility
//! - Load/migrate/heal the `projects`, `records` and `timer` blobs.
//! - Expose tree, CRUD, timer and statistics operations over them.
//!
//! # Invariants
//! - A running project has exactly one open record; start/stop write the
//!   record and the timer entry together (not atomically).
//! - Record cost always uses the record's own captured rate.
//! - `delete_project` is the only cascading delete.

use super::clock::{Clock, SystemClock};
use super::forest::ProjectForest;
use super::{StoreError, StoreResult};
use crate::migrate::{decode_projects, decode_records, decode_timer_state};
use crate::model::project::{Project, ProjectId, ProjectPatch, ProjectSort};
use crate::model::record::{NewRecord, ProjectStats, RecordId, RecordPatch, TimeRecord};
use crate::model::timer::TimerState;
use crate::model::{validate_hourly_rate, Millis};
use crate::storage::{AdapterError, StorageAdapter, PROJECTS_KEY, RECORDS_KEY, TIMER_KEY};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// What a cascading project delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub projects_removed: usize,
    pub records_removed: usize,
    pub timers_cleared: usize,
}

/// Authoritative in-memory cache of all persisted collections.
///
/// Mutations take `&mut self`: callers finish one operation before issuing
/// the next, and nothing inside the store locks.
pub struct EntityStore<A: StorageAdapter> {
    adapter: A,
    clock: Arc<dyn Clock>,
    forest: ProjectForest,
    records: Vec<TimeRecord>,
    timer: TimerState,
    initialized: bool,
}

impl<A: StorageAdapter> EntityStore<A> {
    /// Creates an empty, uninitialized store on the wall clock.
    pub fn new(adapter: A) -> Self {
        Self::with_clock(adapter, Arc::new(SystemClock))
    }

    pub fn with_clock(adapter: A, clock: Arc<dyn Clock>) -> Self {
        Self {
            adapter,
            clock,
            forest: ProjectForest::default(),
            records: Vec::new(),
            timer: TimerState::default(),
            initialized: false,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Loads all collections, migrates them and writes them back.
    ///
    /// A missing or malformed blob falls back to its empty default. Calling
    /// again after success does nothing.
    ///
    /// # Errors
    /// - Returns `StoreError::Adapter` when the heal write fails; the store
    ///   stays uninitialized so the call can be retried.
    pub async fn init(&mut self) -> StoreResult<()> {
        if self.initialized {
            return Ok(());
        }

        let started_at = Instant::now();
        info!("event=store_init module=store status=start");
        let now = self.clock.now_ms();

        let projects = self
            .load_or_default(PROJECTS_KEY, |raw| decode_projects(raw, now))
            .await;
        let records = self.load_or_default(RECORDS_KEY, decode_records).await;
        let timer = self.load_or_default(TIMER_KEY, decode_timer_state).await;

        self.forest = ProjectForest::from_projects(projects);
        self.records = records;
        self.timer = timer;

        self.persist_projects().await?;
        self.persist_records().await?;
        self.persist_timer().await?;

        self.initialized = true;
        info!(
            "event=store_init module=store status=ok duration_ms={} projects={} records={} running={}",
            started_at.elapsed().as_millis(),
            self.forest.len(),
            self.records.len(),
            self.timer.running_count()
        );
        Ok(())
    }

    // ----- projects: reads -------------------------------------------------

    pub fn get_projects(&self) -> Vec<Project> {
        self.forest.all().to_vec()
    }

    pub fn get_project(&self, id: &str) -> Option<Project> {
        self.forest.get(id).cloned()
    }

    /// Direct children of `parent_id`; `None` selects top-level projects.
    pub fn get_children(&self, parent_id: Option<&str>) -> Vec<Project> {
        self.forest
            .children(parent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_all_descendants(&self, id: &str) -> Vec<Project> {
        self.forest
            .descendants(id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Immediate parent first, root last.
    pub fn get_ancestors(&self, id: &str) -> Vec<Project> {
        self.forest.ancestors(id).into_iter().cloned().collect()
    }

    /// Top-level projects in the requested order. Ties keep insertion order.
    pub fn get_sorted_projects(&self, sort: ProjectSort) -> Vec<Project> {
        let mut top_level = self.get_children(None);
        match sort {
            ProjectSort::Manual => top_level.sort_by_key(|project| project.sort_order),
            ProjectSort::Recent => {
                top_level.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
            }
            ProjectSort::Name => top_level.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.name.cmp(&b.name))
            }),
        }
        top_level
    }

    // ----- projects: writes ------------------------------------------------

    /// Creates a project. `parent_id` is not checked for existence.
    pub async fn add_project(
        &mut self,
        name: impl Into<String>,
        hourly_rate: f64,
        parent_id: Option<&str>,
    ) -> StoreResult<Project> {
        validate_hourly_rate(hourly_rate)?;
        let project = Project::new(
            name,
            hourly_rate,
            parent_id.map(str::to_string),
            self.clock.now_ms(),
        );
        self.forest.push(project.clone());
        self.persist_projects().await?;
        info!(
            "event=project_add module=store status=ok project_id={} nested={}",
            project.id,
            !project.is_top_level()
        );
        Ok(project)
    }

    /// Merges `patch` into a project. Returns `false` for an unknown id.
    ///
    /// # Errors
    /// - `Validation` for an invalid rate.
    /// - `CycleDetected` when the new parent lies inside the project's subtree.
    pub async fn update_project(&mut self, id: &str, patch: &ProjectPatch) -> StoreResult<bool> {
        if !self.forest.contains(id) {
            debug!("event=project_update module=store status=skipped reason=unknown_id");
            return Ok(false);
        }
        patch.validate()?;
        if let Some(Some(parent_id)) = &patch.parent_id {
            if self.forest.would_create_cycle(id, parent_id) {
                return Err(StoreError::CycleDetected {
                    project_id: id.to_string(),
                    parent_id: parent_id.clone(),
                });
            }
        }

        self.forest.modify(id, |project| project.apply(patch));
        self.persist_projects().await?;
        Ok(true)
    }

    /// Deletes a project, its descendants, their records and running timers.
    pub async fn delete_project(&mut self, id: &str) -> StoreResult<CascadeSummary> {
        let doomed = self.forest.subtree_ids(id);

        let projects_removed = self.forest.remove_all(&doomed);
        let records_before = self.records.len();
        self.records
            .retain(|record| !doomed.contains(&record.project_id));
        let records_removed = records_before - self.records.len();
        let timers_before = self.timer.running_count();
        self.timer
            .active_timers
            .retain(|project_id, _| !doomed.contains(project_id));
        let timers_cleared = timers_before - self.timer.running_count();

        let summary = CascadeSummary {
            projects_removed,
            records_removed,
            timers_cleared,
        };
        if summary == CascadeSummary::default() {
            debug!("event=project_delete module=store status=skipped reason=unknown_id");
            return Ok(summary);
        }

        self.persist_projects().await?;
        self.persist_records().await?;
        if timers_cleared > 0 {
            self.persist_timer().await?;
        }
        info!(
            "event=project_delete module=store status=ok projects_removed={} records_removed={} timers_cleared={}",
            projects_removed, records_removed, timers_cleared
        );
        Ok(summary)
    }

    /// Assigns `sort_order = position` to each listed project, one write.
    pub async fn update_project_order(&mut self, ids: &[ProjectId]) -> StoreResult<()> {
        let mut matched = 0usize;
        for (position, id) in ids.iter().enumerate() {
            if self
                .forest
                .modify(id, |project| project.sort_order = position as i64)
            {
                matched += 1;
            }
        }
        if matched == 0 {
            return Ok(());
        }
        self.persist_projects().await
    }

    /// Stamps `last_used_at = now`. Returns `false` for an unknown id.
    pub async fn touch_project(&mut self, id: &str) -> StoreResult<bool> {
        let now = self.clock.now_ms();
        if !self.forest.modify(id, |project| project.last_used_at = now) {
            return Ok(false);
        }
        self.persist_projects().await?;
        Ok(true)
    }

    // ----- records ---------------------------------------------------------

    /// All records in insertion order, or one project's records newest first.
    pub fn get_records(&self, project_id: Option<&str>) -> Vec<TimeRecord> {
        match project_id {
            None => self.records.clone(),
            Some(project_id) => {
                let mut records: Vec<TimeRecord> = self
                    .records
                    .iter()
                    .filter(|record| record.project_id == project_id)
                    .cloned()
                    .collect();
                records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
                records
            }
        }
    }

    pub fn get_record(&self, id: &str) -> Option<TimeRecord> {
        self.records.iter().find(|record| record.id == id).cloned()
    }

    pub async fn add_record(&mut self, record: NewRecord) -> StoreResult<TimeRecord> {
        let record = TimeRecord::from_new(record);
        record.validate()?;
        self.records.push(record.clone());
        self.persist_records().await?;
        Ok(record)
    }

    /// Merges `patch` into one record. Returns `false` for an unknown id.
    pub async fn update_record(&mut self, id: &str, patch: &RecordPatch) -> StoreResult<bool> {
        let Some(index) = self.record_index(id) else {
            return Ok(false);
        };
        let mut updated = self.records[index].clone();
        updated.apply(patch);
        updated.validate()?;
        self.records[index] = updated;
        self.persist_records().await?;
        Ok(true)
    }

    pub async fn delete_record(&mut self, id: &str) -> StoreResult<bool> {
        let Some(index) = self.record_index(id) else {
            return Ok(false);
        };
        self.records.remove(index);
        self.persist_records().await?;
        Ok(true)
    }

    /// Applies one patch to every listed record and writes once at the end.
    ///
    /// Every patched record is validated before any is changed. Returns the
    /// number of records updated; unknown ids are skipped.
    pub async fn batch_update_records(
        &mut self,
        ids: &[RecordId],
        patch: &RecordPatch,
    ) -> StoreResult<usize> {
        let mut staged = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(index) = self.record_index(id) {
                let mut updated = self.records[index].clone();
                updated.apply(patch);
                updated.validate()?;
                staged.push((index, updated));
            }
        }
        if staged.is_empty() {
            return Ok(0);
        }

        let updated = staged.len();
        for (index, record) in staged {
            self.records[index] = record;
        }
        self.persist_records().await?;
        debug!("event=records_batch_update module=store status=ok updated={updated}");
        Ok(updated)
    }

    // ----- timers ----------------------------------------------------------

    pub fn get_timer_state(&self) -> TimerState {
        self.timer.clone()
    }

    /// Start time of the project's running timer.
    pub fn get_active_timer(&self, project_id: &str) -> Option<Millis> {
        self.timer.started_at(project_id)
    }

    pub fn is_timer_running(&self, project_id: &str) -> bool {
        self.timer.is_running(project_id)
    }

    /// The project's open record, if any.
    pub fn get_active_record(&self, project_id: &str) -> Option<TimeRecord> {
        self.open_record_index(project_id)
            .map(|index| self.records[index].clone())
    }

    /// Elapsed milliseconds of the running timer, `0` when idle.
    pub fn get_timer_duration(&self, project_id: &str) -> Millis {
        self.timer
            .started_at(project_id)
            .map_or(0, |started| self.clock.now_ms().saturating_sub(started).max(0))
    }

    /// Starts tracking a project.
    ///
    /// No-op (returns `None`) when already running or the project is unknown.
    /// An open record left behind by an interrupted start is adopted rather
    /// than duplicated.
    pub async fn start_timer(&mut self, project_id: &str) -> StoreResult<Option<TimeRecord>> {
        if self.timer.is_running(project_id) {
            debug!("event=timer_start module=store status=skipped reason=already_running");
            return Ok(None);
        }
        let Some(hourly_rate) = self.forest.get(project_id).map(|p| p.hourly_rate) else {
            debug!("event=timer_start module=store status=skipped reason=unknown_project");
            return Ok(None);
        };

        let now = self.clock.now_ms();
        self.forest
            .modify(project_id, |project| project.last_used_at = now);
        self.persist_projects().await?;

        let (record, adopted) = match self.open_record_index(project_id) {
            Some(index) => (self.records[index].clone(), true),
            None => {
                let record = TimeRecord::from_new(NewRecord {
                    project_id: project_id.to_string(),
                    start_time: now,
                    end_time: None,
                    hourly_rate,
                    note: String::new(),
                });
                self.records.push(record.clone());
                self.persist_records().await?;
                (record, false)
            }
        };

        self.timer
            .active_timers
            .insert(project_id.to_string(), record.start_time);
        self.persist_timer().await?;
        info!(
            "event=timer_start module=store status=ok project_id={project_id} record_id={} adopted={adopted}",
            record.id
        );
        Ok(Some(record))
    }

    /// Stops tracking a project and returns the closed record.
    ///
    /// No-op when idle. A timer entry without an open record is just removed.
    pub async fn stop_timer(&mut self, project_id: &str) -> StoreResult<Option<TimeRecord>> {
        if !self.timer.is_running(project_id) {
            debug!("event=timer_stop module=store status=skipped reason=not_running");
            return Ok(None);
        }

        let now = self.clock.now_ms();
        let closed = match self.open_record_index(project_id) {
            Some(index) => {
                let record = &mut self.records[index];
                record.end_time = Some(now.max(record.start_time));
                let closed = record.clone();
                self.persist_records().await?;
                Some(closed)
            }
            None => {
                warn!(
                    "event=timer_stop module=store status=degraded reason=no_open_record project_id={project_id}"
                );
                None
            }
        };

        self.timer.active_timers.remove(project_id);
        self.persist_timer().await?;
        info!(
            "event=timer_stop module=store status=ok project_id={project_id} duration_ms={}",
            closed.as_ref().map_or(0, TimeRecord::duration)
        );
        Ok(closed)
    }

    // ----- aggregation -----------------------------------------------------

    /// Statistics over records of exactly this project.
    pub fn get_project_stats(&self, project_id: &str) -> ProjectStats {
        ProjectStats::from_records(
            self.records
                .iter()
                .filter(|record| record.project_id == project_id),
        )
    }

    /// Statistics over this project and every descendant.
    pub fn get_project_stats_with_children(&self, project_id: &str) -> ProjectStats {
        let subtree = self.forest.subtree_ids(project_id);
        ProjectStats::from_records(
            self.records
                .iter()
                .filter(|record| subtree.contains(&record.project_id)),
        )
    }

    /// Records of this project and every descendant, insertion order.
    pub fn get_project_records_with_children(&self, project_id: &str) -> Vec<TimeRecord> {
        let subtree: HashSet<ProjectId> = self.forest.subtree_ids(project_id);
        self.records
            .iter()
            .filter(|record| subtree.contains(&record.project_id))
            .cloned()
            .collect()
    }

    // ----- internals -------------------------------------------------------

    fn record_index(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    fn open_record_index(&self, project_id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.project_id == project_id && record.is_open())
    }

    async fn load_or_default<T: Default>(
        &self,
        key: &'static str,
        decode: impl FnOnce(&str) -> serde_json::Result<T>,
    ) -> T {
        let raw = match self.adapter.get_data(key).await {
            Ok(raw) => raw,
            Err(AdapterError::KeyNotFound(_)) => {
                debug!("event=blob_load module=store status=empty key={key}");
                return T::default();
            }
            Err(err) => {
                warn!(
                    "event=blob_load module=store status=fallback key={key} reason=read_failed error={err}"
                );
                return T::default();
            }
        };

        match decode(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=blob_load module=store status=fallback key={key} reason=decode_failed error={err}"
                );
                T::default()
            }
        }
    }

    async fn persist_projects(&self) -> StoreResult<()> {
        self.write_blob(PROJECTS_KEY, self.forest.all()).await
    }

    async fn persist_records(&self) -> StoreResult<()> {
        self.write_blob(RECORDS_KEY, &self.records).await
    }

    async fn persist_timer(&self) -> StoreResult<()> {
        self.write_blob(TIMER_KEY, &self.timer).await
    }

    async fn write_blob<T: Serialize + ?Sized>(
        &self,
        key: &'static str,
        value: &T,
    ) -> StoreResult<()> {
        let encoded = serde_json::to_string(value).map_err(StoreError::Encode)?;
        self.adapter
            .set_data(key, &encoded)
            .await
            .map_err(|err| {
                error!(
                    "event=blob_write module=store status=error key={key} error_code=write_failed error={err}"
                );
                StoreError::Adapter(err)
            })
    }
}
