//! Project arena with a derived parent → children index.
//!
//! # Invariants
//! - `projects` keeps insertion order; every listing preserves it.
//! - `by_id` and `children` are rebuilt after any structural change.
//! - Traversals never revisit a project, so malformed cyclic data terminates.

use crate::model::project::{Project, ProjectId};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub(crate) struct ProjectForest {
    projects: Vec<Project>,
    by_id: HashMap<ProjectId, usize>,
    children: HashMap<Option<ProjectId>, Vec<usize>>,
}

impl ProjectForest {
    pub(crate) fn from_projects(projects: Vec<Project>) -> Self {
        let mut forest = Self {
            projects,
            ..Self::default()
        };
        forest.reindex();
        forest
    }

    pub(crate) fn all(&self) -> &[Project] {
        &self.projects
    }

    pub(crate) fn len(&self) -> usize {
        self.projects.len()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Project> {
        self.by_id.get(id).map(|&index| &self.projects[index])
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub(crate) fn push(&mut self, project: Project) {
        let index = self.projects.len();
        self.by_id.entry(project.id.clone()).or_insert(index);
        self.children
            .entry(project.parent_id.clone())
            .or_default()
            .push(index);
        self.projects.push(project);
    }

    /// Mutates one project in place and refreshes the index.
    pub(crate) fn modify(&mut self, id: &str, change: impl FnOnce(&mut Project)) -> bool {
        let Some(&index) = self.by_id.get(id) else {
            return false;
        };
        let parent_before = self.projects[index].parent_id.clone();
        change(&mut self.projects[index]);
        if self.projects[index].parent_id != parent_before {
            self.reindex();
        }
        true
    }

    /// Removes every project whose id is in `ids`. Returns the removed count.
    pub(crate) fn remove_all(&mut self, ids: &HashSet<ProjectId>) -> usize {
        let before = self.projects.len();
        self.projects.retain(|project| !ids.contains(&project.id));
        let removed = before - self.projects.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    pub(crate) fn children(&self, parent_id: Option<&str>) -> Vec<&Project> {
        self.children
            .get(&parent_id.map(str::to_string))
            .map(|indexes| indexes.iter().map(|&index| &self.projects[index]).collect())
            .unwrap_or_default()
    }

    /// Every project reachable below `id`, level by level. Never contains `id`.
    pub(crate) fn descendants(&self, id: &str) -> Vec<&Project> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.children(Some(current)) {
                if visited.insert(child.id.as_str()) {
                    found.push(child);
                    queue.push_back(child.id.as_str());
                }
            }
        }
        found
    }

    /// Parent chain from immediate parent to root.
    ///
    /// Stops at the first unresolvable parent (top level or dangling) and at
    /// the first repeated project if the data is cyclic.
    pub(crate) fn ancestors(&self, id: &str) -> Vec<&Project> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);
        let mut chain = Vec::new();
        let mut cursor = self.get(id).and_then(|project| project.parent_id.as_deref());

        while let Some(parent_id) = cursor {
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            if !visited.insert(parent.id.as_str()) {
                break;
            }
            chain.push(parent);
            cursor = parent.parent_id.as_deref();
        }
        chain
    }

    /// `{id}` plus all descendant ids.
    pub(crate) fn subtree_ids(&self, id: &str) -> HashSet<ProjectId> {
        let mut ids: HashSet<ProjectId> = self
            .descendants(id)
            .into_iter()
            .map(|project| project.id.clone())
            .collect();
        ids.insert(id.to_string());
        ids
    }

    /// Whether re-parenting `id` under `candidate_parent` would close a loop.
    pub(crate) fn would_create_cycle(&self, id: &str, candidate_parent: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut cursor = Some(candidate_parent);
        while let Some(current) = cursor {
            if current == id || !visited.insert(current) {
                return true;
            }
            cursor = self
                .get(current)
                .and_then(|project| project.parent_id.as_deref());
        }
        false
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.children.clear();
        for (index, project) in self.projects.iter().enumerate() {
            self.by_id.entry(project.id.clone()).or_insert(index);
            self.children
                .entry(project.parent_id.clone())
                .or_default()
                .push(index);
        }
    }
}
