use serde_json::json;
use std::sync::Arc;
use ticklog_core::{
    EntityStore, ManualClock, MemoryAdapter, NewRecord, Project, ProjectPatch, ProjectSort,
    StoreError, ValidationError, PROJECTS_KEY, RECORDS_KEY, TIMER_KEY,
};

type Store = EntityStore<Arc<MemoryAdapter>>;

async fn setup() -> (Arc<MemoryAdapter>, ManualClock, Store) {
    let adapter = Arc::new(MemoryAdapter::new());
    let clock = ManualClock::new(1_000);
    let mut store = EntityStore::with_clock(adapter.clone(), Arc::new(clock.clone()));
    store.init().await.unwrap();
    adapter.reset_write_counts();
    (adapter, clock, store)
}

async fn setup_with_projects(projects: serde_json::Value) -> Store {
    let adapter = Arc::new(MemoryAdapter::with_blobs([(PROJECTS_KEY, projects.to_string())]));
    let mut store = EntityStore::with_clock(adapter, Arc::new(ManualClock::new(1_000)));
    store.init().await.unwrap();
    store
}

fn ids(projects: &[Project]) -> Vec<String> {
    projects.iter().map(|project| project.id.clone()).collect()
}

fn sorted_ids(projects: &[Project]) -> Vec<String> {
    let mut ids = ids(projects);
    ids.sort();
    ids
}

async fn record(store: &mut Store, project_id: &str, start_time: i64) -> String {
    store
        .add_record(NewRecord {
            project_id: project_id.to_string(),
            start_time,
            end_time: Some(start_time + 60_000),
            hourly_rate: 10.0,
            note: String::new(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn add_project_stamps_fields_and_persists() {
    let (adapter, _clock, mut store) = setup().await;

    let project = store.add_project("Client", 75.5, None).await.unwrap();

    assert!(!project.id.is_empty());
    assert_eq!(project.created_at, 1_000);
    assert_eq!(project.last_used_at, 1_000);
    assert_eq!(project.sort_order, 0);
    assert_eq!(project.parent_id, None);
    assert_eq!(store.get_project(&project.id), Some(project.clone()));
    assert_eq!(adapter.write_count(PROJECTS_KEY), 1);
}

#[tokio::test]
async fn add_project_rejects_negative_rate_without_writing() {
    let (adapter, _clock, mut store) = setup().await;

    let err = store.add_project("Bad", -5.0, None).await.unwrap_err();

    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::InvalidHourlyRate(_))
    ));
    assert!(store.get_projects().is_empty());
    assert_eq!(adapter.write_count(PROJECTS_KEY), 0);
}

#[tokio::test]
async fn add_project_tolerates_dangling_parent() {
    let (_adapter, _clock, mut store) = setup().await;

    let orphan = store.add_project("Orphan", 1.0, Some("ghost")).await.unwrap();

    assert_eq!(orphan.parent_id.as_deref(), Some("ghost"));
    assert!(store.get_ancestors(&orphan.id).is_empty());
    assert_eq!(ids(&store.get_children(Some("ghost"))), vec![orphan.id]);
}

#[tokio::test]
async fn tree_queries_follow_parent_links() {
    let (_adapter, _clock, mut store) = setup().await;
    let root = store.add_project("Root", 10.0, None).await.unwrap();
    let a = store.add_project("A", 10.0, Some(root.id.as_str())).await.unwrap();
    let b = store.add_project("B", 10.0, Some(root.id.as_str())).await.unwrap();
    let a1 = store.add_project("A1", 10.0, Some(a.id.as_str())).await.unwrap();
    let other = store.add_project("Other", 10.0, None).await.unwrap();

    assert_eq!(ids(&store.get_children(None)), vec![root.id.clone(), other.id.clone()]);
    assert_eq!(ids(&store.get_children(Some(root.id.as_str()))), vec![a.id.clone(), b.id.clone()]);

    let mut expected = vec![a.id.clone(), b.id.clone(), a1.id.clone()];
    expected.sort();
    assert_eq!(sorted_ids(&store.get_all_descendants(&root.id)), expected);
    assert!(store.get_all_descendants(&other.id).is_empty());

    assert_eq!(ids(&store.get_ancestors(&a1.id)), vec![a.id.clone(), root.id.clone()]);
    assert!(store.get_ancestors(&root.id).is_empty());
}

#[tokio::test]
async fn ancestor_chain_length_equals_depth_and_ends_at_root() {
    let (_adapter, _clock, mut store) = setup().await;
    let mut parent: Option<String> = None;
    let mut chain = Vec::new();
    for depth in 0..6 {
        let project = store
            .add_project(format!("level-{depth}"), 1.0, parent.as_deref())
            .await
            .unwrap();
        parent = Some(project.id.clone());
        chain.push(project);
    }

    for (depth, project) in chain.iter().enumerate() {
        let ancestors = store.get_ancestors(&project.id);
        assert_eq!(ancestors.len(), depth);
        if let Some(last) = ancestors.last() {
            assert_eq!(last.parent_id, None);
        }
    }
}

#[tokio::test]
async fn cyclic_fixture_terminates_and_excludes_self() {
    let store = setup_with_projects(json!([
        {"id": "x", "name": "X", "hourlyRate": 1, "createdAt": 1, "parentId": "z"},
        {"id": "y", "name": "Y", "hourlyRate": 1, "createdAt": 1, "parentId": "x"},
        {"id": "z", "name": "Z", "hourlyRate": 1, "createdAt": 1, "parentId": "y"},
        {"id": "s", "name": "S", "hourlyRate": 1, "createdAt": 1, "parentId": "s"}
    ]))
    .await;

    let descendants = store.get_all_descendants("x");
    assert_eq!(sorted_ids(&descendants), vec!["y", "z"]);
    assert!(descendants.iter().all(|project| project.id != "x"));
    assert!(store.get_all_descendants("s").is_empty());
    assert_eq!(ids(&store.get_ancestors("x")), vec!["z", "y"]);
    assert!(store.get_ancestors("s").is_empty());
}

#[tokio::test]
async fn update_project_merges_only_given_fields() {
    let (adapter, clock, mut store) = setup().await;
    let project = store.add_project("Client", 50.0, None).await.unwrap();
    clock.advance(5_000);

    let applied = store
        .update_project(&project.id, &ProjectPatch::name("Renamed"))
        .await
        .unwrap();

    assert!(applied);
    let updated = store.get_project(&project.id).unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.hourly_rate, 50.0);
    assert_eq!(updated.created_at, project.created_at);
    assert_eq!(updated.id, project.id);
    assert_eq!(adapter.write_count(PROJECTS_KEY), 2);
}

#[tokio::test]
async fn update_unknown_project_is_silent_and_writes_nothing() {
    let (adapter, _clock, mut store) = setup().await;

    let applied = store
        .update_project("missing", &ProjectPatch::name("x"))
        .await
        .unwrap();

    assert!(!applied);
    assert_eq!(adapter.write_count(PROJECTS_KEY), 0);
}

#[tokio::test]
async fn reparenting_under_own_descendant_is_rejected() {
    let (_adapter, _clock, mut store) = setup().await;
    let a = store.add_project("A", 1.0, None).await.unwrap();
    let b = store.add_project("B", 1.0, Some(a.id.as_str())).await.unwrap();

    let err = store
        .update_project(&a.id, &ProjectPatch::parent(Some(b.id.clone())))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::CycleDetected { project_id, parent_id } if project_id == a.id && parent_id == b.id
    ));
    assert_eq!(store.get_project(&a.id).unwrap().parent_id, None);

    store
        .update_project(&b.id, &ProjectPatch::parent(None))
        .await
        .unwrap();
    assert_eq!(ids(&store.get_children(None)), vec![a.id.clone(), b.id.clone()]);
}

#[tokio::test]
async fn delete_project_cascades_exactly_over_subtree() {
    let (adapter, _clock, mut store) = setup().await;
    let root = store.add_project("Root", 10.0, None).await.unwrap();
    let child = store.add_project("Child", 10.0, Some(root.id.as_str())).await.unwrap();
    let grandchild = store
        .add_project("Grandchild", 10.0, Some(child.id.as_str()))
        .await
        .unwrap();
    let sibling = store.add_project("Sibling", 10.0, None).await.unwrap();
    record(&mut store, &root.id, 0).await;
    record(&mut store, &grandchild.id, 100).await;
    let kept_record = record(&mut store, &sibling.id, 200).await;

    let survivors_before = store.get_project(&sibling.id);
    let kept_before = store.get_records(Some(sibling.id.as_str()));
    adapter.reset_write_counts();

    let summary = store.delete_project(&child.id).await.unwrap();

    assert_eq!(summary.projects_removed, 2);
    assert_eq!(summary.records_removed, 1);
    assert_eq!(summary.timers_cleared, 0);
    assert_eq!(sorted_ids(&store.get_projects()), {
        let mut expected = vec![root.id.clone(), sibling.id.clone()];
        expected.sort();
        expected
    });
    assert_eq!(store.get_records(None).len(), 2);
    assert_eq!(store.get_project(&sibling.id), survivors_before);
    assert_eq!(store.get_records(Some(sibling.id.as_str())), kept_before);
    assert!(store.get_record(&kept_record).is_some());
    assert_eq!(adapter.write_count(PROJECTS_KEY), 1);
    assert_eq!(adapter.write_count(RECORDS_KEY), 1);
    assert_eq!(adapter.write_count(TIMER_KEY), 0);
}

#[tokio::test]
async fn delete_project_drops_running_timers_in_subtree() {
    let (adapter, _clock, mut store) = setup().await;
    let root = store.add_project("Root", 10.0, None).await.unwrap();
    let child = store.add_project("Child", 10.0, Some(root.id.as_str())).await.unwrap();
    store.start_timer(&child.id).await.unwrap();
    adapter.reset_write_counts();

    let summary = store.delete_project(&root.id).await.unwrap();

    assert_eq!(summary.projects_removed, 2);
    assert_eq!(summary.records_removed, 1);
    assert_eq!(summary.timers_cleared, 1);
    assert!(!store.is_timer_running(&child.id));
    assert_eq!(adapter.write_count(TIMER_KEY), 1);
}

#[tokio::test]
async fn delete_unknown_project_writes_nothing() {
    let (adapter, _clock, mut store) = setup().await;
    store.add_project("Keep", 1.0, None).await.unwrap();
    adapter.reset_write_counts();

    let summary = store.delete_project("missing").await.unwrap();

    assert_eq!(summary.projects_removed, 0);
    assert_eq!(store.get_projects().len(), 1);
    assert_eq!(adapter.write_count(PROJECTS_KEY), 0);
    assert_eq!(adapter.write_count(RECORDS_KEY), 0);
}

#[tokio::test]
async fn deleting_a_record_never_touches_projects() {
    let (adapter, _clock, mut store) = setup().await;
    let project = store.add_project("P", 1.0, None).await.unwrap();
    let record_id = record(&mut store, &project.id, 0).await;
    adapter.reset_write_counts();

    assert!(store.delete_record(&record_id).await.unwrap());

    assert!(store.get_project(&project.id).is_some());
    assert_eq!(adapter.write_count(PROJECTS_KEY), 0);
    assert_eq!(adapter.write_count(RECORDS_KEY), 1);
}

#[tokio::test]
async fn sorted_projects_support_manual_recent_and_name() {
    let (adapter, clock, mut store) = setup().await;
    let banana = store.add_project("banana", 1.0, None).await.unwrap();
    clock.advance(10);
    let apple = store.add_project("Apple", 1.0, None).await.unwrap();
    clock.advance(10);
    let cherry = store.add_project("cherry", 1.0, None).await.unwrap();
    store.add_project("nested", 1.0, Some(apple.id.as_str())).await.unwrap();
    adapter.reset_write_counts();

    store
        .update_project_order(&[cherry.id.clone(), banana.id.clone(), apple.id.clone()])
        .await
        .unwrap();
    assert_eq!(adapter.write_count(PROJECTS_KEY), 1);
    assert_eq!(
        ids(&store.get_sorted_projects(ProjectSort::Manual)),
        vec![cherry.id.clone(), banana.id.clone(), apple.id.clone()]
    );

    clock.advance(10);
    assert!(store.touch_project(&banana.id).await.unwrap());
    assert_eq!(
        ids(&store.get_sorted_projects(ProjectSort::Recent)),
        vec![banana.id.clone(), cherry.id.clone(), apple.id.clone()]
    );

    assert_eq!(
        ids(&store.get_sorted_projects(ProjectSort::Name)),
        vec![apple.id.clone(), banana.id.clone(), cherry.id.clone()]
    );
}

#[tokio::test]
async fn snapshots_do_not_alias_internal_state() {
    let (_adapter, _clock, mut store) = setup().await;
    let project = store.add_project("P", 1.0, None).await.unwrap();

    let mut snapshot = store.get_projects();
    snapshot[0].name = "mutated".to_string();
    snapshot.clear();

    assert_eq!(store.get_project(&project.id).unwrap().name, "P");
    assert_eq!(store.get_projects().len(), 1);
}
