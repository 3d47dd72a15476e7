mod common;

use std::sync::Arc;

use serde_json::json;

use orchestrion::observability::{EventType, MemoryObserver};
use orchestrion::state::{CheckpointStore, InMemoryCheckpointStore, State};

#[test]
fn test_set_leaves_original_untouched() {
    let s1 = State::new(None);
    let s2 = s1.set("user", json!("alice"));
    let s3 = s2.set("count", json!(42));

    assert!(s1.is_empty());
    assert_eq!(s2.len(), 1);
    assert_eq!(s3.get("user"), Some(&json!("alice")));
    assert_eq!(s3.get("count"), Some(&json!(42)));
}

#[test]
fn test_run_id_and_observer_propagate_through_derivations() {
    let observer = Arc::new(MemoryObserver::new());
    let s1 = State::new(Some(observer.clone()));
    let s2 = s1.set("a", json!(1)).merge(&State::new(None)).clone_state();

    assert_eq!(s2.run_id(), s1.run_id());
    observer.clear();
    // The derived state still emits through the original observer.
    let _ = s2.set("b", json!(2));
    assert_eq!(
        observer.event_types(),
        vec![EventType::StateClone, EventType::StateSet]
    );
}

#[test]
fn test_checkpoint_node_propagates_until_updated() {
    let s = State::new(None).with_checkpoint_node("n1");
    let derived = s.set("k", json!(1)).merge(&State::new(None));
    assert_eq!(derived.checkpoint_node(), "n1");

    let moved = derived.with_checkpoint_node("n2");
    assert_eq!(moved.checkpoint_node(), "n2");
    assert_eq!(derived.checkpoint_node(), "n1");
}

#[test]
fn test_merge_combines_only_data() {
    let observer = Arc::new(MemoryObserver::new());
    let s1 = State::new(Some(observer.clone())).set("shared", json!("mine"));
    let s2 = State::new(None)
        .set("shared", json!("theirs"))
        .set("extra", json!(true));

    observer.clear();
    let merged = s1.merge(&s2);

    assert_eq!(merged.get("shared"), Some(&json!("theirs")));
    assert_eq!(merged.get("extra"), Some(&json!(true)));
    assert_eq!(merged.run_id(), s1.run_id());
    assert_ne!(merged.run_id(), s2.run_id());

    let merge_events: Vec<_> = observer
        .snapshot()
        .into_iter()
        .filter(|e| e.event_type == EventType::StateMerge)
        .collect();
    assert_eq!(merge_events.len(), 1);
    assert_eq!(merge_events[0].data["keys"], json!(2));
}

#[tokio::test]
async fn test_save_then_load_round_trips_exactly() {
    let store = InMemoryCheckpointStore::new();
    let state = State::new(None)
        .set("x", json!({"nested": [1, 2, 3]}))
        .with_checkpoint_node("n3");

    state.checkpoint(&store).await.unwrap();
    let loaded = store.load(state.run_id()).await.unwrap();

    assert_eq!(loaded, state);
    assert_eq!(loaded.timestamp(), state.timestamp());
    assert_eq!(loaded.checkpoint_node(), "n3");
}
