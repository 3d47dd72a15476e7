mod common;

use common::*;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use orchestrion::config::GraphConfig;
use orchestrion::graph::{key_equals, ExecutionFailure, Graph};
use orchestrion::observability::EventType;
use orchestrion::state::State;

fn config(name: &str, observer: &str) -> GraphConfig {
    GraphConfig::new(name).with_observer(observer)
}

#[tokio::test]
async fn test_linear_three_node_graph() {
    let observer = register_capture("exec-linear-observer");
    let graph = Graph::new(config("linear", "exec-linear-observer"))
        .unwrap()
        .add_node("A", set_node("x", json!(1)))
        .unwrap()
        .add_node("B", set_node("y", json!(2)))
        .unwrap()
        .add_node("C", set_node("z", json!(3)))
        .unwrap()
        .add_edge("A", "B", None)
        .unwrap()
        .add_edge("B", "C", None)
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("C")
        .unwrap();

    let final_state = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap();

    assert_eq!(final_state.get("x"), Some(&json!(1)));
    assert_eq!(final_state.get("y"), Some(&json!(2)));
    assert_eq!(final_state.get("z"), Some(&json!(3)));
    assert_eq!(final_state.checkpoint_node(), "C");

    let events = observer.snapshot();
    assert_eq!(node_starts(&events), vec!["A", "B", "C"]);
    assert_eq!(count_of(&events, EventType::GraphStart), 1);
    assert_eq!(count_of(&events, EventType::GraphComplete), 1);
    assert_eq!(count_of(&events, EventType::NodeStart), 3);
    assert_eq!(count_of(&events, EventType::NodeComplete), 3);
    assert_eq!(count_of(&events, EventType::EdgeEvaluate), 2);
    assert_eq!(count_of(&events, EventType::EdgeTransition), 2);
    assert_eq!(count_of(&events, EventType::CycleDetected), 0);

    // Happens-before ordering: GraphStart first, GraphComplete last.
    assert_eq!(events.first().unwrap().event_type, EventType::GraphStart);
    assert_eq!(events.last().unwrap().event_type, EventType::GraphComplete);
}

fn two_way_graph(observer: &str) -> Graph {
    Graph::new(config("two-way", observer))
        .unwrap()
        .add_node("A", pass_node())
        .unwrap()
        .add_node("B", pass_node())
        .unwrap()
        .add_node("C", pass_node())
        .unwrap()
        .add_edge("A", "B", Some(key_equals("ok", json!(true))))
        .unwrap()
        .add_edge("A", "C", None)
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("B")
        .unwrap()
        .add_exit_point("C")
        .unwrap()
}

#[tokio::test]
async fn test_conditional_routing_takes_first_match() {
    let observer = register_capture("exec-cond-true-observer");
    let graph = two_way_graph("exec-cond-true-observer");
    let initial = State::new(None).set("ok", json!(true));
    graph
        .execute(CancellationToken::new(), initial)
        .await
        .unwrap();
    assert_eq!(node_starts(&observer.snapshot()), vec!["A", "B"]);
}

#[tokio::test]
async fn test_conditional_routing_falls_through_to_unconditional() {
    let observer = register_capture("exec-cond-false-observer");
    let graph = two_way_graph("exec-cond-false-observer");
    let initial = State::new(None).set("ok", json!(false));
    graph
        .execute(CancellationToken::new(), initial)
        .await
        .unwrap();

    let events = observer.snapshot();
    assert_eq!(node_starts(&events), vec!["A", "C"]);
    // Both edges were evaluated before the second one matched.
    assert_eq!(count_of(&events, EventType::EdgeEvaluate), 2);
    assert_eq!(count_of(&events, EventType::EdgeTransition), 1);
}

#[tokio::test]
async fn test_bounded_cycle_flags_every_revisit() {
    let observer = register_capture("exec-cycle-observer");
    let graph = Graph::new(config("cycle", "exec-cycle-observer"))
        .unwrap()
        .add_node("A", pass_node())
        .unwrap()
        .add_node("B", FlagAfterVisits::new("done", 3))
        .unwrap()
        .add_node("exit", pass_node())
        .unwrap()
        .add_edge("A", "B", None)
        .unwrap()
        .add_edge("B", "A", Some(key_equals("done", json!(false))))
        .unwrap()
        .add_edge("B", "exit", None)
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("exit")
        .unwrap();

    let initial = State::new(None).set("done", json!(false));
    let final_state = graph
        .execute(CancellationToken::new(), initial)
        .await
        .unwrap();

    assert_eq!(final_state.get("done"), Some(&json!(true)));

    let events = observer.snapshot();
    // A,B,A,B,A,B,exit: A and B revisited twice each.
    assert_eq!(
        node_starts(&events),
        vec!["A", "B", "A", "B", "A", "B", "exit"]
    );
    assert_eq!(count_of(&events, EventType::CycleDetected), 4);
}

#[tokio::test]
async fn test_iteration_cap_stops_runaway_cycle() {
    let _ = register_capture("exec-cap-observer");
    let graph = Graph::new(
        config("runaway", "exec-cap-observer").with_max_iterations(5),
    )
    .unwrap()
    .add_node("A", pass_node())
    .unwrap()
    .add_node("B", pass_node())
    .unwrap()
    .add_node("end", pass_node())
    .unwrap()
    .add_edge("A", "B", None)
    .unwrap()
    .add_edge("B", "A", None)
    .unwrap()
    .set_entry_point("A")
    .unwrap()
    .add_exit_point("end")
    .unwrap();

    let err = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.cause,
        ExecutionFailure::IterationCap { max: 5 }
    ));
    assert_eq!(err.path.len(), 5);
}

#[tokio::test]
async fn test_node_failure_preserves_context() {
    let graph = Graph::new(config("failing", "noop"))
        .unwrap()
        .add_node("A", set_node("x", json!(1)))
        .unwrap()
        .add_node("B", failing_node("downstream exploded"))
        .unwrap()
        .add_node("C", pass_node())
        .unwrap()
        .add_edge("A", "B", None)
        .unwrap()
        .add_edge("B", "C", None)
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("C")
        .unwrap();

    let err = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();

    assert_eq!(err.node, "B");
    assert_eq!(err.path, vec!["A", "B"]);
    // State at failure is the pre-failure snapshot: A's work is present.
    assert_eq!(err.state.get("x"), Some(&json!(1)));
    assert_eq!(err.state.checkpoint_node(), "A");
    assert!(matches!(err.cause, ExecutionFailure::Node(_)));
    let source = std::error::Error::source(&err).unwrap();
    assert!(source.to_string().contains("downstream exploded"));
}

#[tokio::test]
async fn test_dead_end_and_no_transition_failures() {
    let dead_end = Graph::new(config("dead-end", "noop"))
        .unwrap()
        .add_node("A", pass_node())
        .unwrap()
        .add_node("B", pass_node())
        .unwrap()
        .add_edge("B", "A", None)
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("B")
        .unwrap();
    let err = dead_end
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();
    assert!(matches!(err.cause, ExecutionFailure::NoOutgoingEdges { .. }));

    let no_transition = Graph::new(config("no-transition", "noop"))
        .unwrap()
        .add_node("A", pass_node())
        .unwrap()
        .add_node("B", pass_node())
        .unwrap()
        .add_edge("A", "B", Some(key_equals("never", json!(true))))
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("B")
        .unwrap();
    let err = no_transition
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();
    assert!(matches!(err.cause, ExecutionFailure::NoTransition { .. }));
}

#[tokio::test]
async fn test_cancellation_surfaces_as_cause() {
    let graph = Graph::new(config("cancelled", "noop"))
        .unwrap()
        .add_node("A", pass_node())
        .unwrap()
        .set_entry_point("A")
        .unwrap()
        .add_exit_point("A")
        .unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = graph.execute(token, State::new(None)).await.unwrap_err();
    assert!(matches!(err.cause, ExecutionFailure::Cancelled));
}

#[tokio::test]
async fn test_validation_failure_fails_fast() {
    let graph = Graph::new(config("invalid", "noop"))
        .unwrap()
        .add_node("A", pass_node())
        .unwrap()
        .set_entry_point("A")
        .unwrap();
    // No exit point configured.
    let err = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();
    assert!(matches!(err.cause, ExecutionFailure::Validation(_)));
    assert!(err.path.is_empty());
}
