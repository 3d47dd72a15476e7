mod common;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use orchestrion::config::{
    ChainConfig, ConditionalConfig, GraphConfig, ParallelConfig,
};
use orchestrion::graph::{ExecutionFailure, Graph, NodeError};
use orchestrion::state::State;
use orchestrion::workflows::{ChainNode, ConditionalNode, ParallelNode, Routes};
use orchestrion::BoxError;

#[tokio::test]
async fn test_chain_node_folds_into_graph_state() {
    let chain = ChainNode::new(
        ChainConfig::default(),
        vec![1i64, 2, 3],
        |_state: &State| 0i64,
        |_ctx, item, acc| async move { Ok(acc + item) },
        |total, state| state.set("total", json!(total)),
    );

    let graph = Graph::new(GraphConfig::new("chain-host").with_observer("noop"))
        .unwrap()
        .add_node("sum", chain)
        .unwrap()
        .set_entry_point("sum")
        .unwrap()
        .add_exit_point("sum")
        .unwrap();

    let out = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap();
    assert_eq!(out.get("total"), Some(&json!(6)));
}

#[tokio::test]
async fn test_chain_node_over_state_threads_state_directly() {
    let chain = ChainNode::over_state(
        ChainConfig::default(),
        vec!["a", "b"],
        |_ctx, item, state: State| async move {
            Ok(state.set(item, json!(true)))
        },
    );

    let graph = Graph::new(GraphConfig::new("chain-state-host").with_observer("noop"))
        .unwrap()
        .add_node("mark", chain)
        .unwrap()
        .set_entry_point("mark")
        .unwrap()
        .add_exit_point("mark")
        .unwrap();

    let out = graph
        .execute(CancellationToken::new(), State::new(None).set("seed", json!(1)))
        .await
        .unwrap();
    assert_eq!(out.get("seed"), Some(&json!(1)));
    assert_eq!(out.get("a"), Some(&json!(true)));
    assert_eq!(out.get("b"), Some(&json!(true)));
}

#[tokio::test]
async fn test_chain_node_failure_wraps_structured_error() {
    let chain: ChainNode<i64, i64> = ChainNode::new(
        ChainConfig::default(),
        vec![1, 2],
        |_state: &State| 0i64,
        |_ctx, item, _acc| async move { Err::<i64, BoxError>(format!("step {item} broke").into()) },
        |total, state| state.set("total", json!(total)),
    );

    let graph = Graph::new(GraphConfig::new("chain-fail-host").with_observer("noop"))
        .unwrap()
        .add_node("sum", chain)
        .unwrap()
        .set_entry_point("sum")
        .unwrap()
        .add_exit_point("sum")
        .unwrap();

    let err = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();
    match &err.cause {
        ExecutionFailure::Node(NodeError::Chain { source }) => {
            assert!(source.to_string().contains("chain failed at step 0"));
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[tokio::test]
async fn test_parallel_node_aggregates_in_order() {
    let parallel = ParallelNode::new(
        ParallelConfig::default(),
        vec![3u64, 1, 2],
        |_ctx, item| async move { Ok(item * 2) },
        |results, state| state.set("doubled", json!(results)),
    );

    let graph = Graph::new(GraphConfig::new("parallel-host").with_observer("noop"))
        .unwrap()
        .add_node("fan-out", parallel)
        .unwrap()
        .set_entry_point("fan-out")
        .unwrap()
        .add_exit_point("fan-out")
        .unwrap();

    let out = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap();
    assert_eq!(out.get("doubled"), Some(&json!([6, 2, 4])));
}

#[tokio::test]
async fn test_parallel_node_failure_wraps_structured_error() {
    let parallel: ParallelNode<u64, u64> = ParallelNode::new(
        ParallelConfig::default(),
        vec![1, 2],
        |_ctx, _item| async move { Err::<u64, BoxError>("fan-out broke".into()) },
        |results, state| state.set("out", json!(results)),
    );

    let graph = Graph::new(GraphConfig::new("parallel-fail-host").with_observer("noop"))
        .unwrap()
        .add_node("fan-out", parallel)
        .unwrap()
        .set_entry_point("fan-out")
        .unwrap()
        .add_exit_point("fan-out")
        .unwrap();

    let err = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap_err();
    match &err.cause {
        ExecutionFailure::Node(NodeError::Parallel { source }) => {
            assert!(source.to_string().contains("parallel execution failed"));
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[tokio::test]
async fn test_conditional_node_routes_on_graph_state() {
    let conditional = ConditionalNode::new(
        ConditionalConfig::default(),
        |state: &State| {
            Ok(state
                .get("priority")
                .and_then(|v| v.as_str())
                .unwrap_or("normal")
                .to_string())
        },
        Routes::new()
            .route("high", |_ctx, state: State| async move {
                Ok(state.set("queue", json!("expedited")))
            })
            .default_route(|_ctx, state: State| async move {
                Ok(state.set("queue", json!("standard")))
            }),
    );

    let graph = Graph::new(GraphConfig::new("conditional-host").with_observer("noop"))
        .unwrap()
        .add_node("triage", conditional)
        .unwrap()
        .set_entry_point("triage")
        .unwrap()
        .add_exit_point("triage")
        .unwrap();

    let out = graph
        .execute(
            CancellationToken::new(),
            State::new(None).set("priority", json!("high")),
        )
        .await
        .unwrap();
    assert_eq!(out.get("queue"), Some(&json!("expedited")));
}

#[tokio::test]
async fn test_patterns_compose_in_one_topology() {
    let sum = ChainNode::new(
        ChainConfig::default(),
        vec![10i64, 20],
        |_state: &State| 0i64,
        |_ctx, item, acc| async move { Ok(acc + item) },
        |total, state| state.set("total", json!(total)),
    );
    let triage = ConditionalNode::new(
        ConditionalConfig::default(),
        |state: &State| {
            let total = state.get("total").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(if total > 25 { "large" } else { "small" }.to_string())
        },
        Routes::new()
            .route("large", |_ctx, state: State| async move {
                Ok(state.set("bucket", json!("large")))
            })
            .route("small", |_ctx, state: State| async move {
                Ok(state.set("bucket", json!("small")))
            }),
    );

    let graph = Graph::new(GraphConfig::new("composed").with_observer("noop"))
        .unwrap()
        .add_node("sum", sum)
        .unwrap()
        .add_node("triage", triage)
        .unwrap()
        .add_edge("sum", "triage", None)
        .unwrap()
        .set_entry_point("sum")
        .unwrap()
        .add_exit_point("triage")
        .unwrap();

    let out = graph
        .execute(CancellationToken::new(), State::new(None))
        .await
        .unwrap();
    assert_eq!(out.get("total"), Some(&json!(30)));
    assert_eq!(out.get("bucket"), Some(&json!("large")));
}
