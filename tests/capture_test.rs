//! Build-mode capture of nested node calls

mod common;

use capflow::{
    args, build_graph, build_graph_async, capture, pipeline, CapflowError, CapturedNode, Field,
    FieldType, Kwargs, Mode, NodeKind, Sink,
};
use common::builders::{LeafBuilder, ScalingGraph};
use common::{assert_config, CallLog};
use serde_json::json;

#[test]
fn test_pipeline_captures_children_in_call_order() {
    let graph = ScalingGraph::new();
    let root = build_graph(&graph.pair, args![4]).unwrap();

    assert_config(&root, "P", json!({"n": 4}));
    assert_eq!(root.children().len(), 2);
    assert_config(&root.children()[0], "L", json!({"n": 8}));
    assert_config(&root.children()[1], "L", json!({"n": 12}));
    assert!(root.children().iter().all(|c| c.children().is_empty()));

    // the pipeline body ran, the leaves did not
    assert_eq!(graph.log.entries(), ["P(4)"]);
}

#[test]
fn test_nested_pipelines() {
    let graph = ScalingGraph::new();
    let root = build_graph(&graph.outer, args![4]).unwrap();

    assert_config(&root, "M", json!({"n": 4}));
    assert_eq!(root.children().len(), 1);
    let pair = &root.children()[0];
    assert_config(pair, "P", json!({"n": 40}));
    assert_eq!(pair.children().len(), 2);
    assert_config(&pair.children()[0], "L", json!({"n": 80}));
    assert_config(&pair.children()[1], "L", json!({"n": 120}));
    assert_eq!(root.count(), 4);
}

#[test]
fn test_run_mode_executes_everything() {
    let graph = ScalingGraph::new();
    graph.outer.call(args![1]).unwrap();
    assert_eq!(graph.log.entries(), ["P(10)", "L(20)", "L(30)"]);
}

#[test]
fn test_failing_body_leaves_no_partial_record() {
    let log = CallLog::new();
    // P(4) asks for L(8) then L(12); L(12) raises, but only while running
    let failing = {
        let leaf = LeafBuilder::new("L", &log).build();
        pipeline("P")
            .param(Field::new("n", FieldType::Int))
            .body(move |kw: &Kwargs| {
                let n = kw.get::<i64>("n")?;
                leaf.call(args![n * 2])?;
                anyhow::bail!("P gave up after the first child")
            })
            .unwrap()
    };

    let (result, roots) = capture(|| failing.call(args![4]));
    match result {
        Err(CapflowError::Body { node, source }) => {
            assert_eq!(node, "P");
            assert!(source.to_string().contains("gave up"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(roots.is_empty(), "failed pipeline must not commit: {:?}", roots);
}

#[test]
fn test_failure_in_nested_pipeline_propagates_unchanged() {
    let log = CallLog::new();
    let graph = ScalingGraph::with_leaf(log.clone(), LeafBuilder::new("L", &log).build());
    let broken_outer = {
        let pair = graph.pair.clone();
        pipeline("M")
            .param(Field::new("n", FieldType::Int))
            .body(move |kw: &Kwargs| {
                pair.call(args![kw.get::<i64>("n")?])?;
                // an invalid argument, reported against P
                pair.call(args![; m = 1])?;
                Ok(())
            })
            .unwrap()
    };
    let err = build_graph(&broken_outer, args![1]).unwrap_err();
    assert_eq!(err.as_argument().map(|e| e.subject()), Some("m"));
}

#[test]
fn test_invalid_arguments_fail_before_capture() {
    let graph = ScalingGraph::new();
    let (result, roots) = capture(|| graph.pair.call(args![; n = "four"]));
    let err = result.unwrap_err();
    assert_eq!(err.as_argument().map(|e| e.subject()), Some("n"));
    assert!(roots.is_empty());
}

#[test]
fn test_sibling_roots_in_one_capture() {
    let graph = ScalingGraph::new();
    let (result, roots) = capture(|| -> capflow::Result<()> {
        graph.pair.call(args![1])?;
        graph.leaf.call(args![5])?;
        Ok(())
    });
    result.unwrap();
    assert_eq!(roots.len(), 2);
    assert_config(&roots[0], "P", json!({"n": 1}));
    assert_config(&roots[1], "L", json!({"n": 5}));
    // nothing escapes the capture
    assert_eq!(Mode::current(), Mode::Run);
    assert!(Sink::active().is_none());
}

#[test]
fn test_record_serialization() {
    let graph = ScalingGraph::new();
    let record = build_graph(&graph.outer, args![4]).unwrap().to_record();
    let text = record.to_json(true).unwrap();
    let parsed = CapturedNode::from_json(&text).unwrap();
    assert_eq!(parsed, record);
    assert_eq!(parsed.kind, NodeKind::Pipeline);
    let leaves: Vec<_> = parsed
        .walk()
        .into_iter()
        .filter(|n| n.kind == NodeKind::Component)
        .map(|n| n.kwargs["n"].clone())
        .collect();
    assert_eq!(leaves, [json!(80), json!(120)]);
}

#[test]
fn test_kwargs_are_text_encoded() {
    let log = CallLog::new();
    let node = capflow::component("encode")
        .param(Field::new("items", FieldType::list(FieldType::Int)))
        .param(Field::new("blob", FieldType::Bytes))
        .param(Field::new("seed", FieldType::optional(FieldType::Int)).with_default(capflow::Value::Null))
        .body({
            let log = log.clone();
            move |_: &Kwargs| {
                log.push("ran");
                Ok(())
            }
        })
        .unwrap();
    let root = build_graph(
        &node,
        args![vec![1, 2, 3], capflow::Value::bytes(b"hi".to_vec())],
    )
    .unwrap();
    assert_config(
        &root,
        "encode",
        json!({"items": "[1,2,3]", "blob": "aGk=", "seed": null}),
    );
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_async_pipelines_capture_across_suspension() {
    let graph = ScalingGraph::new_async();
    let root = build_graph_async(&graph.outer, args![4]).await.unwrap();
    let pair = &root.children()[0];
    assert_config(pair, "P", json!({"n": 40}));
    assert_config(&pair.children()[0], "L", json!({"n": 80}));
    assert_config(&pair.children()[1], "L", json!({"n": 120}));
    assert_eq!(graph.log.entries(), ["P(40)"]);
}

#[tokio::test]
async fn test_interleaved_builds_stay_separate() {
    let first = ScalingGraph::new_async();
    let second = ScalingGraph::new_async();
    let (a, b) = tokio::join!(
        build_graph_async(&first.pair, args![1]),
        build_graph_async(&second.outer, args![2]),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.children().len(), 2);
    assert_config(&a.children()[0], "L", json!({"n": 2}));
    assert_config(&a.children()[1], "L", json!({"n": 3}));

    assert_eq!(b.children().len(), 1);
    let pair = &b.children()[0];
    assert_config(&pair.children()[0], "L", json!({"n": 40}));
    assert_config(&pair.children()[1], "L", json!({"n": 60}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_run_mode_on_worker_threads() {
    let graph = ScalingGraph::new_async();
    let outer = graph.outer.clone();
    tokio::spawn(async move { outer.call_async(args![1]).await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(graph.log.entries(), ["P(10)", "L(20)", "L(30)"]);
}

#[test]
fn test_thread_spawned_while_building_runs_detached() {
    let log = CallLog::new();
    let leaf = LeafBuilder::new("L", &log).build();
    let spawner = {
        let leaf = leaf.clone();
        pipeline("S")
            .param(Field::new("n", FieldType::Int))
            .body(move |kw: &Kwargs| {
                let n = kw.get::<i64>("n")?;
                let leaf = leaf.clone();
                let detached = std::thread::spawn(move || {
                    let detached = Sink::is_detached();
                    leaf.call(args![n]).map(|()| detached)
                })
                .join()
                .unwrap()?;
                assert!(detached);
                Ok(())
            })
            .unwrap()
    };

    let root = build_graph(&spawner, args![3]).unwrap();
    // the leaf ran on the thread instead of being captured
    assert!(root.children().is_empty());
    assert_eq!(log.entries(), ["L(3)"]);
}
