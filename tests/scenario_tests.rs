//! End-to-end scheduler scenarios, driven entirely through the public
//! `execute_workflow` entry point so a workflow's DAGs, tasks and signal
//! traffic all run the way a worker process would run them.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::*;
use hiveflow::queue::{execute_workflow, JobOutcome};
use hiveflow::workflow::{Action, ChildSpec, DagBlueprint, Parameters, Schema, Task, Workflow};

fn single_dag_workflow(name: &str, schema: Schema, tasks: HashMap<String, Arc<dyn Task>>) -> Workflow {
    let blueprint = DagBlueprint::new("main", true, schema, tasks);
    Workflow::new(name, None, Parameters::default(), vec![blueprint])
}

#[tokio::test]
async fn linear_chain_runs_to_completion() {
    let (ctx, _events) = ctx();
    let mut schema = Schema::new();
    schema.insert("a".to_string(), ChildSpec::Single("b".to_string()));
    schema.insert("b".to_string(), ChildSpec::Single("c".to_string()));
    schema.insert("c".to_string(), ChildSpec::Null);

    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert("a".to_string(), square("a"));
    tasks.insert("b".to_string(), square("b"));
    tasks.insert("c".to_string(), square("c"));

    let workflow = single_dag_workflow("linear", schema, tasks);
    let outcome = execute_workflow(ctx, workflow, "wf-linear".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));
}

#[tokio::test]
async fn fan_out_fan_in_sums_every_lane_by_alias() {
    // start (seeds value=3) -> {left, right} (each squares it) -> join,
    // join reads each lane by its slot alias and sums them: 3*3 + 3*3 = 18.
    let (ctx, _events) = ctx();
    let mut schema = Schema::new();
    let mut branch = std::collections::BTreeMap::new();
    branch.insert("left".to_string(), Some("left".to_string()));
    branch.insert("right".to_string(), Some("right".to_string()));
    schema.insert("start".to_string(), ChildSpec::Map(branch));
    schema.insert("left".to_string(), ChildSpec::Single("join".to_string()));
    schema.insert("right".to_string(), ChildSpec::Single("join".to_string()));
    schema.insert("join".to_string(), ChildSpec::Null);

    let seed: Arc<dyn Task> = Arc::new(hiveflow::workflow::ClosureTask::new(
        "start",
        |data, _store, _signal, _ctx| {
            Box::pin(async move {
                data.default_dataset_mut().set("value", serde_json::Value::from(3));
                Ok(Some(Action::new(std::mem::take(data))))
            })
        },
    ));

    let observed_sum: Arc<std::sync::Mutex<Option<i64>>> = Arc::new(std::sync::Mutex::new(None));
    let observed = observed_sum.clone();
    let join: Arc<dyn Task> = Arc::new(hiveflow::workflow::ClosureTask::new(
        "join",
        move |data, _store, _signal, _ctx| {
            let observed = observed.clone();
            Box::pin(async move {
                let mut total = 0i64;
                for alias in ["left", "right"] {
                    if let Ok(dataset) = data.get_by_alias(alias) {
                        total += dataset.get("value").and_then(|v| v.as_i64()).unwrap_or(0);
                    }
                }
                *observed.lock().unwrap() = Some(total);
                Ok(Some(Action::new(std::mem::take(data))))
            })
        },
    ));

    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert("start".to_string(), seed);
    tasks.insert("left".to_string(), square("left"));
    tasks.insert("right".to_string(), square("right"));
    tasks.insert("join".to_string(), join);

    let workflow = single_dag_workflow("fan", schema, tasks);
    let outcome = execute_workflow(ctx, workflow, "wf-fan".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));
    assert_eq!(*observed_sum.lock().unwrap(), Some(18), "join must sum both squared lanes");
}

#[tokio::test]
async fn branch_with_limit_skips_the_unlisted_lane() {
    // branch restricts its successors to {keep}; drop never dispatches.
    let (ctx, _events) = ctx();
    let mut schema = Schema::new();
    schema.insert(
        "branch".to_string(),
        ChildSpec::List(vec!["keep".to_string(), "drop".to_string()]),
    );
    schema.insert("keep".to_string(), ChildSpec::Null);
    schema.insert("drop".to_string(), ChildSpec::Null);

    let keep_ran = Arc::new(std::sync::Mutex::new(false));
    let drop_ran = Arc::new(std::sync::Mutex::new(false));

    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert(
        "branch".to_string(),
        Arc::new(hiveflow::workflow::ClosureTask::new(
            "branch",
            |data, _store, _signal, _ctx| {
                Box::pin(async move {
                    Ok(Some(hiveflow::workflow::Action::with_limit(
                        std::mem::take(data),
                        vec!["keep".to_string()],
                    )))
                })
            },
        )),
    );
    tasks.insert("keep".to_string(), flagging_task("keep", keep_ran.clone()));
    tasks.insert("drop".to_string(), flagging_task("drop", drop_ran.clone()));

    let workflow = single_dag_workflow("branch-limit", schema, tasks);
    let outcome = execute_workflow(ctx, workflow, "wf-branch".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));
    assert!(*keep_ran.lock().unwrap(), "keep is in the limit set and must run");
    assert!(!*drop_ran.lock().unwrap(), "drop is outside the limit set and must never dispatch");
}

#[tokio::test]
async fn stop_task_with_skip_successors_completes_the_dag_without_error() {
    // p1 requests a skipping stop; its successor p3 must never dispatch,
    // but its sibling p2 still runs (not a successor of p1).
    let (ctx, _events) = ctx();
    let mut schema = Schema::new();
    schema.insert("p1".to_string(), ChildSpec::Single("p3".to_string()));
    schema.insert("p2".to_string(), ChildSpec::Null);
    schema.insert("p3".to_string(), ChildSpec::Null);

    let p2_ran = Arc::new(std::sync::Mutex::new(false));
    let p3_ran = Arc::new(std::sync::Mutex::new(false));

    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert("p1".to_string(), stop_task("p1", true));
    tasks.insert("p2".to_string(), flagging_task("p2", p2_ran.clone()));
    tasks.insert("p3".to_string(), flagging_task("p3", p3_ran.clone()));

    let workflow = single_dag_workflow("stop-skip", schema, tasks);
    let outcome = execute_workflow(ctx, workflow, "wf-stop".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));
    assert!(*p2_ran.lock().unwrap(), "p2 is not a successor of p1 and must still run");
    assert!(!*p3_ran.lock().unwrap(), "p3 is skipped by p1's stop and must never dispatch");
}

#[tokio::test]
async fn abort_workflow_request_is_observable_on_the_event_stream() {
    let (ctx, events) = ctx();
    let mut schema = Schema::new();
    schema.insert("boom".to_string(), ChildSpec::Null);
    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert("boom".to_string(), abort_task("boom", "operator requested stop"));

    let workflow = single_dag_workflow("abort", schema, tasks);
    let outcome = execute_workflow(ctx, workflow, "wf-abort".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));

    let mut saw_task_aborted = false;
    while let Ok(event) = events.try_recv() {
        if event.event_type == "task-lightflow-aborted" {
            saw_task_aborted = true;
        }
    }
    assert!(saw_task_aborted, "the aborting task must report an aborted lifecycle event");
}

#[tokio::test]
async fn failing_task_aborts_the_whole_workflow() {
    // boom fails; its successor `after` must never dispatch, and the
    // failure must be observable on the event stream as an aborted task.
    let (ctx, events) = ctx();
    let mut schema = Schema::new();
    schema.insert("boom".to_string(), ChildSpec::Single("after".to_string()));
    schema.insert("after".to_string(), ChildSpec::Null);

    let after_ran = Arc::new(std::sync::Mutex::new(false));

    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert("boom".to_string(), failing("boom", "connection refused"));
    tasks.insert("after".to_string(), flagging_task("after", after_ran.clone()));

    let workflow = single_dag_workflow("fail", schema, tasks);
    let outcome = execute_workflow(ctx, workflow, "wf-fail".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));
    assert!(!*after_ran.lock().unwrap(), "after is a successor of the failed task and must never dispatch");

    let mut saw_boom_aborted = false;
    while let Ok(event) = events.try_recv() {
        if event.name == "boom" && event.event_type == "task-lightflow-aborted" {
            saw_boom_aborted = true;
        }
    }
    assert!(saw_boom_aborted, "the failing task must report an aborted lifecycle event");
}

#[tokio::test]
async fn dynamic_sub_dag_runs_via_start_dag_and_join_dags() {
    let (ctx, _events) = ctx();

    let mut sub_schema = Schema::new();
    sub_schema.insert("only".to_string(), ChildSpec::Null);
    let mut sub_tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    sub_tasks.insert("only".to_string(), passthrough("only"));
    let sub = DagBlueprint::new("child", false, sub_schema, sub_tasks);

    let mut main_schema = Schema::new();
    main_schema.insert("launcher".to_string(), ChildSpec::Null);
    let mut main_tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    main_tasks.insert("launcher".to_string(), starter("launcher", "child"));
    let main = DagBlueprint::new("main", true, main_schema, main_tasks);

    let workflow = Workflow::new("dynamic", None, Parameters::default(), vec![main, sub]);
    let outcome = execute_workflow(ctx, workflow, "wf-dynamic".to_string(), HashMap::new(), false).await;
    assert!(matches!(outcome, JobOutcome::Success(_)));
}

#[tokio::test]
async fn missing_required_parameter_fails_fast() {
    use hiveflow::workflow::ParameterSpec;

    let (ctx, _events) = ctx();
    let mut schema = Schema::new();
    schema.insert("only".to_string(), ChildSpec::Null);
    let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
    tasks.insert("only".to_string(), passthrough("only"));
    let blueprint = DagBlueprint::new("main", true, schema, tasks);
    let params = Parameters::new(vec![ParameterSpec::required("region")]);
    let workflow = Workflow::new("needs-args", None, params, vec![blueprint]);

    let outcome = execute_workflow(ctx, workflow, "wf-missing-arg".to_string(), HashMap::new(), false).await;
    match outcome {
        JobOutcome::Failed(_) => {}
        other => panic!("expected a Failed outcome, got {other:?}"),
    }
}
