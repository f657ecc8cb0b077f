// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Executable and task lookup in local and remote mode.

mod common;

use std::sync::Arc;

use common::{MockRuntime, ScriptedProcessor, context, seed};
use digitalhub_sdk::{
    EntityType, Run, RunKind, SdkError, TaskReference, TaskSpec, resolve_executable, resolve_task,
};
use serde_json::json;

#[test]
fn test_reference_extracts_executable_name_and_id() {
    let reference = TaskReference::parse("job://proj/job/myfunc:abc123").unwrap();
    assert_eq!(reference.exec_name, "myfunc");
    assert_eq!(reference.exec_id, "abc123");
}

#[tokio::test]
async fn test_local_lookup_without_matching_task_is_not_found() {
    let processor = Arc::new(ScriptedProcessor::new());
    let runtime = MockRuntime::completing();
    let ctx = context(processor, true, &runtime);
    let (function, _) = seed(&ctx, "dbt", "dbt+transform").await;

    let reference = TaskReference::new("dbt+transform", "demo", "transform", "not-a-version");
    let err = resolve_task(&ctx, "demo", RunKind::DbtRun, &reference)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::NotFound {
            entity_type: EntityType::Task,
            ..
        }
    ));
    assert!(err.to_string().contains("task not found"));

    let reference = TaskReference::new("dbt+transform", "demo", "transform", &function.id);
    let task = resolve_task(&ctx, "demo", RunKind::DbtRun, &reference)
        .await
        .unwrap();
    assert_eq!(task.spec.function, function.reference());
}

#[tokio::test]
async fn test_local_lookup_matches_task_kind() {
    let processor = Arc::new(ScriptedProcessor::new());
    let runtime = MockRuntime::completing();
    let ctx = context(processor, true, &runtime);
    let (function, serve) = seed(&ctx, "container", "container+serve").await;
    let job = ctx
        .new_task(&function, "container+job", TaskSpec::default())
        .await
        .unwrap();

    for task in [&serve, &job] {
        let found = resolve_task(&ctx, "demo", RunKind::ContainerRun, &task.reference().unwrap())
            .await
            .unwrap();
        assert_eq!(found.id, task.id);
    }
}

#[tokio::test]
async fn test_remote_lookup_with_empty_listing_is_not_found() {
    let processor = Arc::new(ScriptedProcessor::new());
    let runtime = MockRuntime::completing();
    let ctx = context(processor.clone(), false, &runtime);
    let (_, task) = seed(&ctx, "container", "container+job").await;
    processor.set_task_listing(Vec::new());

    let err = resolve_task(&ctx, "demo", RunKind::ContainerRun, &task.reference().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::NotFound {
            entity_type: EntityType::Task,
            ..
        }
    ));
}

#[tokio::test]
async fn test_remote_lookup_takes_first_result() {
    let processor = Arc::new(ScriptedProcessor::new());
    let runtime = MockRuntime::completing();
    let ctx = context(processor.clone(), false, &runtime);
    let (_, task) = seed(&ctx, "container", "container+job").await;
    let mut first = task.to_value().unwrap();
    first["id"] = json!("first");
    processor.set_task_listing(vec![first, task.to_value().unwrap()]);

    let found = resolve_task(&ctx, "demo", RunKind::ContainerRun, &task.reference().unwrap())
        .await
        .unwrap();
    assert_eq!(found.id, "first");
}

#[tokio::test]
async fn test_missing_executable_is_not_found() {
    let processor = Arc::new(ScriptedProcessor::new());
    let runtime = MockRuntime::completing();
    let ctx = context(processor, false, &runtime);

    let reference = TaskReference::parse("kfp+pipeline://demo/pipeline:w404").unwrap();
    let err = resolve_executable(&ctx, "demo", RunKind::KfpRun, &reference)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::NotFound {
            entity_type: EntityType::Workflow,
            ..
        }
    ));
}

#[tokio::test]
async fn test_build_surfaces_missing_task() {
    let processor = Arc::new(ScriptedProcessor::new());
    let runtime = MockRuntime::completing();
    let ctx = context(processor, true, &runtime);
    let (function, task) = seed(&ctx, "dbt", "dbt+transform").await;
    let mut run = ctx
        .new_run(&task, "dbt+run", serde_json::Map::new())
        .await
        .unwrap();
    ctx.processor()
        .delete_entity("demo", EntityType::Task, &task.id)
        .await
        .unwrap();

    let err = run.build().await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::NotFound {
            entity_type: EntityType::Task,
            ..
        }
    ));
    assert!(err.to_string().contains(&function.reference()));

    let reloaded = Run::from_value(&ctx, run.to_value().unwrap()).unwrap();
    assert_eq!(reloaded.state(), run.state());
}
