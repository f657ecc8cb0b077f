// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run spec composition shared by every engine.
//!
//! A built run spec is the current run spec plus two sections:
//! - `{function|workflow}_spec`: the executable spec
//! - `{action}_spec`: the task spec without its `function` reference, where
//!   `action` is the task kind suffix (`job`, `serve`, `transform`, ...)

use digitalhub_sdk::{RuntimeError, RuntimeResult};
use serde_json::{Map, Value};

/// Object field of a mapping, or an empty one.
pub(crate) fn section(value: &Value, key: &str) -> Map<String, Value> {
    value
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// String field of a mapping, if non-empty.
pub(crate) fn string_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Suffix of the task kind: `container+job` gives `job`.
pub(crate) fn task_action(task: &Value) -> RuntimeResult<&str> {
    let kind = task
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| RuntimeError::InvalidSpec("task has no kind".to_string()))?;
    kind.split_once('+')
        .map(|(_, action)| action)
        .filter(|action| !action.is_empty())
        .ok_or_else(|| RuntimeError::InvalidSpec(format!("invalid task kind: {}", kind)))
}

/// Compose the run spec from the executable, the task and the run.
pub(crate) fn compose_spec(
    executable: &Value,
    task: &Value,
    run: &Value,
    executable_key: &str,
) -> RuntimeResult<Map<String, Value>> {
    let mut spec = run
        .get("spec")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| RuntimeError::Build("run has no spec".to_string()))?;

    let mut task_spec = section(task, "spec");
    task_spec.remove("function");
    let action = task_action(task)?;

    spec.insert(
        executable_key.to_string(),
        Value::Object(section(executable, "spec")),
    );
    spec.insert(format!("{}_spec", action), Value::Object(task_spec));
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compose_spec_adds_sections() {
        let spec = compose_spec(
            &json!({"spec": {"image": "python:3.12"}}),
            &json!({"kind": "container+job", "spec": {"function": "container://p/f:1", "backoff_limit": 3}}),
            &json!({"spec": {"task": "container+job://p/f:1", "local_execution": false}}),
            "function_spec",
        )
        .unwrap();

        assert_eq!(spec["task"], "container+job://p/f:1");
        assert_eq!(spec["function_spec"], json!({"image": "python:3.12"}));
        assert_eq!(spec["job_spec"], json!({"backoff_limit": 3}));
    }

    #[test]
    fn test_compose_spec_requires_run_spec() {
        let err = compose_spec(
            &json!({}),
            &json!({"kind": "dbt+transform"}),
            &json!({}),
            "function_spec",
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Build(_)));
    }

    #[test]
    fn test_task_action() {
        assert_eq!(task_action(&json!({"kind": "kfp+pipeline"})).unwrap(), "pipeline");
        assert!(task_action(&json!({"kind": "kfp"})).is_err());
        assert!(task_action(&json!({})).is_err());
    }
}
