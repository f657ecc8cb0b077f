// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory processor for backend-less operation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{ListParams, Processor};
use crate::error::{Result, SdkError};
use crate::kind::EntityType;

type Store = HashMap<(String, EntityType), Vec<Value>>;

/// Processor keeping every entity in process memory.
///
/// Entities are kept in insertion order per `(project, entity type)`, so the
/// latest version of a named entity is the last one stored. There is no remote
/// engine behind this processor: logs, stop and resume are unsupported.
#[derive(Debug, Default)]
pub struct LocalProcessor {
    store: RwLock<Store>,
}

fn entity_id(entity: &Value) -> Option<&str> {
    entity.get("id").and_then(Value::as_str)
}

fn entity_name(entity: &Value) -> Option<&str> {
    entity
        .get("name")
        .or_else(|| entity.pointer("/metadata/name"))
        .and_then(Value::as_str)
}

/// Listing filters understood by the in-memory store.
const FILTER_KEYS: [&str; 7] = ["function", "name", "state", "kind", "id", "project", "user"];

/// Whether an entity satisfies one listing filter.
///
/// `function` matches the task's executable reference and `state` the run
/// state; the other keys are top-level fields.
fn matches_filter(entity: &Value, key: &str, expected: &str) -> bool {
    let actual = match key {
        "function" => entity.pointer("/spec/function"),
        "state" => entity.pointer("/status/state"),
        "name" => return entity_name(entity) == Some(expected),
        other => entity.get(other),
    };
    actual.and_then(Value::as_str) == Some(expected)
}

impl LocalProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities of a type.
    pub async fn count(&self, project: &str, entity_type: EntityType) -> usize {
        let store = self.store.read().await;
        store
            .get(&(project.to_string(), entity_type))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Processor for LocalProcessor {
    async fn create_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        entity: &Value,
    ) -> Result<Value> {
        let mut entity = entity.clone();
        let object = entity.as_object_mut().ok_or_else(|| {
            SdkError::InvalidInput(format!("{} must be a mapping", entity_type))
        })?;
        if !matches!(object.get("id"), Some(Value::String(_))) {
            object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut store = self.store.write().await;
        let entities = store.entry((project.to_string(), entity_type)).or_default();
        let id = entity_id(&entity).unwrap_or_default();
        if entities.iter().any(|e| entity_id(e) == Some(id)) {
            return Err(SdkError::InvalidInput(format!(
                "{} {} already exists",
                entity_type, id
            )));
        }
        debug!(project, entity_type = %entity_type, id, "Stored entity");
        entities.push(entity.clone());
        Ok(entity)
    }

    async fn read_context_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        name: &str,
        entity_id: Option<&str>,
    ) -> Result<Value> {
        let store = self.store.read().await;
        let key = match entity_id {
            Some(id) => format!("{}:{}", name, id),
            None => name.to_string(),
        };
        store
            .get(&(project.to_string(), entity_type))
            .and_then(|entities| {
                entities.iter().rev().find(|e| {
                    entity_name(e) == Some(name)
                        && entity_id.is_none_or(|id| self::entity_id(e) == Some(id))
                })
            })
            .cloned()
            .ok_or_else(|| SdkError::not_found(entity_type, key))
    }

    async fn read_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Value> {
        let store = self.store.read().await;
        store
            .get(&(project.to_string(), entity_type))
            .and_then(|entities| entities.iter().find(|e| entity_id(e) == Some(id)))
            .cloned()
            .ok_or_else(|| SdkError::not_found(entity_type, id))
    }

    async fn update_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
        entity: &Value,
    ) -> Result<Value> {
        let mut entity = entity.clone();
        if let Some(object) = entity.as_object_mut() {
            object.insert("id".to_string(), Value::String(id.to_string()));
        }

        let mut store = self.store.write().await;
        let slot = store
            .get_mut(&(project.to_string(), entity_type))
            .and_then(|entities| entities.iter_mut().find(|e| entity_id(e) == Some(id)))
            .ok_or_else(|| SdkError::not_found(entity_type, id))?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn delete_entity(&self, project: &str, entity_type: EntityType, id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let entities = store
            .get_mut(&(project.to_string(), entity_type))
            .ok_or_else(|| SdkError::not_found(entity_type, id))?;
        let before = entities.len();
        entities.retain(|e| entity_id(e) != Some(id));
        if entities.len() == before {
            return Err(SdkError::not_found(entity_type, id));
        }
        Ok(())
    }

    async fn list_context_entities(
        &self,
        project: &str,
        entity_type: EntityType,
        params: &ListParams,
    ) -> Result<Vec<Value>> {
        if let Some((key, _)) = params.iter().find(|(k, _)| !FILTER_KEYS.contains(k)) {
            return Err(SdkError::InvalidInput(format!(
                "unsupported {} filter: {}",
                entity_type, key
            )));
        }

        let store = self.store.read().await;
        Ok(store
            .get(&(project.to_string(), entity_type))
            .map(|entities| {
                entities
                    .iter()
                    .filter(|e| params.iter().all(|(k, v)| matches_filter(e, k, v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_run_logs(
        &self,
        _project: &str,
        _entity_type: EntityType,
        id: &str,
    ) -> Result<Value> {
        Err(SdkError::Unsupported(format!(
            "logs of {} are not available without a backend",
            id
        )))
    }

    async fn stop_run(&self, _project: &str, _entity_type: EntityType, id: &str) -> Result<Value> {
        Err(SdkError::Unsupported(format!(
            "cannot stop {} without a backend",
            id
        )))
    }

    async fn resume_run(&self, _project: &str, _entity_type: EntityType, id: &str) -> Result<Value> {
        Err(SdkError::Unsupported(format!(
            "cannot resume {} without a backend",
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_assigns_id() {
        let processor = LocalProcessor::new();
        let stored = processor
            .create_entity("p", EntityType::Run, &json!({"kind": "dbt+run"}))
            .await
            .unwrap();
        let id = stored["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(processor.count("p", EntityType::Run).await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let processor = LocalProcessor::new();
        let entity = json!({"id": "r1"});
        processor
            .create_entity("p", EntityType::Run, &entity)
            .await
            .unwrap();
        let err = processor
            .create_entity("p", EntityType::Run, &entity)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_read_context_entity_latest_and_by_id() {
        let processor = LocalProcessor::new();
        for id in ["v1", "v2"] {
            processor
                .create_entity("p", EntityType::Function, &json!({"id": id, "name": "f"}))
                .await
                .unwrap();
        }
        let latest = processor
            .read_context_entity("p", EntityType::Function, "f", None)
            .await
            .unwrap();
        assert_eq!(latest["id"], "v2");
        let pinned = processor
            .read_context_entity("p", EntityType::Function, "f", Some("v1"))
            .await
            .unwrap();
        assert_eq!(pinned["id"], "v1");
        let err = processor
            .read_context_entity("p", EntityType::Function, "f", Some("v3"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::NotFound {
                entity_type: EntityType::Function,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_projects_are_isolated() {
        let processor = LocalProcessor::new();
        processor
            .create_entity("a", EntityType::Run, &json!({"id": "r1"}))
            .await
            .unwrap();
        assert!(processor.read_entity("b", EntityType::Run, "r1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let processor = LocalProcessor::new();
        processor
            .create_entity("p", EntityType::Run, &json!({"id": "r1", "status": {"state": "CREATED"}}))
            .await
            .unwrap();
        let updated = processor
            .update_entity("p", EntityType::Run, "r1", &json!({"status": {"state": "BUILT"}}))
            .await
            .unwrap();
        assert_eq!(updated["id"], "r1");
        let read = processor.read_entity("p", EntityType::Run, "r1").await.unwrap();
        assert_eq!(read["status"]["state"], "BUILT");

        processor
            .delete_entity("p", EntityType::Run, "r1")
            .await
            .unwrap();
        assert!(processor.delete_entity("p", EntityType::Run, "r1").await.is_err());
        assert!(
            processor
                .update_entity("p", EntityType::Run, "r1", &json!({}))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_list_filters_on_function_and_kind() {
        let processor = LocalProcessor::new();
        for (id, kind, function) in [
            ("t1", "container+job", "container://p/a:1"),
            ("t2", "container+serve", "container://p/a:1"),
            ("t3", "container+job", "container://p/b:1"),
        ] {
            processor
                .create_entity(
                    "p",
                    EntityType::Task,
                    &json!({"id": id, "kind": kind, "spec": {"function": function}}),
                )
                .await
                .unwrap();
        }
        let params = ListParams::new()
            .with("function", "container://p/a:1")
            .with("kind", "container+job");
        let found = processor
            .list_context_entities("p", EntityType::Task, &params)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], "t1");

        let all = processor
            .list_context_entities("p", EntityType::Task, &ListParams::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_filters_runs_on_state() {
        let processor = LocalProcessor::new();
        for (id, state) in [("r1", "COMPLETED"), ("r2", "ERROR"), ("r3", "COMPLETED")] {
            processor
                .create_entity(
                    "p",
                    EntityType::Run,
                    &json!({"id": id, "kind": "dbt+run", "status": {"state": state}}),
                )
                .await
                .unwrap();
        }
        let completed = processor
            .list_context_entities("p", EntityType::Run, &ListParams::new().with("state", "COMPLETED"))
            .await
            .unwrap();
        let ids: Vec<&str> = completed.iter().filter_map(entity_id).collect();
        assert_eq!(ids, vec!["r1", "r3"]);

        let failed = processor
            .list_context_entities(
                "p",
                EntityType::Run,
                &ListParams::new().with("state", "ERROR").with("kind", "dbt+run"),
            )
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["id"], "r2");
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_filter() {
        let processor = LocalProcessor::new();
        processor
            .create_entity("p", EntityType::Run, &json!({"id": "r1"}))
            .await
            .unwrap();
        let err = processor
            .list_context_entities("p", EntityType::Run, &ListParams::new().with("owner", "me"))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidInput(_)));
        assert!(err.to_string().contains("owner"));
    }

    #[tokio::test]
    async fn test_remote_signals_unsupported() {
        let processor = LocalProcessor::new();
        assert!(matches!(
            processor.stop_run("p", EntityType::Run, "r1").await,
            Err(SdkError::Unsupported(_))
        ));
        assert!(matches!(
            processor.read_run_logs("p", EntityType::Run, "r1").await,
            Err(SdkError::Unsupported(_))
        ));
    }
}
