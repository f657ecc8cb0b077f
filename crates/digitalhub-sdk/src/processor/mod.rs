// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Processor: the persistence and transport collaborator.
//!
//! Entities never talk to the backend directly. Every read, write and remote
//! control signal goes through a [`Processor`]:
//! - `local`: in-memory store for backend-less operation
//! - `http`: REST client for the backend

pub mod http;
pub mod local;

pub use self::http::HttpProcessor;
pub use self::local::LocalProcessor;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::kind::EntityType;

/// Filters for entity listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    filters: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Value of a filter, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Backend operations used by entities.
///
/// Entities are exchanged as plain JSON mappings in the persisted schema.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Persist a new entity and return the stored representation.
    async fn create_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        entity: &Value,
    ) -> Result<Value>;

    /// Read a named entity; `entity_id` selects a version, `None` the latest.
    async fn read_context_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        name: &str,
        entity_id: Option<&str>,
    ) -> Result<Value>;

    /// Read an entity by id.
    async fn read_entity(&self, project: &str, entity_type: EntityType, id: &str)
    -> Result<Value>;

    /// Replace an entity and return the stored representation.
    async fn update_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
        entity: &Value,
    ) -> Result<Value>;

    /// Delete an entity.
    async fn delete_entity(&self, project: &str, entity_type: EntityType, id: &str) -> Result<()>;

    /// List entities matching the filters.
    async fn list_context_entities(
        &self,
        project: &str,
        entity_type: EntityType,
        params: &ListParams,
    ) -> Result<Vec<Value>>;

    /// Fetch the logs collected by the remote engine.
    async fn read_run_logs(&self, project: &str, entity_type: EntityType, id: &str)
    -> Result<Value>;

    /// Ask the remote engine to stop a run. Does not wait for confirmation.
    async fn stop_run(&self, project: &str, entity_type: EntityType, id: &str) -> Result<Value>;

    /// Ask the remote engine to resume a stopped run.
    async fn resume_run(&self, project: &str, entity_type: EntityType, id: &str) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params() {
        let params = ListParams::new()
            .with("function", "dbt://p/f:1")
            .with("kind", "dbt+transform");
        assert_eq!(params.get("kind"), Some("dbt+transform"));
        assert_eq!(params.get("name"), None);
        assert_eq!(params.iter().count(), 2);
        assert!(!params.is_empty());
        assert!(ListParams::default().is_empty());
    }
}
