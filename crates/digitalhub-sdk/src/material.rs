// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Material entities: artifacts, dataitems and models.
//!
//! Runs refer to materials by key, `store://{project}/{type}[/{kind}]/{name}[:{id}]`.
//! A key without an id designates the latest version of the named entity.

use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::{Result, SdkError};
use crate::kind::EntityType;

const STORE_SCHEME: &str = "store://";

/// Parsed material key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialKey {
    pub project: String,
    pub entity_type: EntityType,
    /// Entity kind, when the key carries one (e.g. `table`).
    pub kind: Option<String>,
    pub name: String,
    /// Pinned version; `None` selects the latest.
    pub id: Option<String>,
}

/// Entity type of a material, as named in a key.
pub fn material_entity_type(entity_type: &str) -> Result<EntityType> {
    match entity_type {
        "artifact" => Ok(EntityType::Artifact),
        "dataitem" => Ok(EntityType::Dataitem),
        "model" => Ok(EntityType::Model),
        other => Err(SdkError::InvalidInput(format!(
            "unhandled entity type: {}",
            other
        ))),
    }
}

impl MaterialKey {
    /// Whether a string is a material key at all.
    pub fn is_key(value: &str) -> bool {
        value.starts_with(STORE_SCHEME)
    }

    pub fn parse(key: &str) -> Result<Self> {
        let invalid =
            |why: &str| SdkError::InvalidInput(format!("invalid key '{}': {}", key, why));

        let path = key
            .strip_prefix(STORE_SCHEME)
            .ok_or_else(|| invalid("expected store:// scheme"))?;
        let segments: Vec<&str> = path.split('/').collect();
        let (project, entity_type, kind, last) = match segments.as_slice() {
            [project, entity_type, last] => (*project, *entity_type, None, *last),
            [project, entity_type, kind, last] => (*project, *entity_type, Some(*kind), *last),
            _ => return Err(invalid("expected {project}/{type}[/{kind}]/{name}[:{id}]")),
        };
        if project.is_empty() {
            return Err(invalid("empty project"));
        }
        let entity_type = material_entity_type(entity_type)?;

        let (name, id) = match last.split_once(':') {
            Some((name, id)) if !id.is_empty() => (name, Some(id.to_string())),
            Some(_) => return Err(invalid("empty id")),
            None => (last, None),
        };
        if name.is_empty() {
            return Err(invalid("empty name"));
        }

        Ok(Self {
            project: project.to_string(),
            entity_type,
            kind: kind.map(str::to_string),
            name: name.to_string(),
            id,
        })
    }
}

impl fmt::Display for MaterialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", STORE_SCHEME, self.project, self.entity_type)?;
        if let Some(kind) = &self.kind {
            write!(f, "/{}", kind)?;
        }
        write!(f, "/{}", self.name)?;
        if let Some(id) = &self.id {
            write!(f, ":{}", id)?;
        }
        Ok(())
    }
}

/// Read the entity a key designates.
pub async fn get_material(context: &Context, key: &MaterialKey) -> Result<Value> {
    debug!(key = %key, "Resolving material");
    context
        .processor()
        .read_context_entity(&key.project, key.entity_type, &key.name, key.id.as_deref())
        .await
}

/// Resolve a value holding a key, or a list of keys.
///
/// Anything that is not a key is returned unchanged.
pub async fn resolve_value(context: &Context, value: &Value) -> Result<Value> {
    match value {
        Value::String(key) if MaterialKey::is_key(key) => {
            get_material(context, &MaterialKey::parse(key)?).await
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(key) if MaterialKey::is_key(key) => {
                        resolved.push(get_material(context, &MaterialKey::parse(key)?).await?);
                    }
                    other => resolved.push(other.clone()),
                }
            }
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Resolve every entry of a mapping with [`resolve_value`].
pub async fn resolve_materials(
    context: &Context,
    values: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let mut resolved = Map::with_capacity(values.len());
    for (name, value) in values {
        resolved.insert(name.clone(), resolve_value(context, value).await?);
    }
    Ok(resolved)
}
