// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! REST processor talking to the backend.
//!
//! Context-scoped entities live under `{endpoint}/api/v1/-/{project}/{collection}`;
//! projects themselves under `{endpoint}/api/v1/projects`. Listings are paged
//! and return `{"content": [...], "last": bool}`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{ListParams, Processor};
use crate::config::SdkConfig;
use crate::error::{Result, SdkError};
use crate::kind::EntityType;

const API_PREFIX: &str = "/api/v1";
const PAGE_SIZE: u32 = 100;

/// URL of a collection.
pub fn collection_url(endpoint: &str, project: &str, entity_type: EntityType) -> String {
    match entity_type {
        EntityType::Project => format!("{}{}/projects", endpoint, API_PREFIX),
        _ => format!(
            "{}{}/-/{}/{}",
            endpoint,
            API_PREFIX,
            project,
            entity_type.collection()
        ),
    }
}

/// URL of a single entity.
pub fn entity_url(endpoint: &str, project: &str, entity_type: EntityType, id: &str) -> String {
    format!("{}/{}", collection_url(endpoint, project, entity_type), id)
}

/// URL of a run control action (`logs`, `stop`, `resume`).
pub fn action_url(
    endpoint: &str,
    project: &str,
    entity_type: EntityType,
    id: &str,
    action: &str,
) -> String {
    format!("{}/{}", entity_url(endpoint, project, entity_type, id), action)
}

/// Processor backed by the backend REST API.
#[derive(Debug, Clone)]
pub struct HttpProcessor {
    client: Client,
    endpoint: String,
}

impl HttpProcessor {
    /// Create a processor for the configured endpoint.
    pub fn new(config: &SdkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SdkError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(
        &self,
        request: RequestBuilder,
        entity_type: EntityType,
        key: &str,
    ) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SdkError::not_found(entity_type, key));
        }
        let message = response.text().await.unwrap_or_default();
        Err(SdkError::Server {
            code: status.as_u16(),
            message,
        })
    }

    async fn json(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
        entity_type: EntityType,
        key: &str,
    ) -> Result<Value> {
        debug!(%method, url = %url, "Backend request");
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(request, entity_type, key).await?;
        let text = response.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            SdkError::UnexpectedResponse(format!("invalid JSON from {}: {}", url, e))
        })
    }

    async fn list_page(
        &self,
        url: &str,
        entity_type: EntityType,
        query: &[(&str, String)],
    ) -> Result<(Vec<Value>, bool)> {
        let request = self.client.get(url).query(query);
        let response = self.send(request, entity_type, url).await?;
        let page: Value = response.json().await?;
        let content = match page.get("content") {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                return Err(SdkError::UnexpectedResponse(format!(
                    "listing of {} has no content",
                    entity_type.collection()
                )));
            }
        };
        let last = page.get("last").and_then(Value::as_bool).unwrap_or(true);
        Ok((content, last))
    }
}

#[async_trait]
impl Processor for HttpProcessor {
    #[instrument(skip(self, entity_type, entity), fields(entity_type = %entity_type))]
    async fn create_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        entity: &Value,
    ) -> Result<Value> {
        let url = collection_url(&self.endpoint, project, entity_type);
        self.json(Method::POST, url, Some(entity), entity_type, project)
            .await
    }

    async fn read_context_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        name: &str,
        entity_id: Option<&str>,
    ) -> Result<Value> {
        if let Some(id) = entity_id {
            let url = entity_url(&self.endpoint, project, entity_type, id);
            return self
                .json(Method::GET, url, None, entity_type, &format!("{}:{}", name, id))
                .await;
        }
        let params = ListParams::new()
            .with("name", name)
            .with("versions", "latest");
        self.list_context_entities(project, entity_type, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SdkError::not_found(entity_type, name))
    }

    async fn read_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Value> {
        let url = entity_url(&self.endpoint, project, entity_type, id);
        self.json(Method::GET, url, None, entity_type, id).await
    }

    async fn update_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
        entity: &Value,
    ) -> Result<Value> {
        let url = entity_url(&self.endpoint, project, entity_type, id);
        self.json(Method::PUT, url, Some(entity), entity_type, id)
            .await
    }

    async fn delete_entity(&self, project: &str, entity_type: EntityType, id: &str) -> Result<()> {
        let url = entity_url(&self.endpoint, project, entity_type, id);
        self.json(Method::DELETE, url, None, entity_type, id).await?;
        Ok(())
    }

    async fn list_context_entities(
        &self,
        project: &str,
        entity_type: EntityType,
        params: &ListParams,
    ) -> Result<Vec<Value>> {
        let url = collection_url(&self.endpoint, project, entity_type);
        let mut entities = Vec::new();
        let mut page = 0u32;
        loop {
            let mut query: Vec<(&str, String)> =
                params.iter().map(|(k, v)| (k, v.to_string())).collect();
            query.push(("page", page.to_string()));
            query.push(("size", PAGE_SIZE.to_string()));

            let (content, last) = self.list_page(&url, entity_type, &query).await?;
            let empty = content.is_empty();
            entities.extend(content);
            if last || empty {
                break;
            }
            page += 1;
        }
        debug!(
            entity_type = %entity_type,
            count = entities.len(),
            "Listed entities"
        );
        Ok(entities)
    }

    async fn read_run_logs(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Value> {
        let url = action_url(&self.endpoint, project, entity_type, id, "logs");
        self.json(Method::GET, url, None, entity_type, id).await
    }

    async fn stop_run(&self, project: &str, entity_type: EntityType, id: &str) -> Result<Value> {
        let url = action_url(&self.endpoint, project, entity_type, id, "stop");
        self.json(Method::POST, url, None, entity_type, id).await
    }

    async fn resume_run(&self, project: &str, entity_type: EntityType, id: &str) -> Result<Value> {
        let url = action_url(&self.endpoint, project, entity_type, id, "resume");
        self.json(Method::POST, url, None, entity_type, id).await
    }
}
