// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project context: the processor, runtimes and configuration entities use.

use std::sync::Arc;

use crate::config::SdkConfig;
use crate::error::Result;
use crate::processor::{HttpProcessor, LocalProcessor, Processor};
use crate::runtime::RuntimeRegistry;

/// Everything an entity needs to reach its project.
///
/// Cloning is cheap; clones share the processor and the runtime registry.
#[derive(Clone)]
pub struct Context {
    project: String,
    local: bool,
    processor: Arc<dyn Processor>,
    runtimes: Arc<RuntimeRegistry>,
    config: SdkConfig,
}

impl Context {
    /// Context over an arbitrary processor, using the process-wide runtimes.
    pub fn new(project: impl Into<String>, processor: Arc<dyn Processor>, local: bool) -> Self {
        Self {
            project: project.into(),
            local,
            processor,
            runtimes: RuntimeRegistry::global(),
            config: SdkConfig::default().with_local(local),
        }
    }

    /// Backend-less context with an in-memory store.
    pub fn local(project: impl Into<String>) -> Self {
        Self::new(project, Arc::new(LocalProcessor::new()), true)
            .with_config(SdkConfig::local())
    }

    /// Context talking to the backend at `config.endpoint`.
    pub fn remote(project: impl Into<String>, config: SdkConfig) -> Result<Self> {
        let processor = HttpProcessor::new(&config)?;
        Ok(Self::new(project, Arc::new(processor), false).with_config(config.with_local(false)))
    }

    /// Local or remote context, as selected by `config.local`.
    pub fn from_config(project: impl Into<String>, config: SdkConfig) -> Result<Self> {
        if config.local {
            Ok(Self::local(project).with_config(config))
        } else {
            Self::remote(project, config)
        }
    }

    /// Replace the runtime registry.
    pub fn with_runtimes(mut self, runtimes: Arc<RuntimeRegistry>) -> Self {
        self.runtimes = runtimes;
        self
    }

    /// Replace the configuration. The local flag of the context is kept.
    pub fn with_config(mut self, config: SdkConfig) -> Self {
        self.config = config.with_local(self.local);
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    pub fn runtimes(&self) -> &Arc<RuntimeRegistry> {
        &self.runtimes
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("project", &self.project)
            .field("local", &self.local)
            .field("runtimes", &self.runtimes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
