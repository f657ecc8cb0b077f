// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! digitalhub SDK
//!
//! Control-plane SDK for the digitalhub MLOps platform. It models functions,
//! workflows, tasks and runs as entities, keeps them in sync with the backend
//! (or with an in-memory store in local mode), and drives the run lifecycle.
//!
//! # Architecture
//!
//! - [`Context`]: project scope, owning a [`Processor`] (persistence and
//!   transport), a [`RuntimeRegistry`] and the [`SdkConfig`]
//! - [`Run`]: the lifecycle state machine (`build`, `run`, `wait`, `logs`,
//!   `stop`, `resume`)
//! - [`Runtime`]: execution engine strategy, resolved by run kind from the
//!   registry that engine crates populate through `inventory`
//! - [`MaterialKey`]: `store://` keys of the artifacts, dataitems and models
//!   runs consume and produce
//!
//! # Example
//!
//! ```no_run
//! use digitalhub_sdk::{Context, ExecuteOptions, TaskSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::local("demo");
//! let function = ctx
//!     .new_function("transform", "dbt", serde_json::Map::new())
//!     .await?;
//!
//! let run = ctx
//!     .execute(
//!         &function,
//!         ExecuteOptions::new("dbt+transform")
//!             .with_task_spec(TaskSpec::default())
//!             .with_wait(true),
//!     )
//!     .await?;
//! println!("Run {} finished in {}", run.id, run.state());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod kind;
pub mod material;
pub mod operations;
pub mod processor;
pub mod reference;
pub mod run;
pub mod runtime;
pub mod state;
pub mod task;

pub use config::SdkConfig;
pub use context::Context;
pub use entity::{Executable, Metadata};
pub use error::{Result, SdkError};
pub use kind::{EntityType, RunKind, RuntimeKind};
pub use material::{MaterialKey, get_material, resolve_materials};
pub use operations::ExecuteOptions;
pub use processor::{HttpProcessor, ListParams, LocalProcessor, Processor};
pub use reference::TaskReference;
pub use run::{
    Run, RunSpec, RunStatus, StateAuthority, StatusPatch, build_spec, build_status,
    resolve_executable, resolve_task,
};
pub use runtime::{
    Runtime, RuntimeError, RuntimeRegistration, RuntimeRegistry, RuntimeResult, build_runtime,
};
pub use state::State;
pub use task::{ServicePort, Task, TaskSpec};
