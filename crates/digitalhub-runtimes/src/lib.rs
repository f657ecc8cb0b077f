// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execution engines for digitalhub runs.
//!
//! Each engine registers itself into the process-wide
//! [`RuntimeRegistry`](digitalhub_sdk::RuntimeRegistry) at link time:
//!
//! | Engine | Run kinds | Execution |
//! |--------|-----------|-----------|
//! | [`ContainerRuntime`] | `container+run` | backend |
//! | [`KfpRuntime`] | `kfp+run`, `kfp+build` | backend |
//! | [`DbtRuntime`] | `dbt+run` | local process |
//! | [`HuggingfaceServeRuntime`] | `huggingfaceserve+run` | backend |
//!
//! Binaries must reference this crate (for instance through
//! [`registered_kinds`]) so the registrations are linked in.

mod compose;
pub mod container;
pub mod dbt;
pub mod huggingfaceserve;
pub mod kfp;

pub use container::ContainerRuntime;
pub use dbt::DbtRuntime;
pub use huggingfaceserve::HuggingfaceServeRuntime;
pub use kfp::KfpRuntime;

use digitalhub_sdk::{RuntimeKind, RuntimeRegistry};

/// Runtime kinds available in the process-wide registry.
pub fn registered_kinds() -> Vec<RuntimeKind> {
    RuntimeRegistry::global().kinds()
}
