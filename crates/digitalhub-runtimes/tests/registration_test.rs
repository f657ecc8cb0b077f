// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engines are discoverable through the process-wide registry.

use digitalhub_sdk::{RunKind, RuntimeKind, SdkError, build_runtime};

#[test]
fn test_every_engine_is_registered() {
    assert_eq!(
        digitalhub_runtimes::registered_kinds(),
        vec![
            RuntimeKind::Container,
            RuntimeKind::Kfp,
            RuntimeKind::Dbt,
            RuntimeKind::Huggingfaceserve,
        ]
    );
}

#[test]
fn test_every_run_kind_resolves_to_its_engine() {
    for kind in RunKind::ALL {
        let runtime = match build_runtime(kind.as_str(), "demo") {
            Ok(runtime) => runtime,
            Err(err) => panic!("{}: {}", kind, err),
        };
        assert_eq!(runtime.kind(), kind.runtime());
    }
}

#[test]
fn test_unknown_kind_is_config_error() {
    let err = build_runtime("spark+run", "demo").err().unwrap();
    assert!(matches!(err, SdkError::Config(_)));
}
