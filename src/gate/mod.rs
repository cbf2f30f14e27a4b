// ABOUTME: Tool Gate Controller module: toolset lifecycle, reverse index, active-tool map
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod controller;
pub mod reverse_index;
pub mod toolset;

pub use controller::{ConflictResolution, GateConfig, ToolGateController};
pub use reverse_index::ReverseIndex;
pub use toolset::{StaticLoader, ToolsetLoader, ToolsetManifest, ToolsetRegistration, ToolsetState, UsageEntry};
