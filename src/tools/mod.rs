// ABOUTME: Tool descriptor, repository, and filter-chain building blocks
// ABOUTME: Owned by the Tool Repository (all known tools) vs. the Gate Controller (active tools)
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod descriptor;
pub mod filter;
pub mod repository;

pub use descriptor::ToolDescriptor;
pub use filter::{FilterChainConfig, FilterContext, ToolMap};
pub use repository::{SearchOptions, ToolRepository};
