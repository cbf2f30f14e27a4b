// ABOUTME: Discovery & Provisioning: keyword-scored search plus bounded knapsack under a token budget
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod discover;
pub mod provision;
pub mod service;

pub use discover::{discover, DiscoveredTool};
pub use provision::provision;
pub use service::{GatingMetrics, GatingService};
