// ABOUTME: Bounded first-fit "knapsack" provisioning under a token budget
// ABOUTME: Preserves relevance order; not an optimal knapsack by design
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::tools::ToolDescriptor;

/// Select a prefix-order subset of `tools` whose combined estimated token
/// cost fits within `max_tokens`.
///
/// `max_tokens <= 0` or non-finite returns an empty result. Tools are
/// considered in the given order; a tool that alone exceeds the remaining
/// budget is skipped (not a hard stop) so a smaller tool later in the list
/// can still fill leftover budget. This is first-fit, not an optimal
/// knapsack.
#[must_use]
pub fn provision(tools: &[ToolDescriptor], max_tokens: f64) -> Vec<ToolDescriptor> {
    if !max_tokens.is_finite() || max_tokens <= 0.0 {
        return Vec::new();
    }
    let budget = max_tokens as u64;

    let mut sum: u64 = 0;
    let mut selected = Vec::new();
    for tool in tools {
        let est = u64::from(tool.estimated_tokens());
        if sum + est <= budget {
            sum += est;
            selected.push(tool.clone());
        }
    }
    selected
}
