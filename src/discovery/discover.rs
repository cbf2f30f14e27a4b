// ABOUTME: Lexical keyword scoring over the tool repository
// ABOUTME: Empty/whitespace query or non-positive limit short-circuit to an empty result
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::tools::ToolDescriptor;

/// A tool plus its discovery score, ordered by relevance.
#[derive(Debug, Clone)]
pub struct DiscoveredTool {
    /// The underlying descriptor.
    pub tool: ToolDescriptor,
    /// Combined score from name/description/category matches.
    pub score: i64,
}

fn score_one(tool: &ToolDescriptor, query_lower: &str) -> i64 {
    let name_lower = tool.name.to_lowercase();
    let mut score = 0;

    if name_lower == query_lower {
        score += 100;
    } else if name_lower.contains(query_lower) {
        score += 50;
    }

    if tool.description.to_lowercase().contains(query_lower) {
        score += 25;
    }

    if tool.categories.iter().any(|c| c.to_lowercase().contains(query_lower)) {
        score += 10;
    }

    score
}

/// Score and rank `tools` against `query`. Empty or whitespace-only query
/// returns an empty list; `limit <= 0` also returns an empty list. Ties keep
/// the relative order `tools` was given in (stable sort).
#[must_use]
pub fn discover(tools: &[ToolDescriptor], query: &str, limit: i64) -> Vec<DiscoveredTool> {
    let trimmed = query.trim();
    if trimmed.is_empty() || limit <= 0 {
        return Vec::new();
    }
    let query_lower = trimmed.to_lowercase();

    let mut scored: Vec<DiscoveredTool> = tools
        .iter()
        .map(|tool| DiscoveredTool { tool: tool.clone(), score: score_one(tool, &query_lower) })
        .filter(|d| d.score > 0)
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit.max(0) as usize);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, desc: &str, categories: &[&str]) -> ToolDescriptor {
        ToolDescriptor::new(name, desc, json!({}))
            .with_categories(categories.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn s3_empty_query_short_circuits() {
        let tools = vec![tool("a", "b", &[])];
        assert!(discover(&tools, "", 5).is_empty());
        assert!(discover(&tools, "   ", 5).is_empty());
    }

    #[test]
    fn non_positive_limit_is_empty() {
        let tools = vec![tool("operations/a", "ops tool", &[])];
        assert!(discover(&tools, "operations", 0).is_empty());
        assert!(discover(&tools, "operations", -1).is_empty());
    }

    #[test]
    fn exact_name_beats_substring_beats_description() {
        let tools = vec![
            tool("foo", "unrelated", &[]),
            tool("foobar", "unrelated", &[]),
            tool("baz", "mentions foo here", &[]),
        ];
        let out = discover(&tools, "foo", 10);
        let names: Vec<_> = out.iter().map(|d| d.tool.name.clone()).collect();
        assert_eq!(names, vec!["foo".to_owned(), "foobar".to_owned(), "baz".to_owned()]);
        assert_eq!(out[0].score, 100);
        assert_eq!(out[1].score, 50);
        assert_eq!(out[2].score, 25);
    }

    #[test]
    fn case_insensitive_matching() {
        let tools = vec![tool("FOO", "desc", &[])];
        let out = discover(&tools, "foo", 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 100);
    }

    #[test]
    fn zero_score_excluded() {
        let tools = vec![tool("alpha", "beta", &["gamma"])];
        assert!(discover(&tools, "zzz", 10).is_empty());
    }
}
