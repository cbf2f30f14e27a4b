// ABOUTME: In-memory indexed store of tool descriptors, by name/category/capability
// ABOUTME: Holds every known descriptor across enabled and discovered backends
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::errors::{GateError, GateResult};

use super::descriptor::ToolDescriptor;

/// Optional search filters for [`ToolRepository::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Case-sensitive substring match against `name`.
    pub name: Option<String>,
    /// Exact match against any of the tool's categories.
    pub category: Option<String>,
    /// Exact match against any of the tool's capabilities.
    pub capability: Option<String>,
    /// Whether to include deprecated tools. Defaults to `false`.
    pub include_deprecated: bool,
}

/// Indexed store of all known tool descriptors.
///
/// Distinct from the Gate Controller's active map: this repository holds
/// every descriptor the proxy has ever learned about (from connected
/// backends or discovery passes), whether or not its owning toolset is
/// currently active.
#[derive(Debug, Default)]
pub struct ToolRepository {
    by_name: IndexMap<String, ToolDescriptor>,
    by_category: HashMap<String, HashSet<String>>,
    by_capability: HashMap<String, HashSet<String>>,
}

impl ToolRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a tool descriptor.
    ///
    /// # Errors
    /// Returns [`GateError::InvalidInput`] if `name` is empty.
    pub fn add_tool(&mut self, tool: ToolDescriptor) -> GateResult<()> {
        if tool.name.is_empty() {
            return Err(GateError::InvalidInput("tool name must not be empty".into()));
        }

        // Overwriting a tool must not leave stale index entries from the
        // prior categories/capabilities behind.
        if self.by_name.contains_key(&tool.name) {
            self.deindex(&tool.name);
        }

        for category in &tool.categories {
            self.by_category
                .entry(category.clone())
                .or_default()
                .insert(tool.name.clone());
        }
        for capability in &tool.capabilities {
            self.by_capability
                .entry(capability.clone())
                .or_default()
                .insert(tool.name.clone());
        }

        self.by_name.insert(tool.name.clone(), tool);
        Ok(())
    }

    fn deindex(&mut self, name: &str) {
        if let Some(old) = self.by_name.get(name) {
            for category in &old.categories {
                if let Some(set) = self.by_category.get_mut(category) {
                    set.remove(name);
                }
            }
            for capability in &old.capabilities {
                if let Some(set) = self.by_capability.get_mut(capability) {
                    set.remove(name);
                }
            }
        }
    }

    /// Remove a tool by name. Returns whether anything was removed.
    pub fn remove_tool(&mut self, name: &str) -> bool {
        if !self.by_name.contains_key(name) {
            return false;
        }
        self.deindex(name);
        self.by_name.shift_remove(name);
        true
    }

    /// Look up a tool by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name)
    }

    /// Number of known tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the repository holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// All known descriptors, in the order they were first inserted.
    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.by_name.values()
    }

    /// Search with intersection semantics over the supplied, optional filters.
    #[must_use]
    pub fn search(&self, opts: &SearchOptions) -> Vec<&ToolDescriptor> {
        self.by_name
            .values()
            .filter(|tool| opts.include_deprecated || !tool.deprecated)
            .filter(|tool| {
                opts.name
                    .as_ref()
                    .map_or(true, |needle| tool.name.contains(needle.as_str()))
            })
            .filter(|tool| {
                opts.category
                    .as_ref()
                    .map_or(true, |cat| tool.categories.iter().any(|c| c == cat))
            })
            .filter(|tool| {
                opts.capability
                    .as_ref()
                    .map_or(true, |cap| tool.capabilities.iter().any(|c| c == cap))
            })
            .collect()
    }

    /// Reset all three indexes atomically (single mutable borrow).
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_category.clear();
        self.by_capability.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "d", json!({"type": "object"}))
            .with_categories(["cat-a"])
            .with_capabilities(["read"])
    }

    #[test]
    fn add_tool_rejects_empty_name() {
        let mut repo = ToolRepository::new();
        let err = repo.add_tool(ToolDescriptor::new("", "d", json!({}))).unwrap_err();
        assert!(matches!(err, GateError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_names_overwrite_and_reindex() {
        let mut repo = ToolRepository::new();
        repo.add_tool(tool("a")).unwrap();
        let mut replacement = tool("a");
        replacement.categories = vec!["cat-b".into()];
        repo.add_tool(replacement).unwrap();

        assert!(repo.search(&SearchOptions {
            category: Some("cat-a".into()),
            ..Default::default()
        }).is_empty());
        assert_eq!(repo.search(&SearchOptions {
            category: Some("cat-b".into()),
            ..Default::default()
        }).len(), 1);
    }

    #[test]
    fn remove_tool_deindexes() {
        let mut repo = ToolRepository::new();
        repo.add_tool(tool("a")).unwrap();
        assert!(repo.remove_tool("a"));
        assert!(!repo.remove_tool("a"));
        assert!(repo.search(&SearchOptions {
            category: Some("cat-a".into()),
            ..Default::default()
        }).is_empty());
    }

    #[test]
    fn search_excludes_deprecated_by_default() {
        let mut repo = ToolRepository::new();
        let mut t = tool("a");
        t.deprecated = true;
        repo.add_tool(t).unwrap();
        assert!(repo.search(&SearchOptions::default()).is_empty());
        assert_eq!(repo.search(&SearchOptions { include_deprecated: true, ..Default::default() }).len(), 1);
    }

    #[test]
    fn clear_resets_all_indexes() {
        let mut repo = ToolRepository::new();
        repo.add_tool(tool("a")).unwrap();
        repo.clear();
        assert!(repo.is_empty());
        assert!(repo.search(&SearchOptions { category: Some("cat-a".into()), ..Default::default() }).is_empty());
    }
}
