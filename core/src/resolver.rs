//! Dependency injection between modules.
//!
//! A module lists the names of the modules it depends on. At registration
//! time each name is looked up among the sibling modules and replaced by a
//! [`Dependency`] handle, which exposes the sibling's types, actions and
//! selectors but never its state.

use crate::action::{Actions, Types};
use crate::error::{Error, Result};
use crate::selectors::Selectors;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read-only public surface of another module
#[derive(Debug, Clone)]
pub struct Dependency {
    /// Action types of the dependency
    pub types: Arc<Types>,
    /// Action creators of the dependency
    pub actions: Arc<Actions>,
    /// Selectors of the dependency
    pub selectors: Arc<Selectors>,
}

/// The resolved dependencies of one module
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    module: String,
    handles: BTreeMap<String, Dependency>,
}

impl Dependencies {
    /// No dependencies
    #[must_use]
    pub fn none(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            handles: BTreeMap::new(),
        }
    }

    /// Add a handle by name
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, handle: Dependency) -> Self {
        self.handles.insert(name.into(), handle);
        self
    }

    /// Handle of an injected module
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInjected`] if the module did not inject `name`.
    pub fn get(&self, name: &str) -> Result<&Dependency> {
        self.handles.get(name).ok_or_else(|| Error::NotInjected {
            dependency: name.to_string(),
            module: self.module.clone(),
        })
    }

    /// Whether `name` is available
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Names of the injected modules
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// Number of injected modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing was injected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Parse an `inject` list supplied as untyped JSON.
///
/// # Errors
///
/// Returns [`Error::InjectNotArray`] if `raw` is not an array and
/// [`Error::InjectNotString`] if any entry is not a string.
pub fn parse_inject(module: &str, raw: &Value) -> Result<Vec<String>> {
    let Value::Array(entries) = raw else {
        return Err(Error::InjectNotArray {
            module: module.to_string(),
        });
    };

    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| Error::InjectNotString {
                module: module.to_string(),
            })
        })
        .collect()
}

/// Check that injected names are non-empty, unique and not the module itself.
///
/// # Errors
///
/// Returns [`Error::InvalidInject`] naming the first offending entry.
pub fn validate_inject(module: &str, names: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();

    for name in names {
        let reason = if name.trim().is_empty() {
            Some("name is empty")
        } else if name == module {
            Some("a module cannot inject itself")
        } else if !seen.insert(name.as_str()) {
            Some("injected more than once")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(Error::InvalidInject {
                module: module.to_string(),
                dependency: name.clone(),
                reason: reason.to_string(),
            });
        }
    }

    Ok(())
}

/// Resolve `inject` against the handles of every registered module.
///
/// # Errors
///
/// Returns [`Error::MissingDependency`] naming the missing dependency and
/// `module` if any name is not registered.
#[tracing::instrument(level = "debug", skip(available))]
pub fn resolve(module: &str, inject: &[String], available: &BTreeMap<String, Dependency>) -> Result<Dependencies> {
    inject.iter().try_fold(Dependencies::none(module), |deps, name| {
        let handle = available.get(name).ok_or_else(|| Error::MissingDependency {
            dependency: name.clone(),
            module: module.to_string(),
        })?;
        Ok(deps.with(name.clone(), handle.clone()))
    })
}

/// Find an injection cycle, if any.
///
/// `graph` lists each module with the names it injects, in registration
/// order. Names without an entry are ignored (they fail resolution
/// separately). The returned cycle repeats its first module at the end.
#[must_use]
pub fn find_cycle(graph: &[(String, Vec<String>)]) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        node: &'a str,
        edges: &BTreeMap<&'a str, &'a [String]>,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| (*n).to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            },
            None => {},
        }

        marks.insert(node, Mark::Visiting);
        path.push(node);

        for next in edges.get(node).copied().unwrap_or_default() {
            if edges.contains_key(next.as_str()) {
                if let Some(cycle) = visit(next, edges, marks, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let edges: BTreeMap<&str, &[String]> = graph
        .iter()
        .map(|(name, inject)| (name.as_str(), inject.as_slice()))
        .collect();
    let mut marks = BTreeMap::new();

    graph.iter().find_map(|(name, _)| {
        let mut path = Vec::new();
        visit(name, &edges, &mut marks, &mut path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_inject_requires_array() {
        assert!(matches!(parse_inject("test", &json!(123)), Err(Error::InjectNotArray { .. })));
        let err = parse_inject("test", &json!(123)).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("array of dependency names"));
    }

    #[test]
    fn test_parse_inject_requires_strings() {
        let err = parse_inject("test", &json!([123]));
        assert!(matches!(err, Err(Error::InjectNotString { .. })));
        assert!(err.err().map(|e| e.to_string()).unwrap_or_default().contains("names should be strings"));
        assert_eq!(parse_inject("test", &json!(["a", "b"])), Ok(names(&["a", "b"])));
    }

    #[test]
    fn test_validate_inject() {
        assert_eq!(validate_inject("a", &names(&["b", "c"])), Ok(()));
        assert!(matches!(validate_inject("a", &names(&["a"])), Err(Error::InvalidInject { .. })));
        assert!(matches!(validate_inject("a", &names(&["b", "b"])), Err(Error::InvalidInject { .. })));
        assert!(matches!(validate_inject("a", &names(&[" "])), Err(Error::InvalidInject { .. })));
    }

    #[test]
    fn test_resolve_missing_dependency_names_both() {
        let err = resolve("test2", &names(&["test3"]), &BTreeMap::new());
        let Err(err) = err else {
            unreachable!("nothing is available");
        };
        let message = err.to_string();
        assert!(message.contains("'test3'"));
        assert!(message.contains("test2"));
        assert!(message.contains("There is no dependency called 'test3'"));
    }

    #[test]
    fn test_not_injected_lookup() {
        let deps = Dependencies::none("order");
        assert!(matches!(deps.get("user"), Err(Error::NotInjected { .. })));
        assert!(deps.is_empty());
    }

    #[test]
    fn test_find_cycle() {
        let acyclic = vec![
            ("a".to_string(), names(&["b"])),
            ("b".to_string(), names(&["c"])),
            ("c".to_string(), vec![]),
        ];
        assert_eq!(find_cycle(&acyclic), None);

        let cyclic = vec![
            ("user".to_string(), names(&["order"])),
            ("order".to_string(), names(&["user"])),
            ("settings".to_string(), names(&["user", "order"])),
        ];
        assert_eq!(find_cycle(&cyclic), Some(names(&["user", "order", "user"])));
    }

    #[test]
    fn test_find_cycle_ignores_unknown_names() {
        let graph = vec![("a".to_string(), names(&["ghost"]))];
        assert_eq!(find_cycle(&graph), None);
    }
}
