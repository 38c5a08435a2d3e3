//! The root registry: resolves a batch of drafts into modules.
//!
//! Registration is two-phase. Every draft's public handle is collected
//! first, so a module's reactions and sagas may reference any sibling
//! regardless of registration order. Then each draft is resolved, in
//! registration order. The first error aborts the whole registration.

use crate::composition::{CombinedReducer, combine_reducers};
use crate::compose;
use crate::config::{CyclePolicy, RegistryConfig};
use crate::effect::Saga;
use crate::error::{Error, Result};
use crate::module::{Module, ModuleDraft};
use crate::reducer::{Reducer, SharedReducer};
use crate::resolver::{self, Dependency};
use crate::State;
use std::collections::BTreeMap;
use std::fmt;

/// Registers module drafts under a [`RegistryConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleRegistry {
    config: RegistryConfig,
}

impl ModuleRegistry {
    /// Registry with default policies
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the given policies
    #[must_use]
    pub const fn with_config(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// Active policies
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Resolve every draft against its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateModule`] for repeated names,
    /// [`Error::DependencyCycle`] for cycles under [`CyclePolicy::Reject`],
    /// [`Error::MissingDependency`] for unresolved injects, and any error
    /// raised while composing a module.
    #[tracing::instrument(skip(self, drafts), fields(modules = drafts.len()))]
    pub fn register(&self, drafts: Vec<ModuleDraft>) -> Result<Registry> {
        let mut handles: BTreeMap<String, Dependency> = BTreeMap::new();
        for draft in &drafts {
            if handles.insert(draft.name().to_string(), draft.handle()).is_some() {
                return Err(Error::DuplicateModule {
                    module: draft.name().to_string(),
                });
            }
        }

        let graph: Vec<(String, Vec<String>)> = drafts
            .iter()
            .map(|d| (d.name().to_string(), d.inject().to_vec()))
            .collect();
        if let Some(cycle) = resolver::find_cycle(&graph) {
            match self.config.cycle_policy {
                CyclePolicy::Allow => {
                    tracing::debug!(cycle = ?cycle, "Modules inject each other in a cycle");
                },
                CyclePolicy::Reject => return Err(Error::DependencyCycle { cycle }),
            }
        }

        let mut registry = Registry::default();
        for draft in drafts {
            let deps = resolver::resolve(draft.name(), draft.inject(), &handles)?;
            let module = compose::compose(draft, deps, &self.config)?;
            registry.insert(module);
        }

        tracing::info!(
            modules = registry.len(),
            sagas = registry.all_sagas.len(),
            "Modules registered"
        );

        Ok(registry)
    }
}

/// Resolve drafts with the default policies.
///
/// # Errors
///
/// See [`ModuleRegistry::register`].
pub fn register(drafts: Vec<ModuleDraft>) -> Result<Registry> {
    ModuleRegistry::new().register(drafts)
}

/// Resolved modules plus the aggregates consumed by store construction
#[derive(Clone, Default)]
pub struct Registry {
    order: Vec<String>,
    modules: BTreeMap<String, Module>,
    all_reducers: BTreeMap<String, SharedReducer>,
    all_sagas: Vec<Saga>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("order", &self.order)
            .field("all_sagas", &self.all_sagas)
            .finish_non_exhaustive()
    }
}

impl Registry {
    fn insert(&mut self, module: Module) {
        let name = module.name().to_string();
        self.all_reducers.insert(name.clone(), module.reducer());
        self.all_sagas.extend(module.sagas().iter().cloned());
        self.order.push(name.clone());
        self.modules.insert(name, module);
    }

    /// A module by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// A module by name, failing if it was not registered
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownModule`] if no module has that name.
    pub fn module(&self, name: &str) -> Result<&Module> {
        self.get(name).ok_or_else(|| Error::UnknownModule {
            module: name.to_string(),
        })
    }

    /// Modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|name| self.modules.get(name))
    }

    /// Module names in registration order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Module name → reducer, one entry per module
    #[must_use]
    pub const fn all_reducers(&self) -> &BTreeMap<String, SharedReducer> {
        &self.all_reducers
    }

    /// Every module's sagas, in registration order
    #[must_use]
    pub fn all_sagas(&self) -> &[Saga] {
        &self.all_sagas
    }

    /// All reducers combined under their module names
    #[must_use]
    pub fn root_reducer(&self) -> CombinedReducer {
        combine_reducers(self.all_reducers.clone())
    }

    /// Root state built from every module's initial state
    #[must_use]
    pub fn initial_state(&self) -> State {
        self.root_reducer().initial_state()
    }
}
