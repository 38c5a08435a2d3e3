//! Module definitions and their two-phase lifecycle.
//!
//! 1. **Declare**: [`ModuleDefinition::build`] validates the definition and
//!    eagerly derives types, action creators and selectors, producing an
//!    immutable [`ModuleDraft`].
//! 2. **Resolve**: once every sibling exists,
//!    [`ModuleDraft::with_dependencies`] runs the deferred reactions, sagas
//!    and thunk bindings and compiles the reducer, producing a [`Module`].
//!
//! # Example
//!
//! ```
//! use reducktion_core::module::{ActionMap, ModuleDefinition};
//! use reducktion_core::resolver::Dependencies;
//! use reducktion_core::{Action, Reducer};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), reducktion_core::Error> {
//! let draft = ModuleDefinition::new("settings")
//!     .state(json!({ "notificationsEnabled": false }))
//!     .actions(|_| {
//!         ActionMap::new().reducer("toggleNotifications", |state, _| {
//!             let enabled = state["notificationsEnabled"].as_bool().unwrap_or(false);
//!             json!({ "notificationsEnabled": !enabled })
//!         })
//!     })
//!     .build()?;
//!
//! assert_eq!(draft.types().get("toggleNotifications"), Some("settings/toggleNotifications"));
//!
//! let module = draft.with_dependencies(Dependencies::none("settings"))?;
//! let action = module.actions().create("toggleNotifications", None)?;
//! let next = module.reducer().reduce(module.initial_state(), &action);
//! assert_eq!(next, json!({ "notificationsEnabled": true }));
//! # Ok(())
//! # }
//! ```

use crate::action::{ActionCreator, ActionEntry, Actions, Types, action_type};
use crate::compose;
use crate::config::RegistryConfig;
use crate::effect::{Effect, Saga};
use crate::error::{Error, Result};
use crate::fetchable::{self, FetchableSpec};
use crate::reducer::{Handler, HandlerMap, ModuleReducer, SharedReducer, handler};
use crate::resolver::{self, Dependencies, Dependency};
use crate::selectors::{SelectorContext, SelectorMap, Selectors};
use crate::{Action, State};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// How one action of a module is handled
#[derive(Clone)]
pub enum ActionKind {
    /// A plain action; `None` declares the action without changing state
    Plain(Option<Handler>),
    /// A fetchable action expanding into its lifecycle types
    Fetchable(FetchableSpec),
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(Some(_)) => write!(f, "ActionKind::Plain(<handler>)"),
            Self::Plain(None) => write!(f, "ActionKind::Plain(noop)"),
            Self::Fetchable(spec) => f.debug_tuple("ActionKind::Fetchable").field(spec).finish(),
        }
    }
}

/// Ordered action declarations of a module
#[derive(Debug, Clone, Default)]
pub struct ActionMap {
    entries: Vec<(String, ActionKind)>,
}

impl ActionMap {
    /// No actions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an action handled by `f`
    #[must_use]
    pub fn reducer<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&State, &Action) -> State + Send + Sync + 'static,
    {
        self.insert(name, ActionKind::Plain(Some(handler(f))))
    }

    /// Declare an action that does not change this module's state
    #[must_use]
    pub fn noop(self, name: impl Into<String>) -> Self {
        self.insert(name, ActionKind::Plain(None))
    }

    /// Declare a fetchable action
    #[must_use]
    pub fn fetchable(self, name: impl Into<String>, spec: FetchableSpec) -> Self {
        self.insert(name, ActionKind::Fetchable(spec))
    }

    /// Declare an action of any kind
    #[must_use]
    pub fn insert(mut self, name: impl Into<String>, kind: ActionKind) -> Self {
        self.entries.push((name.into(), kind));
        self
    }
}

/// Reaction handlers keyed by (usually foreign) action types
#[derive(Clone, Default)]
pub struct ReactionMap {
    handlers: HandlerMap,
}

impl ReactionMap {
    /// No reactions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// React to `action_type` with `f`
    #[must_use]
    pub fn on<F>(mut self, action_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(&State, &Action) -> State + Send + Sync + 'static,
    {
        self.handlers.insert(action_type.into(), handler(f));
        self
    }

    pub(crate) fn into_handlers(self) -> HandlerMap {
        self.handlers
    }
}

/// What the `actions` factory receives
#[derive(Debug, Clone, Copy)]
pub struct ActionsContext<'a> {
    /// The module's initial state
    pub initial_state: &'a State,
}

/// What the `reactions` factory receives
#[derive(Debug, Clone, Copy)]
pub struct ReactionContext<'a> {
    /// The module's initial state
    pub initial_state: &'a State,
    /// The module's own types
    pub types: &'a Types,
    /// Resolved dependency handles
    pub deps: &'a Dependencies,
}

/// What the `sagas` factory receives
#[derive(Debug, Clone, Copy)]
pub struct SagaContext<'a> {
    /// The module's own types
    pub types: &'a Types,
    /// The module's own action creators
    pub actions: &'a Actions,
    /// Resolved dependency handles
    pub deps: &'a Dependencies,
}

/// What a thunk receives besides its argument
#[derive(Debug, Clone)]
pub struct ThunkContext {
    /// The module's own action creators
    pub actions: Arc<Actions>,
    /// Resolved dependency handles
    pub deps: Dependencies,
}

/// A thunk: argument and bound context → effect to run
pub type Thunk = Arc<dyn Fn(Option<Value>, &ThunkContext) -> Effect + Send + Sync>;

type ActionsFn = Box<dyn FnOnce(&ActionsContext<'_>) -> ActionMap + Send>;
type SelectorsFn = Box<dyn FnOnce(&SelectorContext<'_>) -> SelectorMap + Send>;
pub(crate) type ReactionsFn = Box<dyn FnOnce(&ReactionContext<'_>) -> Result<ReactionMap> + Send>;
pub(crate) type SagasFn = Box<dyn FnOnce(&SagaContext<'_>) -> Result<Vec<Saga>> + Send>;

enum Inject {
    Names(Vec<String>),
    Raw(Value),
}

/// Builder-style definition of a module
pub struct ModuleDefinition {
    name: String,
    state: Option<Value>,
    inject: Inject,
    actions: Option<ActionsFn>,
    selectors: Option<SelectorsFn>,
    reactions: Option<ReactionsFn>,
    sagas: Option<SagasFn>,
    thunks: BTreeMap<String, Thunk>,
}

impl ModuleDefinition {
    /// Start a definition for the module called `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            inject: Inject::Names(Vec::new()),
            actions: None,
            selectors: None,
            reactions: None,
            sagas: None,
            thunks: BTreeMap::new(),
        }
    }

    /// Initial state of the module's slice (must be an object)
    #[must_use]
    pub fn state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Names of the modules this module depends on
    #[must_use]
    pub fn inject<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inject = Inject::Names(names.into_iter().map(Into::into).collect());
        self
    }

    /// Dependency names as untyped JSON, validated on [`build`](Self::build)
    #[must_use]
    pub fn inject_value(mut self, raw: Value) -> Self {
        self.inject = Inject::Raw(raw);
        self
    }

    /// Action declarations, computed eagerly on [`build`](Self::build)
    #[must_use]
    pub fn actions<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&ActionsContext<'_>) -> ActionMap + Send + 'static,
    {
        self.actions = Some(Box::new(f));
        self
    }

    /// User-defined selectors, computed eagerly on [`build`](Self::build)
    #[must_use]
    pub fn selectors<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&SelectorContext<'_>) -> SelectorMap + Send + 'static,
    {
        self.selectors = Some(Box::new(f));
        self
    }

    /// Reactions to other modules' action types, computed once dependencies resolve
    #[must_use]
    pub fn reactions<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&ReactionContext<'_>) -> Result<ReactionMap> + Send + 'static,
    {
        self.reactions = Some(Box::new(f));
        self
    }

    /// Saga descriptors, computed once dependencies resolve
    #[must_use]
    pub fn sagas<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&SagaContext<'_>) -> Result<Vec<Saga>> + Send + 'static,
    {
        self.sagas = Some(Box::new(f));
        self
    }

    /// A thunk, bound to the module's actions and dependencies once they resolve
    #[must_use]
    pub fn thunk<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<Value>, &ThunkContext) -> Effect + Send + Sync + 'static,
    {
        self.thunks.insert(name.into(), Arc::new(f));
        self
    }

    /// Validate the definition and derive types, actions and selectors.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is missing, the state is
    /// not an object or has no reducers, `inject` is malformed, an action
    /// name or generated action type repeats, or a fetchable action has no
    /// valid target.
    #[tracing::instrument(level = "debug", skip(self), fields(module = %self.name))]
    pub fn build(self) -> Result<ModuleDraft> {
        let Self {
            name,
            state,
            inject,
            actions,
            selectors,
            reactions,
            sagas,
            thunks,
        } = self;

        if name.trim().is_empty() {
            return Err(Error::MissingName);
        }

        if state.is_some() && actions.is_none() && reactions.is_none() {
            return Err(Error::StateWithoutReducers { module: name });
        }

        let initial_state = match state {
            Some(Value::Object(map)) => Value::Object(map),
            None => Value::Object(Map::new()),
            Some(_) => return Err(Error::StateNotObject { module: name }),
        };

        let inject = match inject {
            Inject::Names(names) => names,
            Inject::Raw(raw) => resolver::parse_inject(&name, &raw)?,
        };
        resolver::validate_inject(&name, &inject)?;

        let mut types = Types::new(&name);
        let mut creators = Actions::new(&name);
        let mut handlers = HandlerMap::new();

        let declared = actions.map_or_else(ActionMap::new, |f| {
            f(&ActionsContext {
                initial_state: &initial_state,
            })
        });

        // Every action type produced so far, across plain and fetchable entries
        let mut emitted = BTreeSet::new();

        for (action, kind) in declared.entries {
            if creators.contains(&action) {
                return Err(Error::DuplicateAction { module: name, action });
            }

            match kind {
                ActionKind::Plain(maybe_handler) => {
                    let ty = action_type(&name, &action);
                    if types.contains(&action) || !emitted.insert(ty.clone()) {
                        return Err(Error::DuplicateAction { module: name, action });
                    }
                    if let Some(h) = maybe_handler {
                        handlers.insert(ty.clone(), h);
                    }
                    types.insert(action.clone(), ty.clone());
                    creators.insert(action, ActionEntry::Plain(ActionCreator::new(ty)));
                },
                ActionKind::Fetchable(spec) => {
                    let parts = fetchable::expand(&name, &action, spec, &initial_state)?;
                    let keyed = parts.types.keyed(&action);
                    if let Some((key, _)) = keyed
                        .iter()
                        .find(|(key, ty)| types.contains(key) || emitted.contains(ty))
                    {
                        return Err(Error::DuplicateAction {
                            module: name,
                            action: key.clone(),
                        });
                    }
                    for (key, ty) in keyed {
                        emitted.insert(ty.clone());
                        types.insert(key, ty);
                    }
                    handlers.extend(parts.handlers);
                    creators.insert(action, ActionEntry::Fetchable(parts.creator));
                },
            }
        }

        let mut module_selectors = Selectors::new(&name, &initial_state);
        if let Some(f) = selectors {
            let user_defined = f(&SelectorContext {
                name: &name,
                selectors: &module_selectors,
            });
            module_selectors.extend(user_defined);
        }

        tracing::debug!(
            types = types.len(),
            handlers = handlers.len(),
            inject = ?inject,
            "Module declared"
        );

        Ok(ModuleDraft {
            name,
            initial_state,
            inject,
            types: Arc::new(types),
            actions: Arc::new(creators),
            selectors: Arc::new(module_selectors),
            handlers,
            reactions,
            sagas,
            thunks,
        })
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("thunks", &self.thunks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A declared module whose dependencies are not resolved yet
pub struct ModuleDraft {
    pub(crate) name: String,
    pub(crate) initial_state: State,
    pub(crate) inject: Vec<String>,
    pub(crate) types: Arc<Types>,
    pub(crate) actions: Arc<Actions>,
    pub(crate) selectors: Arc<Selectors>,
    pub(crate) handlers: HandlerMap,
    pub(crate) reactions: Option<ReactionsFn>,
    pub(crate) sagas: Option<SagasFn>,
    pub(crate) thunks: BTreeMap<String, Thunk>,
}

impl ModuleDraft {
    /// Module name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initial state of the slice
    #[must_use]
    pub const fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Names this module injects
    #[must_use]
    pub fn inject(&self) -> &[String] {
        &self.inject
    }

    /// Action types
    #[must_use]
    pub fn types(&self) -> &Types {
        &self.types
    }

    /// Action creators
    #[must_use]
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Selectors
    #[must_use]
    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    /// The handle other modules receive when injecting this one
    #[must_use]
    pub fn handle(&self) -> Dependency {
        Dependency {
            types: Arc::clone(&self.types),
            actions: Arc::clone(&self.actions),
            selectors: Arc::clone(&self.selectors),
        }
    }

    /// Resolve the module with the default [`RegistryConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependency`] if `deps` lacks an injected
    /// module, or any error raised by the reactions or sagas factories.
    pub fn with_dependencies(self, deps: Dependencies) -> Result<Module> {
        compose::compose(self, deps, &RegistryConfig::default())
    }
}

impl fmt::Debug for ModuleDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDraft")
            .field("name", &self.name)
            .field("inject", &self.inject)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}

/// A fully resolved module
#[derive(Clone)]
pub struct Module {
    pub(crate) name: String,
    pub(crate) initial_state: State,
    pub(crate) inject: Vec<String>,
    pub(crate) types: Arc<Types>,
    pub(crate) actions: Arc<Actions>,
    pub(crate) selectors: Arc<Selectors>,
    pub(crate) reducer: Arc<ModuleReducer>,
    pub(crate) sagas: Vec<Saga>,
    pub(crate) thunks: BTreeMap<String, Thunk>,
    pub(crate) thunk_context: Arc<ThunkContext>,
}

impl Module {
    /// Module name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initial state of the slice
    #[must_use]
    pub const fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Names of the injected modules
    #[must_use]
    pub fn inject(&self) -> &[String] {
        &self.inject
    }

    /// Action types
    #[must_use]
    pub fn types(&self) -> &Types {
        &self.types
    }

    /// Action creators
    #[must_use]
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Selectors
    #[must_use]
    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    /// The compiled reducer
    #[must_use]
    pub fn reducer(&self) -> SharedReducer {
        Arc::clone(&self.reducer) as SharedReducer
    }

    /// The compiled reducer with its handler introspection
    #[must_use]
    pub fn module_reducer(&self) -> &ModuleReducer {
        &self.reducer
    }

    /// Saga descriptors for the effect runtime
    #[must_use]
    pub fn sagas(&self) -> &[Saga] {
        &self.sagas
    }

    /// The handle other modules receive when injecting this one
    #[must_use]
    pub fn handle(&self) -> Dependency {
        Dependency {
            types: Arc::clone(&self.types),
            actions: Arc::clone(&self.actions),
            selectors: Arc::clone(&self.selectors),
        }
    }

    /// Names of the bound thunks
    pub fn thunk_names(&self) -> impl Iterator<Item = &str> {
        self.thunks.keys().map(String::as_str)
    }

    /// Invoke a thunk, producing the effect it wants run
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownThunk`] if no thunk has that name.
    pub fn thunk(&self, name: &str, arg: Option<Value>) -> Result<Effect> {
        let thunk = self.thunks.get(name).ok_or_else(|| Error::UnknownThunk {
            module: self.name.clone(),
            thunk: name.to_string(),
        })?;
        Ok(thunk(arg, &self.thunk_context))
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("inject", &self.inject)
            .field("types", &self.types)
            .field("reducer", &self.reducer)
            .field("sagas", &self.sagas)
            .field("thunks", &self.thunks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
