//! The reducer abstraction and handler maps.
//!
//! Reducers are pure functions `(state, action) -> state`. The surrounding
//! store may call them several times for the same input (replay, devtools),
//! so handlers must not perform side effects.

use crate::action::Action;
use crate::State;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A single action handler: `(state, action) -> new state`
pub type Handler = Arc<dyn Fn(&State, &Action) -> State + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&State, &Action) -> State + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Action type → handler
pub type HandlerMap = BTreeMap<String, Handler>;

/// The Reducer trait - a pure state transition with a known initial state
///
/// # Example
///
/// ```
/// use reducktion_core::{Action, Reducer, State};
/// use serde_json::json;
///
/// struct Counter;
///
/// impl Reducer for Counter {
///     fn initial_state(&self) -> State {
///         json!({ "count": 0 })
///     }
///
///     fn reduce(&self, state: &State, action: &Action) -> State {
///         if action.is("counter/increment") {
///             json!({ "count": state["count"].as_i64().unwrap_or(0) + 1 })
///         } else {
///             state.clone()
///         }
///     }
/// }
///
/// let next = Counter.reduce(&Counter.initial_state(), &Action::new("counter/increment"));
/// assert_eq!(next, json!({ "count": 1 }));
/// ```
pub trait Reducer: Send + Sync {
    /// State used when the container has no state for this reducer yet
    fn initial_state(&self) -> State;

    /// Reduce an action into the next state
    fn reduce(&self, state: &State, action: &Action) -> State;
}

/// A shared, type-erased reducer
pub type SharedReducer = Arc<dyn Reducer>;

impl<R: Reducer + ?Sized> Reducer for Arc<R> {
    fn initial_state(&self) -> State {
        (**self).initial_state()
    }

    fn reduce(&self, state: &State, action: &Action) -> State {
        (**self).reduce(state, action)
    }
}

/// The compiled reducer of a module
///
/// Looks up `action.type` in its handler map and applies the match;
/// unknown types return the state unchanged. A slice that is not an
/// object is replaced by the initial state first.
#[derive(Clone)]
pub struct ModuleReducer {
    module: String,
    initial_state: State,
    handlers: Arc<HandlerMap>,
}

impl ModuleReducer {
    /// Compile a handler map into a reducer
    #[must_use]
    pub fn new(module: impl Into<String>, initial_state: State, handlers: HandlerMap) -> Self {
        Self {
            module: module.into(),
            initial_state,
            handlers: Arc::new(handlers),
        }
    }

    /// Owning module
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Whether an action type has a handler
    #[must_use]
    pub fn handles(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Handled action types in order
    pub fn handled_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for ModuleReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleReducer")
            .field("module", &self.module)
            .field("handled_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Reducer for ModuleReducer {
    fn initial_state(&self) -> State {
        self.initial_state.clone()
    }

    fn reduce(&self, state: &State, action: &Action) -> State {
        // A missing or non-object slice starts from the initial state
        let state = if state.is_object() { state } else { &self.initial_state };
        match self.handlers.get(&action.action_type) {
            Some(handler) => handler(state, action),
            None => state.clone(),
        }
    }
}
