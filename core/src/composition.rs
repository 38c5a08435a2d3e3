//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`reduce_reducers`**: Run several handlers on the same state, in order
//! - **`merge_handlers`**: Merge own handlers with reaction handlers
//! - **`combine_reducers`**: Give each reducer its own key of a root object
//!
//! # Examples
//!
//! ## Combining Reducers
//!
//! ```
//! use reducktion_core::composition::combine_reducers;
//! use reducktion_core::reducer::{handler, HandlerMap, ModuleReducer, SharedReducer};
//! use reducktion_core::{Action, Reducer};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! let mut handlers = HandlerMap::new();
//! handlers.insert("settings/toggle".to_string(), handler(|state, _| {
//!     json!({ "enabled": !state["enabled"].as_bool().unwrap_or(false) })
//! }));
//! let settings: SharedReducer =
//!     Arc::new(ModuleReducer::new("settings", json!({ "enabled": false }), handlers));
//!
//! let mut reducers = BTreeMap::new();
//! reducers.insert("settings".to_string(), settings);
//! let root = combine_reducers(reducers);
//!
//! let state = root.reduce(&root.initial_state(), &Action::new("settings/toggle"));
//! assert_eq!(state, json!({ "settings": { "enabled": true } }));
//! ```

use crate::action::Action;
use crate::config::ConflictPolicy;
use crate::error::{Error, Result};
use crate::reducer::{Handler, HandlerMap, Reducer, SharedReducer};
use crate::State;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Combines several handlers that operate on the same state.
///
/// Each handler receives the state produced by the previous one, so later
/// handlers observe (and may refine) what earlier handlers did.
///
/// # Examples
///
/// ```
/// use reducktion_core::composition::reduce_reducers;
/// use reducktion_core::reducer::handler;
/// use reducktion_core::Action;
/// use serde_json::json;
///
/// let combined = reduce_reducers([
///     handler(|_, _| json!({ "status": "LOADING" })),
///     handler(|state, _| {
///         let mut next = state.clone();
///         next["spinner"] = json!(true);
///         next
///     }),
/// ]);
///
/// let state = combined(&json!({}), &Action::new("orders/fetch"));
/// assert_eq!(state, json!({ "status": "LOADING", "spinner": true }));
/// ```
pub fn reduce_reducers<I>(handlers: I) -> Handler
where
    I: IntoIterator<Item = Handler>,
{
    let chain: SmallVec<[Handler; 4]> = handlers.into_iter().collect();

    Arc::new(move |state: &State, action: &Action| {
        chain
            .iter()
            .fold(state.clone(), |next, handler| handler(&next, action))
    })
}

/// Merges a module's own handlers with reaction handlers keyed by
/// (possibly foreign) action types.
///
/// When both maps contain the same type, `policy` decides: the reaction
/// replaces the own handler, or the merge fails with
/// [`Error::HandlerConflict`].
///
/// # Errors
///
/// Returns [`Error::HandlerConflict`] under [`ConflictPolicy::Reject`] when
/// a key appears in both maps.
pub fn merge_handlers(
    module: &str,
    own: HandlerMap,
    reactions: HandlerMap,
    policy: ConflictPolicy,
) -> Result<HandlerMap> {
    let mut merged = own;

    for (action_type, reaction) in reactions {
        if merged.contains_key(&action_type) {
            match policy {
                ConflictPolicy::ReactionWins => {
                    tracing::warn!(
                        module,
                        action_type = %action_type,
                        "Reaction shadows an own handler for the same action type"
                    );
                },
                ConflictPolicy::Reject => {
                    return Err(Error::HandlerConflict {
                        module: module.to_string(),
                        action_type,
                    });
                },
            }
        }
        merged.insert(action_type, reaction);
    }

    Ok(merged)
}

/// Gives each reducer its own key of a root state object.
///
/// Equivalent of `combineReducers`: every action is offered to every
/// reducer together with that reducer's slice.
#[must_use]
pub fn combine_reducers(reducers: BTreeMap<String, SharedReducer>) -> CombinedReducer {
    CombinedReducer { reducers }
}

/// A root reducer that routes each key of the state to its own reducer.
///
/// Created by [`combine_reducers`].
#[derive(Clone)]
pub struct CombinedReducer {
    reducers: BTreeMap<String, SharedReducer>,
}

impl CombinedReducer {
    /// Keys managed by this reducer
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.reducers.keys().map(String::as_str)
    }

    /// Number of combined reducers
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether no reducers were combined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl fmt::Debug for CombinedReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("keys", &self.reducers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Reducer for CombinedReducer {
    fn initial_state(&self) -> State {
        let root: Map<String, Value> = self
            .reducers
            .iter()
            .map(|(key, reducer)| (key.clone(), reducer.initial_state()))
            .collect();
        Value::Object(root)
    }

    fn reduce(&self, state: &State, action: &Action) -> State {
        // Keys the reducers do not manage are carried over untouched
        let mut root = match state {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        for (key, reducer) in &self.reducers {
            let next = match root.get(key) {
                Some(slice) => reducer.reduce(slice, action),
                None => reducer.reduce(&reducer.initial_state(), action),
            };
            root.insert(key.clone(), next);
        }

        Value::Object(root)
    }
}
