//! # Reducktion Core
//!
//! Self-contained state modules ("ducks") for a Redux-style store.
//!
//! A module bundles everything one slice of application state needs:
//! namespaced action types, action creators, a reducer, selectors and
//! background workflows (sagas). Modules may depend on each other by name;
//! dependencies are resolved in a second phase once every module is
//! registered, so mutually dependent modules work regardless of the order
//! they are declared in.
//!
//! ## Core Concepts
//!
//! - **State**: a JSON value; each module owns one top-level slice
//! - **Action**: `{type, payload?, ...meta}` with `type = "<module>/<action>"`
//! - **Reducer**: pure `(state, action) → state`, identity on unknown types
//! - **Fetchable**: `{data, status, error}` with five generated action types
//! - **Reaction**: a handler in one module for another module's action type
//! - **Effect**: a description of work for the runtime, never executed here
//!
//! ## Lifecycle
//!
//! 1. [`ModuleDefinition::build`] validates the definition and produces a
//!    [`ModuleDraft`] with types, action creators and selectors.
//! 2. [`register`] (or [`ModuleDraft::with_dependencies`]) resolves injected
//!    names and compiles reducers and sagas into a [`Module`].
//!
//! ## Example
//!
//! ```
//! use reducktion_core::{ActionMap, ModuleDefinition, Reducer, register};
//! use serde_json::json;
//!
//! let settings = ModuleDefinition::new("settings")
//!     .state(json!({ "gpsEnabled": false }))
//!     .actions(|_| {
//!         ActionMap::new().reducer("toggleGps", |state, _| {
//!             let enabled = state["gpsEnabled"].as_bool().unwrap_or(false);
//!             json!({ "gpsEnabled": !enabled })
//!         })
//!     })
//!     .build()?;
//!
//! let registry = register(vec![settings])?;
//! let toggle = registry.module("settings")?.actions().create("toggleGps", None)?;
//!
//! let root = registry.root_reducer();
//! let next = root.reduce(&registry.initial_state(), &toggle);
//! assert_eq!(next, json!({ "settings": { "gpsEnabled": true } }));
//! # Ok::<(), reducktion_core::Error>(())
//! ```

pub mod action;
mod compose;
pub mod composition;
pub mod config;
pub mod effect;
mod effect_macros;
pub mod error;
pub mod fetchable;
pub mod module;
pub mod reducer;
pub mod registry;
pub mod resolver;
pub mod selectors;

/// Root and slice state
pub type State = serde_json::Value;

pub use action::{Action, ActionCreator, ActionEntry, Actions, Types, action_type};
pub use composition::{CombinedReducer, combine_reducers, merge_handlers, reduce_reducers};
pub use config::{ConfigError, ConflictPolicy, CyclePolicy, RegistryConfig};
pub use effect::{Effect, Saga, TakeMode, Worker, take_every, take_latest};
pub use error::{Error, Result};
pub use fetchable::{FetchableActionCreator, FetchableSpec, FetchableStatus, FetchableTypes, FetchableValue};
pub use module::{
    ActionKind, ActionMap, ActionsContext, Module, ModuleDefinition, ModuleDraft, ReactionContext, ReactionMap,
    SagaContext, Thunk, ThunkContext,
};
pub use reducer::{Handler, HandlerMap, ModuleReducer, Reducer, SharedReducer, handler};
pub use registry::{ModuleRegistry, Registry, register};
pub use resolver::{Dependencies, Dependency};
pub use selectors::{Selector, SelectorContext, Selectors, memoize, selector};
