//! Error types for module construction, registration and selection.
//!
//! Every configuration problem is reported synchronously from
//! [`ModuleDefinition::build`](crate::module::ModuleDefinition::build) or
//! [`ModuleRegistry::register`](crate::registry::ModuleRegistry::register).
//! Selector misuse is reported when the selector runs, because field
//! existence depends on the state at that moment.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while declaring, registering or querying modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The module definition has no (or an empty) name
    #[error("Module should have a name")]
    MissingName,

    /// The module declares state but neither actions nor reactions
    #[error("Module '{module}' with state should have reducers (actions or reactions)")]
    StateWithoutReducers {
        /// Offending module
        module: String,
    },

    /// The module state is not a JSON object
    #[error("State of module '{module}' should be an object")]
    StateNotObject {
        /// Offending module
        module: String,
    },

    /// `inject` is not an array of dependency names
    #[error("Inject should be an array of dependency names (module '{module}')")]
    InjectNotArray {
        /// Offending module
        module: String,
    },

    /// `inject` contains a non-string entry
    #[error("Injected dependency names should be strings (module '{module}')")]
    InjectNotString {
        /// Offending module
        module: String,
    },

    /// `inject` contains an empty, duplicated or self-referencing name
    #[error("Invalid injected dependency '{dependency}' for module '{module}': {reason}")]
    InvalidInject {
        /// Offending module
        module: String,
        /// The rejected name
        dependency: String,
        /// Why it was rejected
        reason: String,
    },

    /// An injected name does not match any registered module
    #[error("There is no dependency called '{dependency}' for module '{module}'")]
    MissingDependency {
        /// The name that could not be resolved
        dependency: String,
        /// The module that requested it
        module: String,
    },

    /// A dependency handle was requested that the module never injected
    #[error("Module '{module}' did not inject a dependency called '{dependency}'")]
    NotInjected {
        /// The requested handle
        dependency: String,
        /// The module asking for it
        module: String,
    },

    /// Two modules were registered under the same name
    #[error("A module called '{module}' is already registered")]
    DuplicateModule {
        /// The duplicated name
        module: String,
    },

    /// Two action entries of one module share a key
    #[error("Action '{action}' is defined more than once in module '{module}'")]
    DuplicateAction {
        /// Offending module
        module: String,
        /// The duplicated action name
        action: String,
    },

    /// A fetchable action has neither a success field nor any override
    #[error(
        "You must provide the name of the field that is used for success payload \
         or at least one override (action '{action}' in module '{module}')"
    )]
    MissingSuccessField {
        /// Offending module
        module: String,
        /// The fetchable action
        action: String,
    },

    /// A `get` selector was invoked for a field the state slice lacks
    #[error("Tried to select a non-existent field '{field}' from module '{module}'")]
    NonExistentField {
        /// Module whose slice was read
        module: String,
        /// Requested field
        field: String,
    },

    /// The root state has no slice for the module
    #[error("Root state has no slice for module '{module}'")]
    MissingSlice {
        /// Module whose slice is missing
        module: String,
    },

    /// A named selector is not defined on the module
    #[error("Module '{module}' has no selector called '{selector}'")]
    UnknownSelector {
        /// Module queried
        module: String,
        /// Requested selector
        selector: String,
    },

    /// A named action type is not defined on the module
    #[error("Module '{module}' has no action type called '{action}'")]
    UnknownActionType {
        /// Module queried
        module: String,
        /// Requested key
        action: String,
    },

    /// A named action creator is not defined on the module
    #[error("Module '{module}' has no action called '{action}'")]
    UnknownAction {
        /// Module queried
        module: String,
        /// Requested action
        action: String,
    },

    /// A named thunk is not defined on the module
    #[error("Module '{module}' has no thunk called '{thunk}'")]
    UnknownThunk {
        /// Module queried
        module: String,
        /// Requested thunk
        thunk: String,
    },

    /// A module was looked up in the registry but never registered
    #[error("No module called '{module}' is registered")]
    UnknownModule {
        /// Requested module
        module: String,
    },

    /// A reaction handler shares an action type with an own handler
    #[error("Reaction for '{action_type}' collides with an own handler of module '{module}'")]
    HandlerConflict {
        /// Offending module
        module: String,
        /// The contested action type
        action_type: String,
    },

    /// Modules inject each other in a cycle and cycles are rejected
    #[error("Dependency cycle detected: {}", cycle.join(" -> "))]
    DependencyCycle {
        /// The modules forming the cycle, first repeated at the end
        cycle: Vec<String>,
    },
}
