//! Per-module selector namespaces.
//!
//! Selectors read from the *root* state (the object holding every module's
//! slice under its name). Each module gets:
//!
//! - `get(field)`: reads `root[module][field]`, failing on every call where
//!   the field is absent (fields may legitimately appear later)
//! - `get_action(name)`: reads the status of a tracked fetchable action
//! - `get<Field>` accessors derived from the initial state
//! - user-defined selectors, which may compose the ones above

use crate::error::{Error, Result};
use crate::fetchable::{ACTIONS_KEY, ActionStatus};
use crate::State;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A selector: root state → selected value
pub type Selector = Arc<dyn Fn(&State) -> Result<Value> + Send + Sync>;

/// Selector name → selector
pub type SelectorMap = BTreeMap<String, Selector>;

/// Wrap a closure as a [`Selector`].
pub fn selector<F>(f: F) -> Selector
where
    F: Fn(&State) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What user-defined selector factories receive
#[derive(Debug, Clone, Copy)]
pub struct SelectorContext<'a> {
    /// Name of the module (the key of its slice in the root state)
    pub name: &'a str,
    /// Selectors registered so far (`get`, `get_action`, derived accessors)
    pub selectors: &'a Selectors,
}

/// The slice of `module` inside the root state.
///
/// # Errors
///
/// Returns [`Error::MissingSlice`] if the root has no object under `module`.
pub fn slice<'a>(root: &'a State, module: &str) -> Result<&'a Map<String, Value>> {
    root.get(module)
        .and_then(Value::as_object)
        .ok_or_else(|| Error::MissingSlice {
            module: module.to_string(),
        })
}

/// Selector namespace of one module
#[derive(Clone)]
pub struct Selectors {
    module: String,
    named: SelectorMap,
}

impl Selectors {
    /// Namespace with a `get<Field>` accessor per field of `initial_state`
    pub(crate) fn new(module: &str, initial_state: &State) -> Self {
        let mut selectors = Self {
            module: module.to_string(),
            named: SelectorMap::new(),
        };

        if let Some(fields) = initial_state.as_object() {
            for field in fields.keys() {
                let accessor = selectors.get(field);
                selectors.named.insert(format!("get{}", capitalize(field)), accessor);
            }
        }

        selectors
    }

    /// Add user-defined selectors; same-named derived accessors are replaced
    pub(crate) fn extend(&mut self, user_defined: SelectorMap) {
        self.named.extend(user_defined);
    }

    /// Owning module
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Selector reading `root[module][field]`.
    ///
    /// The returned selector fails with [`Error::NonExistentField`] whenever
    /// the field is absent from the slice at call time.
    #[must_use]
    pub fn get(&self, field: &str) -> Selector {
        let module = self.module.clone();
        let field = field.to_string();
        selector(move |root| {
            slice(root, &module)?
                .get(&field)
                .cloned()
                .ok_or_else(|| Error::NonExistentField {
                    module: module.clone(),
                    field: field.clone(),
                })
        })
    }

    /// Selector reading the status of a tracked action, defaulting to
    /// `{ status: INITIAL, error: null }` when untracked
    #[must_use]
    pub fn get_action(&self, action: &str) -> Selector {
        let module = self.module.clone();
        let action = action.to_string();
        selector(move |root| {
            let tracked = slice(root, &module)?
                .get(ACTIONS_KEY)
                .and_then(|actions| actions.get(&action))
                .cloned();
            Ok(tracked.unwrap_or_else(ActionStatus::initial_json))
        })
    }

    /// A named selector
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Selector> {
        self.named.get(name)
    }

    /// A named selector, failing if it does not exist
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSelector`] if no selector has that name.
    pub fn require(&self, name: &str) -> Result<&Selector> {
        self.named(name).ok_or_else(|| Error::UnknownSelector {
            module: self.module.clone(),
            selector: name.to_string(),
        })
    }

    /// Run a named selector against the root state
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSelector`] for unknown names, or whatever the
    /// selector itself reports.
    pub fn select(&self, name: &str, root: &State) -> Result<Value> {
        self.require(name)?(root)
    }

    /// Names of all named selectors, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

impl fmt::Debug for Selectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selectors")
            .field("module", &self.module)
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Derived selector recomputed only when its inputs change.
///
/// Inputs are evaluated on every call; `combiner` runs only when the input
/// values differ from the previous call.
///
/// # Example
///
/// ```
/// use reducktion_core::selectors::{memoize, selector};
/// use serde_json::json;
///
/// let count = selector(|root| Ok(root["cart"]["items"].clone()));
/// let total = memoize(vec![count], |inputs| {
///     json!(inputs[0].as_array().map_or(0, Vec::len))
/// });
///
/// let root = json!({ "cart": { "items": [1, 2, 3] } });
/// assert_eq!(total(&root).ok(), Some(json!(3)));
/// ```
pub fn memoize<F>(inputs: Vec<Selector>, combiner: F) -> Selector
where
    F: Fn(&[Value]) -> Value + Send + Sync + 'static,
{
    let cache: Mutex<Option<(Vec<Value>, Value)>> = Mutex::new(None);

    selector(move |root| {
        let values = inputs
            .iter()
            .map(|input| input(root))
            .collect::<Result<Vec<_>>>()?;

        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((previous, result)) = cache.as_ref() {
            if *previous == values {
                return Ok(result.clone());
            }
        }

        let result = combiner(&values);
        *cache = Some((values, result.clone()));
        Ok(result)
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
