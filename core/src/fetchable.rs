//! The fetchable convention for asynchronous request lifecycles.
//!
//! A fetchable state field holds `{ data, status, error }`. A fetchable
//! action expands into five action types and the handlers driving the field
//! through its lifecycle:
//!
//! ```text
//! INITIAL --loading--> LOADING --success--> SUCCESS
//!                      LOADING --failure--> FAILURE
//! any     --clear----> INITIAL
//! ```
//!
//! `init` is generated without a default handler so callers can declare a
//! request without marking it as loading.
//!
//! # Example
//!
//! ```
//! use reducktion_core::fetchable;
//! use serde_json::json;
//!
//! assert_eq!(
//!     fetchable::value(json!([])),
//!     json!({ "data": [], "status": "INITIAL", "error": null })
//! );
//!
//! let spec = fetchable::action("orders").on_loading(|state, _| {
//!     let mut next = state.clone();
//!     next["spinner"] = json!(true);
//!     next
//! });
//! assert_eq!(spec.success_field(), Some("orders"));
//! ```

use crate::action::{Action, ActionCreator, action_type};
use crate::composition::reduce_reducers;
use crate::error::{Error, Result};
use crate::reducer::{Handler, handler};
use crate::State;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;

/// State key under which tracked (field-less) fetchable actions live
pub const ACTIONS_KEY: &str = "actions";

/// Lifecycle status of a fetchable value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchableStatus {
    /// Nothing requested yet
    #[default]
    Initial,
    /// Request in flight
    Loading,
    /// Last request succeeded
    Success,
    /// Last request failed
    Failure,
}

impl FetchableStatus {
    /// The wire representation, e.g. `"LOADING"`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Loading => "LOADING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for FetchableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a fetchable state field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchableValue<T = Value> {
    /// Last successfully loaded data (kept on failure)
    pub data: T,
    /// Lifecycle status
    pub status: FetchableStatus,
    /// Error payload of the last failure, `null` otherwise
    pub error: Value,
}

impl<T> FetchableValue<T> {
    /// A value that has not been requested yet
    pub const fn initial(data: T) -> Self {
        Self {
            data,
            status: FetchableStatus::Initial,
            error: Value::Null,
        }
    }

    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.status == FetchableStatus::Loading
    }

    /// Whether the last request failed
    pub fn has_failed(&self) -> bool {
        self.status == FetchableStatus::Failure
    }
}

impl<T: for<'de> Deserialize<'de>> FetchableValue<T> {
    /// Read a fetchable field out of a JSON state value
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if `value` does not have the
    /// `{ data, status, error }` shape.
    pub fn from_state(value: &Value) -> std::result::Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Status of a tracked action that has no data field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionStatus {
    /// Lifecycle status
    pub status: FetchableStatus,
    /// Error payload of the last failure, `null` otherwise
    pub error: Value,
}

impl ActionStatus {
    /// JSON form of an untracked action: `{ status: INITIAL, error: null }`
    #[must_use]
    pub fn initial_json() -> Value {
        json!({ "status": FetchableStatus::Initial, "error": Value::Null })
    }
}

/// The initial JSON form of a fetchable field: `{ data, status: "INITIAL", error: null }`
#[must_use]
pub fn value(data: Value) -> Value {
    json!({
        "data": data,
        "status": FetchableStatus::Initial,
        "error": Value::Null,
    })
}

/// Merges success payloads into previous data: `(prev_data, action) -> new_data`
pub type DataUpdater = Arc<dyn Fn(&Value, &Action) -> Value + Send + Sync>;

/// Extra handlers spliced in after the default handler of each stage
#[derive(Clone, Default)]
pub struct Overrides {
    loading: Option<Handler>,
    success: Option<Handler>,
    failure: Option<Handler>,
    clear: Option<Handler>,
}

impl Overrides {
    fn is_empty(&self) -> bool {
        self.loading.is_none() && self.success.is_none() && self.failure.is_none() && self.clear.is_none()
    }
}

/// Description of a fetchable action, turned into types, creators and
/// handlers when the owning module is built
#[derive(Clone, Default)]
pub struct FetchableSpec {
    success_field: Option<String>,
    overrides: Overrides,
    data_updater: Option<DataUpdater>,
}

/// Fetchable action storing its data in `field`
#[must_use]
pub fn action(field: impl Into<String>) -> FetchableSpec {
    FetchableSpec {
        success_field: Some(field.into()),
        ..FetchableSpec::default()
    }
}

/// Fetchable action tracked under `state.actions[<name>]`, without data.
///
/// At least one override must be added before the module is built.
#[must_use]
pub fn tracked() -> FetchableSpec {
    FetchableSpec::default()
}

impl FetchableSpec {
    /// Field receiving the success payload, if any
    #[must_use]
    pub fn success_field(&self) -> Option<&str> {
        self.success_field.as_deref()
    }

    /// Run `f` after the default `loading` handler
    #[must_use]
    pub fn on_loading<F>(mut self, f: F) -> Self
    where
        F: Fn(&State, &Action) -> State + Send + Sync + 'static,
    {
        self.overrides.loading = Some(handler(f));
        self
    }

    /// Run `f` after the default `success` handler
    #[must_use]
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&State, &Action) -> State + Send + Sync + 'static,
    {
        self.overrides.success = Some(handler(f));
        self
    }

    /// Run `f` after the default `failure` handler
    #[must_use]
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&State, &Action) -> State + Send + Sync + 'static,
    {
        self.overrides.failure = Some(handler(f));
        self
    }

    /// Run `f` after the default `clear` handler
    #[must_use]
    pub fn on_clear<F>(mut self, f: F) -> Self
    where
        F: Fn(&State, &Action) -> State + Send + Sync + 'static,
    {
        self.overrides.clear = Some(handler(f));
        self
    }

    /// Compute the new data on success instead of replacing it with the payload
    #[must_use]
    pub fn data_updater<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        self.data_updater = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FetchableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchableSpec")
            .field("success_field", &self.success_field)
            .field("has_loading_override", &self.overrides.loading.is_some())
            .field("has_success_override", &self.overrides.success.is_some())
            .field("has_failure_override", &self.overrides.failure.is_some())
            .field("has_clear_override", &self.overrides.clear.is_some())
            .field("has_data_updater", &self.data_updater.is_some())
            .finish()
    }
}

/// The five action types of one fetchable action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchableTypes {
    /// `<module>/<action>`
    pub loading: String,
    /// `<module>/<action>/init`
    pub init: String,
    /// `<module>/<action>/success`
    pub success: String,
    /// `<module>/<action>/failure`
    pub failure: String,
    /// `<module>/<action>/clear`
    pub clear: String,
}

impl FetchableTypes {
    /// Derive the types for `action` in `module`
    #[must_use]
    pub fn new(module: &str, action: &str) -> Self {
        let prefix = action_type(module, action);
        Self {
            init: format!("{prefix}/init"),
            success: format!("{prefix}/success"),
            failure: format!("{prefix}/failure"),
            clear: format!("{prefix}/clear"),
            loading: prefix,
        }
    }

    /// `(types key, action type)` pairs as exposed in a module's `Types`
    #[must_use]
    pub fn keyed(&self, action: &str) -> [(String, String); 5] {
        [
            (action.to_string(), self.loading.clone()),
            (format!("{action}Init"), self.init.clone()),
            (format!("{action}Success"), self.success.clone()),
            (format!("{action}Failure"), self.failure.clone()),
            (format!("{action}Clear"), self.clear.clone()),
        ]
    }
}

/// Action creator bundle of a fetchable action
///
/// The bundle itself creates `loading` actions; `init`, `success`, `fail`
/// and `clear` create the other lifecycle actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchableActionCreator {
    loading: ActionCreator,
    init: ActionCreator,
    success: ActionCreator,
    fail: ActionCreator,
    clear: ActionCreator,
}

impl FetchableActionCreator {
    /// Creators for the given types
    #[must_use]
    pub fn new(types: &FetchableTypes) -> Self {
        Self {
            loading: ActionCreator::new(types.loading.clone()),
            init: ActionCreator::new(types.init.clone()),
            success: ActionCreator::new(types.success.clone()),
            fail: ActionCreator::new(types.failure.clone()),
            clear: ActionCreator::new(types.clear.clone()),
        }
    }

    /// The loading creator
    #[must_use]
    pub const fn loading(&self) -> &ActionCreator {
        &self.loading
    }

    /// A loading action without payload
    #[must_use]
    pub fn call(&self) -> Action {
        self.loading.call()
    }

    /// A loading action with an optional payload (e.g. request parameters)
    #[must_use]
    pub fn create(&self, payload: Option<Value>) -> Action {
        self.loading.create(payload)
    }

    /// An `init` action
    #[must_use]
    pub fn init(&self) -> Action {
        self.init.call()
    }

    /// A `success` action carrying the loaded data
    #[must_use]
    pub fn success(&self, data: Value) -> Action {
        self.success.with(data)
    }

    /// A `failure` action carrying the error
    #[must_use]
    pub fn fail(&self, error: Value) -> Action {
        self.fail.with(error)
    }

    /// A `clear` action
    #[must_use]
    pub fn clear(&self) -> Action {
        self.clear.call()
    }
}

/// Types, creator and handlers produced for one fetchable action
pub(crate) struct FetchableParts {
    pub(crate) types: FetchableTypes,
    pub(crate) creator: FetchableActionCreator,
    pub(crate) handlers: Vec<(String, Handler)>,
}

/// Expand a fetchable spec for `action` of `module`.
pub(crate) fn expand(
    module: &str,
    action: &str,
    spec: FetchableSpec,
    initial_state: &State,
) -> Result<FetchableParts> {
    let FetchableSpec {
        success_field,
        overrides,
        data_updater,
    } = spec;

    let types = FetchableTypes::new(module, action);
    let creator = FetchableActionCreator::new(&types);

    let defaults = match success_field {
        Some(field) => {
            // A field absent from the initial state starts with null data
            let initial_data = initial_state
                .get(&field)
                .and_then(|entry| entry.get("data"))
                .cloned()
                .unwrap_or(Value::Null);
            field_handlers(&field, initial_data, data_updater)
        },
        None if overrides.is_empty() => {
            return Err(Error::MissingSuccessField {
                module: module.to_string(),
                action: action.to_string(),
            });
        },
        None => tracked_handlers(action),
    };

    let Overrides {
        loading,
        success,
        failure,
        clear,
    } = overrides;

    let handlers = [
        (&types.loading, defaults.loading, loading),
        (&types.success, defaults.success, success),
        (&types.failure, defaults.failure, failure),
        (&types.clear, defaults.clear, clear),
    ]
    .into_iter()
    .map(|(action_type, default, extra)| {
        let stage = match extra {
            Some(extra) => reduce_reducers([default, extra]),
            None => default,
        };
        (action_type.clone(), stage)
    })
    .collect();

    Ok(FetchableParts {
        types,
        creator,
        handlers,
    })
}

struct StageHandlers {
    loading: Handler,
    success: Handler,
    failure: Handler,
    clear: Handler,
}

fn field_handlers(field: &str, initial_data: Value, data_updater: Option<DataUpdater>) -> StageHandlers {
    let loading = {
        let field = field.to_string();
        handler(move |state, _| {
            let mut entry = object_at(state, &field);
            entry.insert("status".into(), json!(FetchableStatus::Loading));
            entry.insert("error".into(), Value::Null);
            with_key(state, &field, Value::Object(entry))
        })
    };

    let success = {
        let field = field.to_string();
        handler(move |state, action| {
            let data = match &data_updater {
                Some(update) => {
                    let previous = state.get(&field).and_then(|f| f.get("data")).unwrap_or(&Value::Null);
                    update(previous, action)
                },
                None => action.payload_or_null(),
            };
            let entry = json!({ "data": data, "status": FetchableStatus::Success, "error": Value::Null });
            with_key(state, &field, entry)
        })
    };

    let failure = {
        let field = field.to_string();
        handler(move |state, action| {
            let mut entry = object_at(state, &field);
            entry.insert("status".into(), json!(FetchableStatus::Failure));
            entry.insert("error".into(), action.payload_or_null());
            with_key(state, &field, Value::Object(entry))
        })
    };

    let clear = {
        let field = field.to_string();
        handler(move |state, _| with_key(state, &field, value(initial_data.clone())))
    };

    StageHandlers {
        loading,
        success,
        failure,
        clear,
    }
}

fn tracked_handlers(action: &str) -> StageHandlers {
    let track = |status: FetchableStatus, with_error: bool| {
        let name = action.to_string();
        handler(move |state, action| {
            let error = if with_error { action.payload_or_null() } else { Value::Null };
            let mut tracked = object_at(state, ACTIONS_KEY);
            tracked.insert(name.clone(), json!({ "status": status, "error": error }));
            with_key(state, ACTIONS_KEY, Value::Object(tracked))
        })
    };

    StageHandlers {
        loading: track(FetchableStatus::Loading, false),
        success: track(FetchableStatus::Success, false),
        failure: track(FetchableStatus::Failure, true),
        clear: track(FetchableStatus::Initial, false),
    }
}

/// Clone of the object stored at `key`, or an empty object
fn object_at(state: &State, key: &str) -> Map<String, Value> {
    match state.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Copy of `state` with `key` set to `value`
fn with_key(state: &State, key: &str, value: Value) -> State {
    let mut next = match state {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    next.insert(key.to_string(), value);
    Value::Object(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parts(spec: FetchableSpec, initial: &State) -> BTreeMap<String, Handler> {
        match expand("test", "fetchOrders", spec, initial) {
            Ok(parts) => parts.handlers.into_iter().collect(),
            Err(e) => unreachable!("expansion failed: {e}"),
        }
    }

    #[test]
    fn test_value_shape() {
        assert_eq!(value(json!([])), json!({ "data": [], "status": "INITIAL", "error": null }));
        assert_eq!(value(Value::Null)["data"], Value::Null);
    }

    #[test]
    fn test_types_and_creators() {
        let types = FetchableTypes::new("test", "testAction");
        assert_eq!(types.loading, "test/testAction");
        assert_eq!(types.init, "test/testAction/init");
        assert_eq!(types.success, "test/testAction/success");
        assert_eq!(types.failure, "test/testAction/failure");
        assert_eq!(types.clear, "test/testAction/clear");

        let creator = FetchableActionCreator::new(&types);
        assert_eq!(creator.call(), Action::new("test/testAction"));
        assert_eq!(creator.init(), Action::new("test/testAction/init"));
        assert_eq!(creator.success(json!([1])), Action::new("test/testAction/success").with_payload(json!([1])));
        assert_eq!(creator.fail(json!("boom")), Action::new("test/testAction/failure").with_payload(json!("boom")));
        assert_eq!(creator.clear(), Action::new("test/testAction/clear"));
    }

    #[test]
    fn test_lifecycle_for_field() {
        let initial = json!({ "orders": value(json!([])) });
        let handlers = parts(action("orders"), &initial);
        assert!(!handlers.contains_key("test/fetchOrders/init"));

        let loading = handlers["test/fetchOrders"](&initial, &Action::new("test/fetchOrders"));
        assert_eq!(loading["orders"], json!({ "data": [], "status": "LOADING", "error": null }));

        let success = handlers["test/fetchOrders/success"](
            &loading,
            &Action::new("test/fetchOrders/success").with_payload(json!([{ "id": 1 }])),
        );
        assert_eq!(success["orders"], json!({ "data": [{ "id": 1 }], "status": "SUCCESS", "error": null }));

        let failure = handlers["test/fetchOrders/failure"](
            &success,
            &Action::new("test/fetchOrders/failure").with_payload(json!("offline")),
        );
        assert_eq!(failure["orders"], json!({ "data": [{ "id": 1 }], "status": "FAILURE", "error": "offline" }));

        let cleared = handlers["test/fetchOrders/clear"](&failure, &Action::new("test/fetchOrders/clear"));
        assert_eq!(cleared["orders"], value(json!([])));
    }

    #[test]
    fn test_data_updater_merges() {
        let initial = json!({ "orders": value(json!([1])) });
        let spec = action("orders").data_updater(|prev, action| {
            let mut merged = prev.as_array().cloned().unwrap_or_default();
            merged.extend(action.payload_or_null().as_array().cloned().unwrap_or_default());
            Value::Array(merged)
        });
        let handlers = parts(spec, &initial);
        let next = handlers["test/fetchOrders/success"](
            &initial,
            &Action::new("test/fetchOrders/success").with_payload(json!([2, 3])),
        );
        assert_eq!(next["orders"]["data"], json!([1, 2, 3]));
        assert_eq!(next["orders"]["status"], "SUCCESS");
    }

    #[test]
    fn test_overrides_run_after_defaults() {
        let initial = json!({ "orders": value(json!([])) });
        let spec = action("orders").on_loading(|state, _| {
            let mut next = state.clone();
            next["observed"] = state["orders"]["status"].clone();
            next
        });
        let handlers = parts(spec, &initial);
        let next = handlers["test/fetchOrders"](&initial, &Action::new("test/fetchOrders"));
        assert_eq!(next["observed"], "LOADING");
    }

    #[test]
    fn test_tracked_action_status() {
        let initial = json!({});
        let spec = tracked().on_failure(|state, _| {
            let mut next = state.clone();
            next["failures"] = json!(state["failures"].as_u64().unwrap_or(0) + 1);
            next
        });
        let handlers = parts(spec, &initial);

        let loading = handlers["test/fetchOrders"](&initial, &Action::new("test/fetchOrders"));
        assert_eq!(loading["actions"]["fetchOrders"], json!({ "status": "LOADING", "error": null }));

        let failed = handlers["test/fetchOrders/failure"](
            &loading,
            &Action::new("test/fetchOrders/failure").with_payload(json!("nope")),
        );
        assert_eq!(failed["actions"]["fetchOrders"], json!({ "status": "FAILURE", "error": "nope" }));
        assert_eq!(failed["failures"], 1);

        let cleared = handlers["test/fetchOrders/clear"](&failed, &Action::new("test/fetchOrders/clear"));
        assert_eq!(cleared["actions"]["fetchOrders"], ActionStatus::initial_json());
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let result = expand("test", "fetchOrders", tracked(), &json!({}));
        assert!(matches!(result, Err(Error::MissingSuccessField { .. })));
    }

    #[test]
    fn test_field_absent_from_state_starts_null() {
        let handlers = parts(action("orders"), &json!({}));

        let loaded = handlers["test/fetchOrders/success"](&json!({}), &Action::new("test/fetchOrders/success").with_payload(json!([1])));
        assert_eq!(loaded["orders"], json!({ "data": [1], "status": "SUCCESS", "error": null }));

        let cleared = handlers["test/fetchOrders/clear"](&loaded, &Action::new("test/fetchOrders/clear"));
        assert_eq!(cleared["orders"], value(Value::Null));
    }

    #[test]
    fn test_typed_view() {
        let parsed = FetchableValue::<Vec<u32>>::from_state(&json!({ "data": [1, 2], "status": "LOADING", "error": null }));
        let Ok(parsed) = parsed else {
            unreachable!("valid fetchable json");
        };
        assert!(parsed.is_loading());
        assert_eq!(parsed.data, vec![1, 2]);
        assert_eq!(serde_json::to_value(FetchableValue::initial(json!([]))).ok(), Some(value(json!([]))));
    }
}
