//! Actions, action types and action creators.
//!
//! Every action a module declares gets a namespaced type `"<module>/<action>"`
//! and a creator producing the wire shape `{ "type", "payload"?, ...meta }`.

use crate::error::{Error, Result};
use crate::fetchable::FetchableActionCreator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Build the namespaced type for `action` in `module`.
#[must_use]
pub fn action_type(module: &str, action: &str) -> String {
    format!("{module}/{action}")
}

/// A tagged message describing a requested state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Namespaced action type
    #[serde(rename = "type")]
    pub action_type: String,

    /// Optional payload; an explicit `null` is kept as `Some(Value::Null)`
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Additional metadata fields, flattened next to `type`
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

/// Any value found under the key, `null` included; a missing key stays `None`
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Action {
    /// Create an action without payload
    #[must_use]
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            meta: Map::new(),
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach one metadata field
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Payload, or `null` when absent
    #[must_use]
    pub fn payload_or_null(&self) -> Value {
        self.payload.clone().unwrap_or(Value::Null)
    }

    /// Check whether this action has the given type
    #[must_use]
    pub fn is(&self, action_type: &str) -> bool {
        self.action_type == action_type
    }
}

/// Creates actions of a single type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCreator {
    action_type: String,
}

impl ActionCreator {
    /// Creator for the given type
    #[must_use]
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
        }
    }

    /// The type this creator stamps on its actions
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Create an action with no payload
    #[must_use]
    pub fn call(&self) -> Action {
        Action::new(self.action_type.clone())
    }

    /// Create an action with an optional payload
    #[must_use]
    pub fn create(&self, payload: Option<Value>) -> Action {
        Action {
            action_type: self.action_type.clone(),
            payload,
            meta: Map::new(),
        }
    }

    /// Create an action carrying `payload`
    #[must_use]
    pub fn with(&self, payload: Value) -> Action {
        self.create(Some(payload))
    }
}

/// A module's action creator: either plain or a fetchable bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEntry {
    /// One type, one creator
    Plain(ActionCreator),
    /// Loading creator plus `init`/`success`/`fail`/`clear` sub-creators
    Fetchable(FetchableActionCreator),
}

impl ActionEntry {
    /// The primary creator (the loading creator for fetchables)
    #[must_use]
    pub const fn creator(&self) -> &ActionCreator {
        match self {
            Self::Plain(creator) => creator,
            Self::Fetchable(fetchable) => fetchable.loading(),
        }
    }

    /// Create an action with the primary creator
    #[must_use]
    pub fn create(&self, payload: Option<Value>) -> Action {
        self.creator().create(payload)
    }

    /// Create a payload-less action with the primary creator
    #[must_use]
    pub fn call(&self) -> Action {
        self.creator().call()
    }

    /// The fetchable bundle, if this entry is one
    #[must_use]
    pub const fn as_fetchable(&self) -> Option<&FetchableActionCreator> {
        match self {
            Self::Fetchable(fetchable) => Some(fetchable),
            Self::Plain(_) => None,
        }
    }
}

/// Action-name → namespaced-type lookup of one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Types {
    module: String,
    entries: BTreeMap<String, String>,
}

impl Types {
    pub(crate) fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, action_type: impl Into<String>) {
        self.entries.insert(key.into(), action_type.into());
    }

    /// Look up a type by key, e.g. `"fetchOrders"` or `"fetchOrdersSuccess"`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up a type by key, failing for unknown keys
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownActionType`] if the module defines no such key.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::UnknownActionType {
            module: self.module.clone(),
            action: key.to_string(),
        })
    }

    /// Whether `key` is defined
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of types
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the module defines no types
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, type)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Action-name → creator lookup of one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actions {
    module: String,
    entries: BTreeMap<String, ActionEntry>,
}

impl Actions {
    pub(crate) fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, entry: ActionEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Look up a creator by action name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionEntry> {
        self.entries.get(name)
    }

    /// Look up a creator by action name, failing for unknown names
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAction`] if the module defines no such action.
    pub fn require(&self, name: &str) -> Result<&ActionEntry> {
        self.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Look up a fetchable creator by action name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAction`] if the action is missing or not fetchable.
    pub fn fetchable(&self, name: &str) -> Result<&FetchableActionCreator> {
        self.get(name)
            .and_then(ActionEntry::as_fetchable)
            .ok_or_else(|| self.unknown(name))
    }

    /// Build an action from the named creator
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAction`] if the module defines no such action.
    pub fn create(&self, name: &str, payload: Option<Value>) -> Result<Action> {
        Ok(self.require(name)?.create(payload))
    }

    /// Whether `name` is defined
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Action names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownAction {
            module: self.module.clone(),
            action: name.to_string(),
        }
    }
}
