//! The `user` module: authentication state and the login saga.

use crate::ShopConfig;
use reducktion_core::{ActionMap, Effect, ModuleDefinition, State, selector, take_latest};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Module name
pub const NAME: &str = "user";

fn merge(state: &State, patch: &Value) -> State {
    let mut next = state.clone();
    if let (Some(target), Some(fields)) = (next.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    next
}

fn has_credentials(payload: Option<&Value>) -> bool {
    let field = |name: &str| {
        payload
            .and_then(|p| p.get(name))
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };
    field("username") && field("password")
}

/// Profile returned by the fake backend
#[must_use]
pub fn mock_profile(username: &str) -> Value {
    json!({
        "name": username,
        "avatarUrl": "https://example.com/avatars/100x100",
    })
}

/// Definition of the `user` module
#[must_use]
pub fn definition(config: ShopConfig) -> ModuleDefinition {
    ModuleDefinition::new(NAME)
        .inject(["order"])
        .state(json!({
            "profile": null,
            "isAuthenticated": false,
            "loading": false,
            "error": false,
        }))
        .actions(|ctx| {
            let initial = ctx.initial_state.clone();
            ActionMap::new()
                .reducer("logout", move |_, _| initial.clone())
                .reducer("login", |state, _| merge(state, &json!({ "loading": true, "error": false })))
                .reducer("loginFailed", |state, _| merge(state, &json!({ "loading": false, "error": true })))
                .reducer("loginSuccess", |state, action| {
                    merge(
                        state,
                        &json!({
                            "profile": action.payload_or_null(),
                            "isAuthenticated": true,
                            "loading": false,
                            "error": false,
                        }),
                    )
                })
        })
        .selectors(|ctx| {
            let name = ctx.name.to_string();
            BTreeMap::from([(
                "getProfile".to_string(),
                selector(move |root| Ok(root[name.as_str()]["profile"].clone())),
            )])
        })
        .sagas(move |ctx| {
            let failed = ctx.actions.require("loginFailed")?.clone();
            let succeeded = ctx.actions.require("loginSuccess")?.clone();
            let latency = config.login_latency;

            Ok(vec![take_latest([ctx.types.require("login")?], move |action| {
                if !has_credentials(action.payload.as_ref()) {
                    return Effect::Dispatch(failed.call());
                }
                let username = action
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("username"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                tracing::debug!(username, "Logging in");
                Effect::Delay {
                    duration: latency,
                    action: Box::new(succeeded.create(Some(mock_profile(username)))),
                }
            })])
        })
}
