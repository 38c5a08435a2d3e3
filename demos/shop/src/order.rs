//! The `order` module: fetchable orders and packages.
//!
//! Orders are refetched whenever `user/loginSuccess` fires, and marked as
//! loading as soon as a login starts.

use crate::ShopConfig;
use reducktion_core::{
    ActionMap, Effect, FetchableStatus, ModuleDefinition, ReactionMap, fetchable, memoize, selector, take_every,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Module name
pub const NAME: &str = "order";

/// Orders returned by the fake backend
#[must_use]
pub fn mock_orders() -> Value {
    json!([
        { "id": 1, "name": "Mock order 1" },
        { "id": 2, "name": "Mock order 2" },
        { "id": 3, "name": "Mock order 3" },
        { "id": 4, "name": "Mock order 4" },
    ])
}

/// Definition of the `order` module
#[must_use]
pub fn definition(config: ShopConfig) -> ModuleDefinition {
    ModuleDefinition::new(NAME)
        .inject(["user"])
        .state(json!({
            "orders": fetchable::value(json!([])),
            "packages": fetchable::value(json!([])),
            "hasError": false,
        }))
        .actions(|_| {
            ActionMap::new()
                .fetchable(
                    "fetchOrders",
                    fetchable::action("orders")
                        .on_success(|state, _| with_error_flag(state, false))
                        .on_failure(|state, _| with_error_flag(state, true)),
                )
                .fetchable(
                    "fetchPackages",
                    // Packages accumulate across pages
                    fetchable::action("packages").data_updater(|previous, action| {
                        let mut all = previous.as_array().cloned().unwrap_or_default();
                        if let Some(Value::Array(page)) = &action.payload {
                            all.extend(page.iter().cloned());
                        }
                        Value::Array(all)
                    }),
                )
        })
        .selectors(|ctx| {
            let orders = ctx.selectors.get("orders");
            let name = ctx.name.to_string();
            BTreeMap::from([
                (
                    "getOrderCount".to_string(),
                    memoize(vec![orders], |inputs| {
                        json!(inputs[0]["data"].as_array().map_or(0, Vec::len))
                    }),
                ),
                (
                    "getOrderNames".to_string(),
                    selector(move |root| {
                        let names: Vec<Value> = root[name.as_str()]["orders"]["data"]
                            .as_array()
                            .map(|orders| orders.iter().map(|o| o["name"].clone()).collect())
                            .unwrap_or_default();
                        Ok(Value::Array(names))
                    }),
                ),
            ])
        })
        .reactions(|ctx| {
            let login = ctx.deps.get("user")?.types.require("login")?;
            Ok(ReactionMap::new().on(login, |state, _| {
                let mut next = state.clone();
                next["orders"]["status"] = json!(FetchableStatus::Loading);
                next
            }))
        })
        .sagas(move |ctx| {
            let fetch = ctx.actions.fetchable("fetchOrders")?.clone();
            let latency = config.orders_latency;
            let triggers = [
                ctx.types.require("fetchOrders")?,
                ctx.deps.get("user")?.types.require("loginSuccess")?,
            ];

            Ok(vec![take_every(triggers, move |_| Effect::Delay {
                duration: latency,
                action: Box::new(fetch.success(mock_orders())),
            })])
        })
}

fn with_error_flag(state: &Value, has_error: bool) -> Value {
    let mut next = state.clone();
    next["hasError"] = json!(has_error);
    next
}
