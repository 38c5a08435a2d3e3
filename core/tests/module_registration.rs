//! Integration tests for module registration and reducer behavior
//!
//! Exercises the public API end to end: definitions are built, registered
//! together, and the resulting root reducer is driven with generated actions.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use reducktion_core::{
    Action, ActionMap, Error, FetchableStatus, FetchableValue, ModuleDefinition, ModuleDraft, ReactionMap, Reducer,
    Registry, fetchable, register,
};
use serde_json::{Value, json};

// ============================================================================
// Test Fixtures
// ============================================================================

fn user() -> ModuleDraft {
    ModuleDefinition::new("user")
        .inject(["order"])
        .state(json!({ "profile": null, "isAuthenticated": false }))
        .actions(|_| {
            ActionMap::new()
                .noop("login")
                .reducer("loginSuccess", |state, action| {
                    let mut next = state.clone();
                    next["isAuthenticated"] = json!(true);
                    next["profile"] = action.payload_or_null();
                    next
                })
                .noop("logout")
        })
        .reactions(|ctx| {
            let fetched = ctx.deps.get("order")?.types.require("fetchOrdersSuccess")?;
            Ok(ReactionMap::new().on(fetched, |state, _| {
                let mut next = state.clone();
                next["hasOrders"] = json!(true);
                next
            }))
        })
        .build()
        .expect("user module builds")
}

fn order() -> ModuleDraft {
    ModuleDefinition::new("order")
        .inject(["user"])
        .state(json!({
            "orders": fetchable::value(json!([])),
            "packages": fetchable::value(json!([])),
        }))
        .actions(|_| {
            ActionMap::new()
                .fetchable("fetchOrders", fetchable::action("orders"))
                .fetchable(
                    "fetchPackages",
                    fetchable::action("packages").on_success(|state, action| {
                        let mut next = state.clone();
                        next["packagesFetchedBy"] = action.meta.get("by").cloned().unwrap_or(Value::Null);
                        next
                    }),
                )
        })
        .reactions(|ctx| {
            let logout = ctx.deps.get("user")?.types.require("logout")?;
            let initial = ctx.initial_state.clone();
            Ok(ReactionMap::new().on(logout, move |_, _| initial.clone()))
        })
        .build()
        .expect("order module builds")
}

fn shop() -> Registry {
    register(vec![user(), order()]).expect("user and order register")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_every_module_contributes_a_slice() {
    let registry = shop();
    let state = registry.initial_state();

    assert_eq!(state["user"]["isAuthenticated"], json!(false));
    assert_eq!(state["order"]["orders"]["status"], json!("INITIAL"));
    assert_eq!(registry.all_reducers().len(), 2);
}

#[test]
fn test_fetchable_lifecycle_through_root_reducer() {
    let registry = shop();
    let root = registry.root_reducer();
    let fetch = registry.module("order").unwrap().actions().fetchable("fetchOrders").unwrap().clone();

    let loading = root.reduce(&registry.initial_state(), &fetch.call());
    assert_eq!(loading["order"]["orders"]["status"], json!("LOADING"));

    let loaded = root.reduce(&loading, &fetch.success(json!([{ "id": 1 }])));
    let orders = FetchableValue::<Value>::from_state(&loaded["order"]["orders"]).unwrap();
    assert_eq!(orders.status, FetchableStatus::Success);
    assert_eq!(orders.data, json!([{ "id": 1 }]));
    assert_eq!(loaded["user"]["hasOrders"], json!(true));

    let cleared = root.reduce(&loaded, &fetch.clear());
    assert_eq!(cleared["order"]["orders"], fetchable::value(json!([])));
}

#[test]
fn test_success_override_sees_action_meta() {
    let registry = shop();
    let root = registry.root_reducer();
    let fetch = registry.module("order").unwrap().actions().fetchable("fetchPackages").unwrap().clone();

    let action = fetch.success(json!(["box"])).with_meta("by", json!("courier"));
    let next = root.reduce(&registry.initial_state(), &action);

    assert_eq!(next["order"]["packages"]["data"], json!(["box"]));
    assert_eq!(next["order"]["packagesFetchedBy"], json!("courier"));
}

#[test]
fn test_logout_resets_order_slice() {
    let registry = shop();
    let root = registry.root_reducer();
    let fetch = registry.module("order").unwrap().actions().fetchable("fetchOrders").unwrap().clone();
    let logout = registry.module("user").unwrap().actions().create("logout", None).unwrap();

    let loaded = root.reduce(&registry.initial_state(), &fetch.success(json!([1, 2])));
    let after = root.reduce(&loaded, &logout);
    assert_eq!(after["order"], registry.module("order").unwrap().initial_state().clone());
}

#[test]
fn test_injected_selectors_read_foreign_slices() {
    let registry = shop();
    let state = registry.initial_state();
    let order = registry.module("order").unwrap();

    let get_orders = order.selectors().get("orders");
    assert_eq!(get_orders(&state).unwrap()["status"], json!("INITIAL"));

    let missing = order.selectors().get("shipments");
    let err = missing(&state).unwrap_err();
    assert!(matches!(err, Error::NonExistentField { .. }));
    assert!(err.to_string().contains("Tried to select a non-existent field 'shipments' from module 'order'"));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_action_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(/[a-zA-Z]{1,10}){0,2}"
}

/// Every declared type plus every handled one, reactions included
fn known_types(registry: &Registry) -> Vec<String> {
    let mut known: Vec<String> = registry
        .modules()
        .flat_map(|m| {
            m.types()
                .iter()
                .map(|(_, ty)| ty.to_string())
                .chain(m.module_reducer().handled_types().map(str::to_string))
                .collect::<Vec<_>>()
        })
        .collect();
    known.sort();
    known.dedup();
    known
}

fn arb_known_action() -> impl Strategy<Value = Action> {
    let types = known_types(&shop());
    (prop::sample::select(types), any::<Option<i64>>(), any::<bool>()).prop_map(|(ty, payload, with_meta)| {
        let mut action = Action::new(ty);
        if let Some(p) = payload {
            action = action.with_payload(json!(p));
        }
        if with_meta {
            action = action.with_meta("by", json!("proptest"));
        }
        action
    })
}

proptest! {
    #[test]
    fn prop_reducing_twice_gives_the_same_state(
        history in prop::collection::vec(arb_known_action(), 0..6),
        action in arb_known_action(),
    ) {
        let root = shop().root_reducer();
        let state = history.iter().fold(root.initial_state(), |state, a| root.reduce(&state, a));

        let first = root.reduce(&state, &action);
        let second = root.reduce(&state, &action);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_unknown_actions_are_identity(name in arb_action_name(), payload in any::<Option<i64>>()) {
        let registry = shop();
        let root = registry.root_reducer();
        let known: Vec<String> = registry
            .modules()
            .flat_map(|m| m.module_reducer().handled_types().map(str::to_string).collect::<Vec<_>>())
            .collect();
        prop_assume!(!known.contains(&name));

        let mut action = Action::new(name);
        if let Some(p) = payload {
            action = action.with_payload(json!(p));
        }
        let state = registry.initial_state();
        prop_assert_eq!(root.reduce(&state, &action), state);
    }

    #[test]
    fn prop_failure_keeps_data(error in "[ -~]{0,20}", data in prop::collection::vec(any::<u8>(), 0..5)) {
        let registry = shop();
        let root = registry.root_reducer();
        let fetch = registry.module("order").unwrap().actions().fetchable("fetchOrders").unwrap().clone();

        let loaded = root.reduce(&registry.initial_state(), &fetch.success(json!(data)));
        let failed = root.reduce(&loaded, &fetch.fail(json!(error)));

        prop_assert_eq!(&failed["order"]["orders"]["status"], &json!("FAILURE"));
        prop_assert_eq!(&failed["order"]["orders"]["error"], &json!(error));
        prop_assert_eq!(&failed["order"]["orders"]["data"], &json!(data));
    }
}
