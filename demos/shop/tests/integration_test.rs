//! Integration tests for the shop demo
//!
//! Drives the registered modules through a real store: cross-module
//! reactions, saga chains across injected modules, thunks and selectors.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use reducktion_core::{
    Action, CyclePolicy, Error, FetchableStatus, ModuleRegistry, Reducer, Registry, RegistryConfig, fetchable,
};
use reducktion_runtime::Store;
use reducktion_testing::{ActionRecorder, ReducerTest, assertions, helpers, properties};
use serde_json::json;
use shop::{ShopConfig, order, user};
use std::time::Duration;

fn shop() -> Registry {
    shop::registry(ShopConfig::instant()).unwrap()
}

fn login(registry: &Registry, username: &str, password: &str) -> reducktion_core::Action {
    registry
        .module("user")
        .unwrap()
        .actions()
        .create("login", Some(json!({ "username": username, "password": password })))
        .unwrap()
}

#[tokio::test]
async fn test_login_fetches_orders() {
    helpers::init_tracing();
    let registry = shop();
    let store = Store::new(&registry);
    let recorder = ActionRecorder::attach(&store);

    store.send(login(&registry, "ada", "secret")).await.unwrap();

    // The order slice reacts to the login itself
    let orders = store.state(|s| s["order"].clone()).await;
    assertions::assert_fetchable_status(&orders, "orders", FetchableStatus::Loading);

    helpers::settle(&store).await;

    let state = store.state(serde_json::Value::clone).await;
    assert_eq!(state["user"]["isAuthenticated"], json!(true));
    assert_eq!(state["user"]["profile"], user::mock_profile("ada"));
    assertions::assert_fetchable_status(&state["order"], "orders", FetchableStatus::Success);
    assertions::assert_fetchable_data(&state["order"], "orders", &order::mock_orders());

    assert!(recorder.wait_for("order/fetchOrders/success", helpers::SETTLE_TIMEOUT).await);
    assert_eq!(
        recorder.types(),
        vec!["user/login", "user/loginSuccess", "order/fetchOrders/success"]
    );
}

#[tokio::test]
async fn test_login_without_password_fails() {
    let registry = shop();
    let store = Store::new(&registry);

    store.send(login(&registry, "ada", "")).await.unwrap();
    helpers::settle(&store).await;

    let user = store.state(|s| s["user"].clone()).await;
    assert_eq!(user["error"], json!(true));
    assert_eq!(user["loading"], json!(false));
    assert_eq!(user["isAuthenticated"], json!(false));
}

#[tokio::test]
async fn test_only_latest_login_completes() {
    let config = ShopConfig {
        login_latency: Duration::from_millis(30),
        orders_latency: Duration::ZERO,
    };
    let registry = shop::registry(config).unwrap();
    let store = Store::new(&registry);

    store.send(login(&registry, "first", "pw")).await.unwrap();
    store.send(login(&registry, "second", "pw")).await.unwrap();
    helpers::settle(&store).await;

    let profile = store
        .select(registry.module("user").unwrap().selectors().require("getProfile").unwrap())
        .await
        .unwrap();
    assert_eq!(profile, user::mock_profile("second"));
}

#[tokio::test]
async fn test_reset_thunk_spans_modules() {
    let registry = shop();
    let store = Store::new(&registry);
    let settings = registry.module("settings").unwrap();

    store.send(login(&registry, "ada", "secret")).await.unwrap();
    store.send(settings.actions().create("toggleDarkMode", None).unwrap()).await.unwrap();
    helpers::settle(&store).await;

    let theme = settings.selectors().require("getThemeMode").unwrap();
    assert_eq!(store.select(theme).await.unwrap(), json!("dark"));

    store.run_thunk(settings, "resetShop", None).await.unwrap();

    let state = store.state(serde_json::Value::clone).await;
    assert_eq!(store.select(theme).await.unwrap(), json!("light"));
    assert_eq!(state["order"]["orders"], fetchable::value(json!([])));
    assert_eq!(&state["user"], registry.module("user").unwrap().initial_state());
}

#[tokio::test]
async fn test_order_selectors() {
    let registry = shop();
    let store = Store::new(&registry);
    let order = registry.module("order").unwrap();

    let count = order.selectors().require("getOrderCount").unwrap();
    assert_eq!(store.select(count).await.unwrap(), json!(0));

    let fetch = order.actions().fetchable("fetchOrders").unwrap();
    store.send(fetch.call()).await.unwrap();
    helpers::settle(&store).await;

    assert_eq!(store.select(count).await.unwrap(), json!(4));
    let names = store.select(order.selectors().require("getOrderNames").unwrap()).await.unwrap();
    assert_eq!(names[0], json!("Mock order 1"));
}

#[test]
fn test_fetch_failure_sets_error_flag() {
    let registry = shop();
    let order = registry.module("order").unwrap();
    let fetch = order.actions().fetchable("fetchOrders").unwrap();

    ReducerTest::new(order.reducer())
        .when_action(fetch.call())
        .when_action(fetch.fail(json!("Could not load orders!")))
        .then_state(|state| {
            assertions::assert_fetchable_status(state, "orders", FetchableStatus::Failure);
            assert_eq!(state["hasError"], json!(true));
            assert_eq!(state["orders"]["error"], json!("Could not load orders!"));
        })
        .run();
}

#[test]
fn test_packages_accumulate_pages() {
    let registry = shop();
    let order = registry.module("order").unwrap();
    let fetch = order.actions().fetchable("fetchPackages").unwrap();

    ReducerTest::new(order.reducer())
        .when_action(fetch.success(json!([{ "name": "a" }])))
        .when_action(fetch.success(json!([{ "name": "b" }])))
        .then_state(|state| {
            assertions::assert_fetchable_data(state, "packages", &json!([{ "name": "a" }, { "name": "b" }]));
        })
        .run();
}

#[test]
fn test_mutual_injection_rejected_under_strict_cycles() {
    let strict = ModuleRegistry::with_config(RegistryConfig::default().with_cycle_policy(CyclePolicy::Reject));
    let err = strict.register(shop::modules(ShopConfig::instant()).unwrap()).unwrap_err();

    assert!(matches!(err, Error::DependencyCycle { .. }));
    assert!(err.to_string().contains("user"));
}

fn arb_shop_action() -> impl Strategy<Value = Action> {
    let registry = shop();
    let mut shop_types: Vec<String> = registry
        .modules()
        .flat_map(|m| m.module_reducer().handled_types().map(str::to_string).collect::<Vec<_>>())
        .collect();
    shop_types.sort();
    shop_types.dedup();

    let known = (prop::sample::select(shop_types), prop::option::of(properties::arb_json())).prop_map(|(ty, payload)| {
        let action = Action::new(ty);
        match payload {
            Some(payload) => action.with_payload(payload),
            None => action,
        }
    });
    prop_oneof![known, properties::arb_action()]
}

proptest! {
    #[test]
    fn prop_shop_reducer_is_idempotent(
        history in prop::collection::vec(arb_shop_action(), 0..8),
        action in arb_shop_action(),
    ) {
        let root = shop().root_reducer();
        let state = history.iter().fold(root.initial_state(), |state, a| root.reduce(&state, a));

        prop_assert_eq!(root.reduce(&state, &action), root.reduce(&state, &action));
    }
}
