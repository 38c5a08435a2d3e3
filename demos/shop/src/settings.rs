//! The `settings` module: feature toggles and the `resetShop` thunk.

use reducktion_core::{ActionMap, Effect, ModuleDefinition, State, ThunkContext, selector};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Module name
pub const NAME: &str = "settings";

fn toggle(field: &'static str) -> impl Fn(&State, &reducktion_core::Action) -> State + Send + Sync + 'static {
    move |state, _| {
        let mut next = state.clone();
        next[field] = json!(!state[field].as_bool().unwrap_or(false));
        next
    }
}

/// Reset settings, clear orders and log out, in that order.
///
/// Dependencies that fail to provide an action are skipped with a warning.
fn reset_shop(_: Option<Value>, ctx: &ThunkContext) -> Effect {
    let steps = [
        ctx.actions.create("resetSettings", None),
        ctx.deps
            .get("order")
            .and_then(|order| order.actions.fetchable("fetchOrders").map(|f| f.clear())),
        ctx.deps.get("user").and_then(|user| user.actions.create("logout", None)),
    ];

    let effects = steps
        .into_iter()
        .filter_map(|step| match step {
            Ok(action) => Some(Effect::Dispatch(action)),
            Err(error) => {
                tracing::warn!(%error, "Skipping reset step");
                None
            },
        })
        .collect();

    Effect::Sequential(effects)
}

/// Definition of the `settings` module
#[must_use]
pub fn definition() -> ModuleDefinition {
    ModuleDefinition::new(NAME)
        .inject(["user", "order"])
        .state(json!({
            "notificationsEnabled": false,
            "gpsEnabled": false,
            "darkModeEnabled": false,
        }))
        .actions(|ctx| {
            let initial = ctx.initial_state.clone();
            ActionMap::new()
                .reducer("resetSettings", move |_, _| initial.clone())
                .reducer("toggleNotifications", toggle("notificationsEnabled"))
                .reducer("toggleGps", toggle("gpsEnabled"))
                .reducer("toggleDarkMode", toggle("darkModeEnabled"))
        })
        .selectors(|ctx| {
            let name = ctx.name.to_string();
            BTreeMap::from([(
                "getThemeMode".to_string(),
                selector(move |root| {
                    let dark = root[name.as_str()]["darkModeEnabled"].as_bool().unwrap_or(false);
                    Ok(json!(if dark { "dark" } else { "light" }))
                }),
            )])
        })
        .thunk("resetShop", reset_shop)
}
