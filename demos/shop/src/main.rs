//! Shop demo binary
//!
//! Registers the shop modules, logs a user in and walks through the
//! resulting saga chain: login → loginSuccess → orders fetched.

use anyhow::Context;
use reducktion_core::RegistryConfig;
use reducktion_runtime::Store;
use serde_json::json;
use shop::ShopConfig;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop=debug,reducktion_core=debug,reducktion_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Shop Example: reducktion modules ===\n");

    let registry_config = RegistryConfig::from_env().context("invalid registry configuration")?;
    let drafts = shop::modules(ShopConfig::default())?;
    let registry = reducktion_core::ModuleRegistry::with_config(registry_config)
        .register(drafts)
        .context("failed to register shop modules")?;
    println!("Registered modules: {}", registry.names().join(", "));

    let store = Store::new(&registry);
    let user = registry.module("user")?;
    let order = registry.module("order")?;
    let settings = registry.module("settings")?;

    println!("\n>>> Sending: user/login");
    let login = user
        .actions()
        .create("login", Some(json!({ "username": "ada", "password": "secret" })))?;
    store.send(login).await?;
    let status = store.select(&order.selectors().get("orders")).await?;
    println!("Orders while logging in: {}", status["status"]);

    store.wait_until_idle(Duration::from_secs(5)).await?;

    let profile = store.select(user.selectors().require("getProfile")?).await?;
    let names = store.select(order.selectors().require("getOrderNames")?).await?;
    println!("Profile after login: {profile}");
    println!("Orders after login: {names}");

    println!("\n>>> Sending: settings/toggleDarkMode");
    store.send(settings.actions().create("toggleDarkMode", None)?).await?;
    let theme = store.select(settings.selectors().require("getThemeMode")?).await?;
    println!("Theme: {theme}");

    println!("\n>>> Running thunk: settings/resetShop");
    store.run_thunk(settings, "resetShop", None).await?;
    let state = store.state(serde_json::Value::clone).await;
    println!("State after reset: {}", serde_json::to_string_pretty(&state)?);

    store.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Done ===");
    Ok(())
}
