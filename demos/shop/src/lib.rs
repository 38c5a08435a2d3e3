//! Shop demo
//!
//! Three modules that depend on each other by name:
//!
//! - `user`: login flow with a cancellable login saga
//! - `order`: fetchable orders and packages, refetched after login
//! - `settings`: toggles plus a thunk that resets the whole shop
//!
//! `user` and `order` inject each other, so registration must resolve a
//! cycle; that works because dependencies only expose types, action
//! creators and selectors.

use reducktion_core::{ModuleDraft, Registry, register};
use std::time::Duration;

pub mod order;
pub mod settings;
pub mod user;

/// Fake backend latencies
#[derive(Debug, Clone, Copy)]
pub struct ShopConfig {
    /// Delay before a login succeeds
    pub login_latency: Duration,
    /// Delay before orders arrive
    pub orders_latency: Duration,
}

impl ShopConfig {
    /// No artificial latency, for tests
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            login_latency: Duration::ZERO,
            orders_latency: Duration::ZERO,
        }
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            login_latency: Duration::from_millis(600),
            orders_latency: Duration::from_millis(400),
        }
    }
}

/// Build every shop module.
///
/// # Errors
///
/// Returns the first definition error.
pub fn modules(config: ShopConfig) -> reducktion_core::Result<Vec<ModuleDraft>> {
    Ok(vec![
        user::definition(config).build()?,
        order::definition(config).build()?,
        settings::definition().build()?,
    ])
}

/// Build and register every shop module.
///
/// # Errors
///
/// Returns the first definition or registration error.
pub fn registry(config: ShopConfig) -> reducktion_core::Result<Registry> {
    register(modules(config)?)
}
