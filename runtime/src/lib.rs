//! # Reducktion Runtime
//!
//! The store that drives registered modules.
//!
//! The core only describes behaviour: reducers are pure functions and sagas
//! hand back [`Effect`] values. This crate owns the root state, feeds every
//! action through the root reducer, starts matching sagas, and executes the
//! effects they describe, dispatching any actions produced back into the
//! store.
//!
//! ## Example
//!
//! ```no_run
//! use reducktion_core::{ActionMap, ModuleDefinition, register};
//! use reducktion_runtime::Store;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let user = ModuleDefinition::new("user")
//!     .state(json!({ "isAuthenticated": false }))
//!     .actions(|_| {
//!         ActionMap::new().reducer("loginSuccess", |state, _| {
//!             let mut next = state.clone();
//!             next["isAuthenticated"] = json!(true);
//!             next
//!         })
//!     })
//!     .build()?;
//! let registry = register(vec![user])?;
//! let store = Store::new(&registry);
//!
//! let login = registry.module("user")?.actions().create("loginSuccess", None)?;
//! store.send(login).await?;
//! store.wait_until_idle(Duration::from_secs(1)).await?;
//!
//! let authenticated = store.state(|s| s["user"]["isAuthenticated"].clone()).await;
//! assert_eq!(authenticated, json!(true));
//! # Ok(())
//! # }
//! ```

use reducktion_core::effect::Effect;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Store metric names and recorders
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` or `run()` is called after shutdown started.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a terminal action or for the store to go idle
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,

        /// A module lookup, thunk or selector failed
        #[error(transparent)]
        Module(#[from] reducktion_core::Error),
    }
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use reducktion_runtime::StoreConfig;
///
/// let config = StoreConfig::default().with_broadcast_capacity(256);
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of actions buffered for slow subscribers
    pub broadcast_capacity: usize,
    /// How often `wait_until_idle` and `shutdown` poll for pending effects
    pub poll_interval: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the pending-effect poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            poll_interval: Duration::from_millis(5),
        }
    }
}

/// Guard that decrements an atomic counter on drop (for idle/shutdown tracking)
///
/// Dropped when a spawned effect finishes, panics, or is aborted.
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl AtomicCounterGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        let pending = counter.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::StoreMetrics::record_pending(pending);
        Self(Arc::clone(counter))
    }
}

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        let pending = self.0.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::StoreMetrics::record_pending(pending);
    }
}

const fn effect_kind(effect: &Effect) -> &'static str {
    match effect {
        Effect::None => "none",
        Effect::Dispatch(_) => "dispatch",
        Effect::Parallel(_) => "parallel",
        Effect::Sequential(_) => "sequential",
        Effect::Delay { .. } => "delay",
        Effect::Future(_) => "future",
    }
}

/// Store module - the runtime for registered modules
pub mod store {
    use super::{AtomicCounterGuard, Duration, Effect, Ordering, StoreConfig, effect_kind};
    use crate::error::StoreError;
    use crate::metrics::StoreMetrics;
    use futures::FutureExt;
    use futures::future::{BoxFuture, join_all};
    use reducktion_core::{Action, CombinedReducer, Module, Reducer, Registry, Saga, Selector, State, TakeMode};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::sync::{RwLock, broadcast};
    use tokio::task::AbortHandle;

    /// The Store - runtime coordinator for the root reducer and sagas
    ///
    /// The Store manages:
    /// 1. Root state (behind `RwLock` for concurrent access)
    /// 2. The combined reducer of every registered module
    /// 3. Saga subscriptions and their running effects
    /// 4. An action broadcast for observers
    ///
    /// Cloning is cheap; clones share the same state.
    #[derive(Clone)]
    pub struct Store {
        state: Arc<RwLock<State>>,
        reducer: Arc<CombinedReducer>,
        sagas: Arc<Vec<Saga>>,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Running `take_latest` tasks, keyed by saga index
        latest: Arc<Mutex<HashMap<usize, AbortHandle>>>,
        /// Every reduced action is broadcast to observers
        action_broadcast: broadcast::Sender<Action>,
    }

    impl Store {
        /// Create a store from a registry with default configuration
        ///
        /// The root state starts as every module's initial state.
        #[must_use]
        pub fn new(registry: &Registry) -> Self {
            Self::with_config(registry, StoreConfig::default())
        }

        /// Create a store from a registry with custom configuration
        #[must_use]
        pub fn with_config(registry: &Registry, config: StoreConfig) -> Self {
            let reducer = registry.root_reducer();
            let initial_state = reducer.initial_state();
            Self::from_parts(initial_state, reducer, registry.all_sagas().to_vec(), config)
        }

        /// Create a store from its parts
        ///
        /// Useful to restore a previously persisted root state.
        #[must_use]
        pub fn from_parts(initial_state: State, reducer: CombinedReducer, sagas: Vec<Saga>, config: StoreConfig) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            tracing::debug!(
                slices = reducer.len(),
                sagas = sagas.len(),
                "Store created"
            );

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                sagas: Arc::new(sagas),
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                latest: Arc::new(Mutex::new(HashMap::new())),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Reduces the root state while holding the write lock
        /// 2. Broadcasts the action to subscribers
        /// 3. Starts every saga watching the action's type
        ///
        /// Saga effects run in spawned tasks; `send()` returns once they are
        /// started, not once they complete. Use [`Store::wait_until_idle`] to
        /// wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), fields(action_type = %action.action_type), name = "store_send")]
        pub async fn send(&self, action: Action) -> Result<(), StoreError> {
            self.ensure_running()?;

            {
                let mut state = self.state.write().await;
                let start = std::time::Instant::now();
                let next = self.reducer.reduce(&state, &action);
                *state = next;
                StoreMetrics::record_action(start.elapsed());
                tracing::trace!("Reducer completed");
            }

            // No subscribers is fine
            let _ = self.action_broadcast.send(action.clone());

            self.start_sagas(&action);
            Ok(())
        }

        /// Execute an effect to completion
        ///
        /// Used for thunk effects: every action the effect produces is sent
        /// through the store before this returns.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn run(&self, effect: Effect) -> Result<(), StoreError> {
            self.ensure_running()?;
            self.run_effect(effect).await;
            Ok(())
        }

        /// Invoke a module's thunk and run its effect to completion
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Module`] if the module has no such thunk and
        /// [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn run_thunk(&self, module: &Module, name: &str, arg: Option<Value>) -> Result<(), StoreError> {
            let effect = module.thunk(name, arg)?;
            tracing::debug!(module = module.name(), thunk = name, "Running thunk");
            self.run(effect).await
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let orders = store.state(|s| s["order"]["orders"].clone()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&State) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Apply a selector to the current root state
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Module`] with the selector's error.
        pub async fn select(&self, selector: &Selector) -> Result<Value, StoreError> {
            let state = self.state.read().await;
            Ok(selector(&state)?)
        }

        /// Subscribe to every action reduced by this store
        ///
        /// If the receiver lags it skips old actions and gets
        /// [`broadcast::error::RecvError::Lagged`].
        #[must_use]
        pub fn subscribe(&self) -> broadcast::Receiver<Action> {
            self.action_broadcast.subscribe()
        }

        /// Send an action and wait for the first action matching `predicate`
        ///
        /// Subscribes before sending, so an action produced immediately by a
        /// saga is not missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(&self, action: Action, predicate: F, timeout: Duration) -> Result<Action, StoreError>
        where
            F: Fn(&Action) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();
            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Number of spawned effect tasks still running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Wait until no spawned effect is running
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Timeout`] if effects are still running after `timeout`.
        pub async fn wait_until_idle(&self, timeout: Duration) -> Result<(), StoreError> {
            let start = std::time::Instant::now();

            loop {
                if self.pending_effects() == 0 {
                    return Ok(());
                }
                if start.elapsed() >= timeout {
                    return Err(StoreError::Timeout);
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        /// Initiate graceful shutdown
        ///
        /// New actions are rejected right away; effects already running may
        /// finish until `timeout`.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// after `timeout`.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            loop {
                let pending = self.pending_effects();

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout: {} effects still running", pending);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        /// Whether shutdown has started
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        fn ensure_running(&self) -> Result<(), StoreError> {
            if self.is_shutting_down() {
                tracing::warn!("Rejected action: store is shutting down");
                StoreMetrics::record_rejected();
                return Err(StoreError::ShutdownInProgress);
            }
            Ok(())
        }

        fn start_sagas(&self, action: &Action) {
            for (index, saga) in self.sagas.iter().enumerate() {
                if !saga.matches(action) {
                    continue;
                }

                let effect = saga.run(action);
                if effect.is_none() {
                    continue;
                }

                match saga.mode() {
                    TakeMode::Every => {
                        StoreMetrics::record_saga("every");
                        self.spawn_effect(effect);
                    },
                    TakeMode::Latest => {
                        StoreMetrics::record_saga("latest");
                        let handle = self.spawn_effect(effect);
                        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
                        if let Some(previous) = latest.insert(index, handle) {
                            if !previous.is_finished() {
                                tracing::debug!(saga = index, "Cancelling previous saga run");
                                StoreMetrics::record_cancelled();
                                previous.abort();
                            }
                        }
                    },
                }
            }
        }

        fn spawn_effect(&self, effect: Effect) -> AbortHandle {
            let guard = AtomicCounterGuard::new(&self.pending_effects);
            let task = self.run_effect(effect);

            let join = tokio::spawn(async move {
                let _guard = guard; // Decrement on drop, including abort
                task.await;
            });
            join.abort_handle()
        }

        /// Execute an effect, feeding produced actions back into the store
        ///
        /// - `None`: no-op
        /// - `Dispatch`: sends the action
        /// - `Future`: awaits it and sends the resulting action if `Some`
        /// - `Delay`: sleeps, then sends the action
        /// - `Parallel`: runs every effect concurrently
        /// - `Sequential`: runs effects in order, each to completion
        ///
        /// Send failures (shutdown) are logged and end the effect's branch.
        fn run_effect(&self, effect: Effect) -> BoxFuture<'static, ()> {
            let store = self.clone();
            StoreMetrics::record_effect(effect_kind(&effect));

            async move {
                match effect {
                    Effect::None => {},
                    Effect::Dispatch(action) => store.feed_back(action).await,
                    Effect::Future(fut) => {
                        if let Some(action) = fut.await {
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    },
                    Effect::Delay { duration, action } => {
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    },
                    Effect::Parallel(effects) => {
                        join_all(effects.into_iter().map(|e| store.run_effect(e))).await;
                    },
                    Effect::Sequential(effects) => {
                        for effect in effects {
                            store.run_effect(effect).await;
                        }
                    },
                }
            }
            .boxed()
        }

        async fn feed_back(&self, action: Action) {
            let action_type = action.action_type.clone();
            if let Err(error) = self.send(action).await {
                tracing::debug!(action_type = %action_type, error = %error, "Dropped action produced by an effect");
            }
        }
    }

    impl std::fmt::Debug for Store {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("reducer", &self.reducer)
                .field("sagas", &self.sagas.len())
                .field("pending_effects", &self.pending_effects())
                .field("shutting_down", &self.is_shutting_down())
                .finish_non_exhaustive()
        }
    }
}

pub use error::StoreError;
pub use store::Store;
