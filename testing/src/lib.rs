//! # Reducktion Testing
//!
//! Testing utilities and helpers for reducktion modules and stores.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given-When-Then harness for any reducer
//! - Assertion helpers for fetchable fields, tracked actions and effects
//! - [`ActionRecorder`], which captures every action a store reduces
//! - proptest strategies for JSON state and actions
//!
//! ## Example
//!
//! ```no_run
//! use reducktion_core::{ActionMap, ModuleDefinition, register};
//! use reducktion_runtime::Store;
//! use reducktion_testing::{ActionRecorder, helpers};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let user = ModuleDefinition::new("user")
//!     .actions(|_| ActionMap::new().noop("login"))
//!     .build()?;
//! let registry = register(vec![user])?;
//! let store = Store::new(&registry);
//! let recorder = ActionRecorder::attach(&store);
//!
//! store.send(registry.module("user")?.actions().create("login", None)?).await?;
//! helpers::settle(&store).await;
//!
//! assert!(recorder.wait_for("user/login", helpers::SETTLE_TIMEOUT).await);
//! # Ok(())
//! # }
//! ```


pub use reducer_test::{ReducerTest, assertions};

/// Recording doubles for stores
pub mod mocks {
    use reducktion_core::Action;
    use reducktion_runtime::Store;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tokio::sync::broadcast::error::RecvError;
    use tokio::task::JoinHandle;

    /// Captures every action a store reduces, in order
    ///
    /// Recording starts when the recorder is attached; earlier actions are
    /// not seen. The background task stops when the recorder is dropped.
    #[derive(Debug)]
    pub struct ActionRecorder {
        actions: Arc<Mutex<Vec<Action>>>,
        task: JoinHandle<()>,
    }

    impl ActionRecorder {
        /// Subscribe to `store` and start recording
        ///
        /// Must be called from within a Tokio runtime.
        #[must_use]
        pub fn attach(store: &Store) -> Self {
            let actions = Arc::new(Mutex::new(Vec::new()));
            let mut rx = store.subscribe();
            let sink = Arc::clone(&actions);

            let task = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(action) => sink.lock().unwrap_or_else(PoisonError::into_inner).push(action),
                        Err(RecvError::Lagged(_)) => {},
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            Self { actions, task }
        }

        /// Actions recorded so far
        #[must_use]
        pub fn actions(&self) -> Vec<Action> {
            self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Types of the actions recorded so far
        #[must_use]
        pub fn types(&self) -> Vec<String> {
            self.actions().into_iter().map(|a| a.action_type).collect()
        }

        /// Whether an action of `action_type` was recorded
        #[must_use]
        pub fn saw(&self, action_type: &str) -> bool {
            self.actions.lock().unwrap_or_else(PoisonError::into_inner).iter().any(|a| a.is(action_type))
        }

        /// Wait until an action of `action_type` is recorded, up to `timeout`
        pub async fn wait_for(&self, action_type: &str, timeout: Duration) -> bool {
            let start = std::time::Instant::now();
            while !self.saw(action_type) {
                if start.elapsed() >= timeout {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            true
        }
    }

    impl Drop for ActionRecorder {
        fn drop(&mut self) {
            self.task.abort();
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use reducktion_runtime::Store;
    use std::time::Duration;

    /// Default time [`settle`] waits for sagas to finish
    pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Install a test-friendly tracing subscriber honouring `RUST_LOG`
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Wait until no effect is running on `store`
    ///
    /// # Panics
    ///
    /// Panics if effects are still running after [`SETTLE_TIMEOUT`].
    #[allow(clippy::panic)] // Test helper
    pub async fn settle(store: &Store) {
        if let Err(error) = store.wait_until_idle(SETTLE_TIMEOUT).await {
            panic!("Store did not settle: {error} ({} effects pending)", store.pending_effects());
        }
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use proptest::prelude::*;
    use reducktion_core::Action;
    use serde_json::{Map, Value};

    /// Arbitrary JSON scalars
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        ]
    }

    /// Arbitrary JSON values, nested up to a few levels
    pub fn arb_json() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    /// Arbitrary JSON objects, as used for module state
    pub fn arb_object() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,6}", arb_json(), 0..5)
            .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>()))
    }

    /// Arbitrary namespaced action types, `module/action` with an optional stage
    pub fn arb_action_type() -> impl Strategy<Value = String> {
        "[a-z]{1,8}/[a-z][a-zA-Z]{0,10}(/(init|success|failure|clear))?"
    }

    /// Arbitrary actions with an optional payload
    pub fn arb_action() -> impl Strategy<Value = Action> {
        (arb_action_type(), prop::option::of(arb_json())).prop_map(|(action_type, payload)| {
            let action = Action::new(action_type);
            match payload {
                Some(payload) => action.with_payload(payload),
                None => action,
            }
        })
    }
}

pub use mocks::ActionRecorder;
