//! Store metrics.
//!
//! The store records through the `metrics` facade; nothing is exported
//! unless the application installs a recorder. Call [`describe`] once after
//! installing one to attach descriptions.
//!
//! # Example
//!
//! ```rust
//! use reducktion_runtime::metrics;
//!
//! // After installing a recorder of your choice:
//! metrics::describe();
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use std::time::Duration;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Actions reduced by the store
pub const ACTIONS_TOTAL: &str = "store.actions.total";
/// Actions rejected during shutdown
pub const ACTIONS_REJECTED: &str = "store.actions.rejected";
/// Effects executed, labelled by `type`
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";
/// Saga runs started, labelled by `mode`
pub const SAGAS_MATCHED: &str = "store.sagas.matched";
/// `take_latest` runs cancelled by a newer action
pub const SAGAS_CANCELLED: &str = "store.sagas.cancelled";
/// Time spent in the root reducer
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";
/// Spawned effect tasks still running
pub const EFFECTS_PENDING: &str = "store.effects.pending";

/// Register descriptions for every store metric.
pub fn describe() {
    describe_counter!(ACTIONS_TOTAL, "Total number of actions reduced by the store");
    describe_counter!(ACTIONS_REJECTED, "Actions rejected because the store was shutting down");
    describe_counter!(EFFECTS_EXECUTED, "Total number of effects executed");
    describe_counter!(SAGAS_MATCHED, "Saga runs started by a matching action");
    describe_counter!(SAGAS_CANCELLED, "Saga runs cancelled by a newer matching action");
    describe_histogram!(REDUCER_DURATION, "Time taken to reduce one action");
    describe_gauge!(EFFECTS_PENDING, "Spawned effect tasks still running");
}

/// Recorder helpers used by the store.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one reduced action.
    pub fn record_action(duration: Duration) {
        counter!(ACTIONS_TOTAL).increment(1);
        histogram!(REDUCER_DURATION).record(duration.as_secs_f64());
    }

    /// Record an action rejected during shutdown.
    pub fn record_rejected() {
        counter!(ACTIONS_REJECTED).increment(1);
    }

    /// Record one executed effect of kind `kind`.
    pub fn record_effect(kind: &'static str) {
        counter!(EFFECTS_EXECUTED, "type" => kind).increment(1);
    }

    /// Record a saga run started in `mode`.
    pub fn record_saga(mode: &'static str) {
        counter!(SAGAS_MATCHED, "mode" => mode).increment(1);
    }

    /// Record a cancelled `take_latest` run.
    pub fn record_cancelled() {
        counter!(SAGAS_CANCELLED).increment(1);
    }

    /// Record the number of effect tasks in flight.
    #[allow(clippy::cast_precision_loss)] // Pending task counts stay far below 2^52
    pub fn record_pending(pending: usize) {
        gauge!(EFFECTS_PENDING).set(pending as f64);
    }
}
