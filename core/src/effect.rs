//! Effect and saga descriptors.
//!
//! Effects describe side effects to be performed by a runtime. They are
//! values, not execution: the core only collects them (from sagas and
//! thunks) and hands them to whatever runtime drives the store.

use crate::action::Action;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Effect type - describes a side effect to be executed
///
/// Actions produced by an effect are fed back into the store.
pub enum Effect {
    /// No-op effect
    None,

    /// Dispatch an action right away
    Dispatch(Action),

    /// Run effects in parallel
    Parallel(Vec<Effect>),

    /// Run effects sequentially
    Sequential(Vec<Effect>),

    /// Delayed action (fake latency, timeouts, polling)
    Delay {
        /// How long to wait
        duration: Duration,
        /// Action to dispatch after delay
        action: Box<Action>,
    },

    /// Arbitrary async computation
    ///
    /// Returns `Option<Action>` - if Some, the action is dispatched
    Future(BoxFuture<'static, Option<Action>>),
}

// Manual Debug implementation since Future doesn't implement Debug
impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Dispatch(action) => f.debug_tuple("Effect::Dispatch").field(action).finish(),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => f.debug_tuple("Effect::Sequential").field(effects).finish(),
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
        }
    }
}

impl Effect {
    /// Combine effects to run in parallel
    #[must_use]
    pub const fn merge(effects: Vec<Effect>) -> Effect {
        Effect::Parallel(effects)
    }

    /// Chain effects to run sequentially
    #[must_use]
    pub const fn chain(effects: Vec<Effect>) -> Effect {
        Effect::Sequential(effects)
    }

    /// Wrap an async computation
    pub fn future<F>(fut: F) -> Effect
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        Effect::Future(Box::pin(fut))
    }

    /// Whether this effect does nothing
    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Effect::None => true,
            Effect::Parallel(effects) | Effect::Sequential(effects) => effects.iter().all(Effect::is_none),
            _ => false,
        }
    }
}

/// Runs a saga worker for each matching action
pub type Worker = Arc<dyn Fn(&Action) -> Effect + Send + Sync>;

/// How a saga treats overlapping runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeMode {
    /// Every matching action starts a new run
    Every,
    /// A new matching action cancels the run still in flight
    Latest,
}

/// A saga descriptor: which action types to watch and what to run
///
/// The core treats sagas as opaque; a runtime subscribes them to the
/// action stream.
#[derive(Clone)]
pub struct Saga {
    patterns: Vec<String>,
    mode: TakeMode,
    worker: Worker,
}

/// Run `worker` for every action whose type is in `patterns`.
pub fn take_every<I, P, F>(patterns: I, worker: F) -> Saga
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
    F: Fn(&Action) -> Effect + Send + Sync + 'static,
{
    Saga::new(patterns, TakeMode::Every, worker)
}

/// Run `worker` for matching actions, cancelling the previous run.
pub fn take_latest<I, P, F>(patterns: I, worker: F) -> Saga
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
    F: Fn(&Action) -> Effect + Send + Sync + 'static,
{
    Saga::new(patterns, TakeMode::Latest, worker)
}

impl Saga {
    fn new<I, P, F>(patterns: I, mode: TakeMode, worker: F) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
        F: Fn(&Action) -> Effect + Send + Sync + 'static,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            mode,
            worker: Arc::new(worker),
        }
    }

    /// Watched action types
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Overlap behaviour
    #[must_use]
    pub const fn mode(&self) -> TakeMode {
        self.mode
    }

    /// Whether `action` triggers this saga
    #[must_use]
    pub fn matches(&self, action: &Action) -> bool {
        self.patterns.iter().any(|p| *p == action.action_type)
    }

    /// Produce the effect for a matching action
    #[must_use]
    pub fn run(&self, action: &Action) -> Effect {
        (self.worker)(action)
    }
}

impl fmt::Debug for Saga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saga")
            .field("patterns", &self.patterns)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saga_matching() {
        let saga = take_every(["user/login", "user/refresh"], |_| Effect::None);
        assert!(saga.matches(&Action::new("user/login")));
        assert!(saga.matches(&Action::new("user/refresh")));
        assert!(!saga.matches(&Action::new("user/logout")));
        assert_eq!(saga.mode(), TakeMode::Every);
    }

    #[test]
    fn test_saga_runs_worker() {
        let saga = take_latest(["user/login"], |action| {
            Effect::Dispatch(Action::new("user/loginSuccess").with_payload(action.payload_or_null()))
        });
        assert_eq!(saga.mode(), TakeMode::Latest);
        let effect = saga.run(&Action::new("user/login").with_payload(serde_json::json!("jane")));
        assert!(matches!(effect, Effect::Dispatch(ref a) if a.is("user/loginSuccess")));
    }

    #[test]
    fn test_future_effect_resolves() {
        let effect = Effect::future(async { Some(Action::new("done")) });
        let Effect::Future(fut) = effect else {
            unreachable!("constructed a future effect");
        };
        assert_eq!(tokio_test::block_on(fut), Some(Action::new("done")));
    }

    #[test]
    fn test_is_none() {
        assert!(Effect::None.is_none());
        assert!(Effect::merge(vec![Effect::None, Effect::chain(vec![])]).is_none());
        assert!(!Effect::Dispatch(Action::new("x")).is_none());
    }
}
