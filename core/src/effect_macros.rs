//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use reducktion_core::async_effect;
///
/// async_effect! {
///     match api.fetch_orders().await {
///         Ok(orders) => Some(fetch_orders.success(orders)),
///         Err(e) => Some(fetch_orders.fail(json!(e.to_string()))),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use reducktion_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_millis(400),
///     action: fetch_orders.success(json!([]))
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Dispatch`, or a sequence of them
///
/// # Example
///
/// ```rust,ignore
/// use reducktion_core::put;
///
/// put!(settings.call("toggleGps")?);
/// put![first_action, second_action];
/// ```
#[macro_export]
macro_rules! put {
    ($action:expr) => {
        $crate::effect::Effect::Dispatch($action)
    };
    ($($action:expr),+ $(,)?) => {
        $crate::effect::Effect::Sequential(::std::vec![
            $($crate::effect::Effect::Dispatch($action)),+
        ])
    };
}
