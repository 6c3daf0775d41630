//! Event handler capability.

use std::panic::{AssertUnwindSafe, catch_unwind};

/// Error returned by an [`EventHandler`].
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives every assembled event payload.
///
/// Invoked synchronously on the client's stream task, once per event, in
/// stream order. An `Err` or a panic is logged and counted; it never aborts
/// the stream or the reconnect loop.
///
/// Closures taking a `String` implement this trait:
///
/// ```
/// use turbosse::{EventHandler, HandlerError};
///
/// let handler = |payload: String| -> Result<(), HandlerError> {
///     println!("{payload}");
///     Ok(())
/// };
/// handler.handle("hello".to_string()).unwrap();
/// ```
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one event payload.
    ///
    /// # Errors
    ///
    /// Any error is reported by the caller and otherwise ignored.
    fn handle(&self, payload: String) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(String) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, payload: String) -> Result<(), HandlerError> {
        self(payload)
    }
}

/// Outcome of delivering one payload.
#[derive(Debug)]
pub(crate) enum Delivery {
    Delivered,
    Failed(String),
}

/// Call the handler, containing both returned errors and panics.
pub(crate) fn deliver(handler: &dyn EventHandler, payload: String) -> Delivery {
    match catch_unwind(AssertUnwindSafe(|| handler.handle(payload))) {
        Ok(Ok(())) => Delivery::Delivered,
        Ok(Err(e)) => Delivery::Failed(e.to_string()),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            Delivery::Failed(format!("panic: {reason}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_handler_receives_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |payload: String| -> Result<(), HandlerError> {
            sink.lock().unwrap().push(payload);
            Ok(())
        };

        assert!(matches!(
            deliver(&handler, "one".to_string()),
            Delivery::Delivered
        ));
        assert_eq!(*seen.lock().unwrap(), vec!["one".to_string()]);
    }

    #[test]
    fn test_handler_error_is_contained() {
        let handler = |_: String| -> Result<(), HandlerError> { Err("rejected".into()) };
        match deliver(&handler, "x".to_string()) {
            Delivery::Failed(reason) => assert_eq!(reason, "rejected"),
            Delivery::Delivered => panic!("expected failure"),
        }
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let handler = |payload: String| -> Result<(), HandlerError> {
            panic!("cannot handle {payload}");
        };
        match deliver(&handler, "x".to_string()) {
            Delivery::Failed(reason) => assert_eq!(reason, "panic: cannot handle x"),
            Delivery::Delivered => panic!("expected failure"),
        }
    }

    struct Counting(Mutex<usize>);

    impl EventHandler for Counting {
        fn handle(&self, _payload: String) -> Result<(), HandlerError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_struct_handler() {
        let handler = Counting(Mutex::new(0));
        deliver(&handler, "a".to_string());
        deliver(&handler, "b".to_string());
        assert_eq!(*handler.0.lock().unwrap(), 2);
    }
}
