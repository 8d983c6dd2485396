//! Failure boundaries for instrumentation code
//!
//! Everything the instrumentation runs on behalf of the host (listeners,
//! request hooks, snapshot computation) goes through [`best_effort`]. Errors
//! and panics stop at the boundary and are logged at debug level only, so
//! the host player's own call stack never observes them.

use crate::host::Listener;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::debug;

/// Run `f`, discarding any error or panic it produces
pub fn best_effort<F>(context: &'static str, f: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let _ = best_effort_value(context, f);
}

/// Run `f`, returning its value or `None` on error or panic
pub fn best_effort_value<T, F>(context: &'static str, f: F) -> Option<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(error)) => {
            debug!(context, error = %error, "Instrumentation fault swallowed");
            None
        }
        Err(_) => {
            debug!(context, "Instrumentation panic swallowed");
            None
        }
    }
}

/// Wrap a fallible callback into a listener with its own failure boundary
pub fn guarded<F>(context: &'static str, f: F) -> Listener
where
    F: Fn() -> anyhow::Result<()> + 'static,
{
    Rc::new(move || best_effort(context, &f))
}
