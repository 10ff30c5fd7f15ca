//! Capturing the engine's last-error code.
//!
//! The engine keeps its failure code in a per-thread slot that the next engine
//! call may overwrite. Every call site goes through [`attempt`], which reads
//! the slot directly after the failing call and before control returns to code
//! that could touch the engine again.

use crate::engine::Engine;
use crate::error::{Cause, Error, Operation, Result};

/// Runs one engine call. `None` from the call means failure, and the cause is
/// read from the engine before returning.
pub(crate) fn attempt<E, T, F>(engine: &E, call: F) -> std::result::Result<T, Cause>
where
    E: Engine + ?Sized,
    F: FnOnce(&E) -> Option<T>,
{
    match call(engine) {
        Some(value) => Ok(value),
        None => Err(Cause(engine.last_error())),
    }
}

/// [`attempt`] for calls with no negative-but-valid outcome.
pub(crate) fn translate<E, T, F>(engine: &E, operation: Operation, call: F) -> Result<T>
where
    E: Engine + ?Sized,
    F: FnOnce(&E) -> Option<T>,
{
    attempt(engine, call).map_err(|cause| {
        tracing::debug!(operation = operation.kind(), cause = cause.code(), "engine call failed");
        Error::engine(operation, cause)
    })
}
