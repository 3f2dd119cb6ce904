//! Deadline race for network-facing futures.
//!
//! [`race`] polls an operation against a deadline. When the deadline wins the caller gets
//! [`Elapsed`] and stops waiting; the operation is dropped, not cancelled at the network layer, so a
//! request already on the wire may still complete and its result is discarded.

use std::time::Duration;

use thiserror::Error;

/// Deadline applied to every RPC call unless configured otherwise.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(15_000);

/// The deadline passed before the operation completed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation timed out after {0:?}")]
pub struct Elapsed(pub Duration);

/// Await `operation` for at most `deadline`.
///
/// # Errors
///
/// Returns [`Elapsed`] if `deadline` passes first.
pub async fn race<F>(deadline: Duration, operation: F) -> Result<F::Output, Elapsed>
where
    F: IntoFuture,
{
    tokio::time::timeout(deadline, operation).await.map_err(|_| Elapsed(deadline))
}

/// Like [`race`], for fallible operations: the deadline error is folded into the operation's own
/// error type.
///
/// # Errors
///
/// Returns the operation's error, or `E::from(Elapsed)` if `deadline` passes first.
pub async fn race_result<F, T, E>(deadline: Duration, operation: F) -> Result<T, E>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    race(deadline, operation).await.map_err(E::from)?
}

/// Method-call form of [`race`].
pub trait WithDeadline: IntoFuture + Sized {
    /// Race `self` against `deadline`.
    fn with_deadline(self, deadline: Duration) -> impl Future<Output = Result<Self::Output, Elapsed>> {
        race(deadline, self)
    }

    /// Race `self` against [`DEFAULT_CALL_TIMEOUT`].
    fn with_default_deadline(self) -> impl Future<Output = Result<Self::Output, Elapsed>> {
        race(DEFAULT_CALL_TIMEOUT, self)
    }
}

impl<F: IntoFuture> WithDeadline for F {}
