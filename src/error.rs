use std::mem::discriminant;

use thiserror::Error;

use crate::{rpc::Error as RpcError, timeout::Elapsed};

/// Errors surfaced by the synchronization core.
///
/// The selector and the poller never return these for network trouble: they log and leave state
/// unchanged. Errors reach callers from the backup reminder (precondition and probe failures) and
/// from event handlers through [`EmitHandle::wait`](crate::EmitHandle::wait).
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// A network call exceeded its deadline.
    #[error("Operation timed out")]
    Timeout,

    /// Connection-level or JSON-RPC failure.
    #[error("RPC error: {0}")]
    Rpc(RpcError),

    /// A referenced record is not in the store.
    #[error("{0} not found")]
    NotFound(String),

    /// A platform capability required by a custody probe is unavailable (e.g. cloud storage).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A custody probe failed for another reason.
    #[error("Probe failed: {0}")]
    Probe(String),

    /// An event handler panicked or its task was aborted.
    #[error("Handler failed: {0}")]
    Handler(String),

    /// A builder setting is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<RpcError> for SyncError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Timeout => SyncError::Timeout,
            other => SyncError::Rpc(other),
        }
    }
}

impl From<Elapsed> for SyncError {
    fn from(_: Elapsed) -> Self {
        SyncError::Timeout
    }
}

impl PartialEq for SyncError {
    /// Errors compare by kind only.
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}
