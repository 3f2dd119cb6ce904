use std::{collections::HashMap, sync::Arc};

use alloy::{
    network::Ethereum,
    primitives::TxHash,
    providers::{Provider as _, RootProvider},
    transports::{RpcError, TransportErrorKind},
};
use parking_lot::Mutex;
use thiserror::Error;
use url::Url;

use crate::timeout::Elapsed;

/// Errors produced while talking to a single endpoint.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The call did not complete before its deadline.
    #[error("Operation timed out")]
    Timeout,

    /// Connection-level or JSON-RPC failure reported by the transport.
    #[error("RPC error: {0}")]
    Transport(Arc<RpcError<TransportErrorKind>>),

    /// The endpoint answered with something that could not be interpreted.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// An endpoint string could not be parsed as an `http(s)` URL.
    #[error("Invalid endpoint url: {0}")]
    InvalidEndpoint(String),
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::Timeout
    }
}

/// Receipt data the poller needs to decide whether a transaction is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    /// Block the transaction was included in, `None` while it sits in the mempool.
    pub block_number: Option<u64>,
    /// Number of blocks on top of (and including) the inclusion block.
    pub confirmations: u64,
}

impl TransactionReceipt {
    /// Build a receipt from the inclusion block and the endpoint's current height.
    #[must_use]
    pub fn from_heights(hash: TxHash, block_number: Option<u64>, latest_block: u64) -> Self {
        let confirmations = match block_number {
            Some(mined) if latest_block >= mined => latest_block - mined + 1,
            _ => 0,
        };
        Self { hash, block_number, confirmations }
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmations > 0
    }
}

/// Request surface consumed by the selector and the poller.
///
/// Implementations issue exactly one logical request per call. A failure of any kind is reported as
/// an [`Error`]; deadlines are imposed by the caller.
pub trait RpcClient: Send + Sync + 'static {
    /// Current block height reported by `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the endpoint is unreachable or answers with an error.
    fn block_number(&self, endpoint: &Url) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Receipt of `hash` as seen by `endpoint`, `None` if the endpoint does not know it.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the endpoint is unreachable or answers with an error.
    fn transaction_receipt(
        &self,
        endpoint: &Url,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>, Error>> + Send;
}

/// [`RpcClient`] backed by Alloy HTTP providers.
///
/// One [`RootProvider`] is created lazily per endpoint and reused for later calls.
#[derive(Debug, Default, Clone)]
pub struct AlloyRpcClient {
    providers: Arc<Mutex<HashMap<Url, RootProvider<Ethereum>>>>,
}

impl AlloyRpcClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn provider_for(&self, endpoint: &Url) -> RootProvider<Ethereum> {
        let mut providers = self.providers.lock();
        providers
            .entry(endpoint.clone())
            .or_insert_with(|| {
                trace!(endpoint = %endpoint, "Creating HTTP provider");
                RootProvider::<Ethereum>::new_http(endpoint.clone())
            })
            .clone()
    }
}

impl RpcClient for AlloyRpcClient {
    async fn block_number(&self, endpoint: &Url) -> Result<u64, Error> {
        debug!(endpoint = %endpoint, "eth_blockNumber called");
        let provider = self.provider_for(endpoint);
        let result = provider.get_block_number().await;
        if let Err(e) = &result {
            debug!(endpoint = %endpoint, error = %e, "eth_blockNumber failed");
        }
        Ok(result?)
    }

    async fn transaction_receipt(
        &self,
        endpoint: &Url,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, Error> {
        debug!(endpoint = %endpoint, hash = %hash, "eth_getTransactionReceipt called");
        let provider = self.provider_for(endpoint);

        let Some(receipt) = provider.get_transaction_receipt(hash).await? else {
            return Ok(None);
        };

        if receipt.transaction_hash != hash {
            return Err(Error::MalformedResponse(format!(
                "receipt for {} returned for {hash}",
                receipt.transaction_hash
            )));
        }

        let latest_block = match receipt.block_number {
            Some(_) => provider.get_block_number().await?,
            None => 0,
        };

        Ok(Some(TransactionReceipt::from_heights(hash, receipt.block_number, latest_block)))
    }
}
