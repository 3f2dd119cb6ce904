use std::{
    collections::{HashMap, HashSet},
    future::pending,
    sync::Arc,
};

use alloy::{primitives::TxHash, transports::TransportErrorKind};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use url::Url;

use crate::{
    SyncError,
    backup::KeyMaterialProbe,
    rpc::{Error, IntoEndpointUrl, RpcClient, TransactionReceipt},
};

/// How a mocked endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointBehavior {
    /// Answers every call; reports this block height.
    Height(u64),
    /// Never answers.
    Hang,
    /// Refuses every connection.
    Fail,
}

#[derive(Debug, Default)]
struct RpcState {
    endpoints: HashMap<Url, EndpointBehavior>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    block_number_calls: Vec<Url>,
    receipt_calls: Vec<(Url, TxHash)>,
}

/// Scriptable [`RpcClient`]. Unknown endpoints refuse connections.
///
/// Clones share their script and call log.
#[derive(Debug, Clone, Default)]
pub struct MockRpcClient {
    state: Arc<Mutex<RpcState>>,
}

impl MockRpcClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_endpoint(self, endpoint: impl IntoEndpointUrl, behavior: EndpointBehavior) -> Self {
        self.set_endpoint(endpoint, behavior);
        self
    }

    #[must_use]
    pub fn with_receipt(self, receipt: TransactionReceipt) -> Self {
        self.state.lock().receipts.insert(receipt.hash, receipt);
        self
    }

    /// Change an endpoint's behavior for later calls.
    ///
    /// # Panics
    ///
    /// If `endpoint` is not a valid endpoint URL.
    pub fn set_endpoint(&self, endpoint: impl IntoEndpointUrl, behavior: EndpointBehavior) {
        let endpoint = endpoint.into_endpoint_url().expect("mock endpoint must be a valid URL");
        self.state.lock().endpoints.insert(endpoint, behavior);
    }

    pub fn set_receipt(&self, receipt: TransactionReceipt) {
        self.state.lock().receipts.insert(receipt.hash, receipt);
    }

    /// Endpoints asked for their block height, in call order.
    #[must_use]
    pub fn block_number_calls(&self) -> Vec<Url> {
        self.state.lock().block_number_calls.clone()
    }

    /// Receipt requests, in call order.
    #[must_use]
    pub fn receipt_calls(&self) -> Vec<(Url, TxHash)> {
        self.state.lock().receipt_calls.clone()
    }

    fn behavior(&self, endpoint: &Url) -> EndpointBehavior {
        self.state.lock().endpoints.get(endpoint).copied().unwrap_or(EndpointBehavior::Fail)
    }
}

fn refused() -> Error {
    Error::from(TransportErrorKind::custom_str("connection refused"))
}

impl RpcClient for MockRpcClient {
    fn block_number(&self, endpoint: &Url) -> impl Future<Output = Result<u64, Error>> + Send {
        self.state.lock().block_number_calls.push(endpoint.clone());
        let behavior = self.behavior(endpoint);
        async move {
            match behavior {
                EndpointBehavior::Height(height) => Ok(height),
                EndpointBehavior::Hang => pending().await,
                EndpointBehavior::Fail => Err(refused()),
            }
        }
    }

    fn transaction_receipt(
        &self,
        endpoint: &Url,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>, Error>> + Send {
        let (behavior, receipt) = {
            let mut state = self.state.lock();
            state.receipt_calls.push((endpoint.clone(), hash));
            let receipt = state.receipts.get(&hash).copied();
            (state.endpoints.get(endpoint).copied().unwrap_or(EndpointBehavior::Fail), receipt)
        };
        async move {
            match behavior {
                EndpointBehavior::Height(_) => Ok(receipt),
                EndpointBehavior::Hang => pending().await,
                EndpointBehavior::Fail => Err(refused()),
            }
        }
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    unsaved: HashSet<String>,
    failure: Option<SyncError>,
    calls: Vec<String>,
}

/// Scriptable [`KeyMaterialProbe`]: every account group is saved unless marked otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl MockProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unsaved(self, account_id: &str) -> Self {
        self.state.lock().unsaved.insert(account_id.to_owned());
        self
    }

    /// Fail every probe with `error`.
    #[must_use]
    pub fn failing(self, error: SyncError) -> Self {
        self.state.lock().failure = Some(error);
        self
    }

    /// Account groups probed, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

impl KeyMaterialProbe for MockProbe {
    fn is_saved<'a>(&'a self, account_id: &'a str) -> BoxFuture<'a, Result<bool, SyncError>> {
        let result = {
            let mut state = self.state.lock();
            state.calls.push(account_id.to_owned());
            match &state.failure {
                Some(error) => Err(error.clone()),
                None => Ok(!state.unsaved.contains(account_id)),
            }
        };
        Box::pin(async move { result })
    }
}
