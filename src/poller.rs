//! Transaction confirmation polling.
//!
//! [`ConfirmationPoller::check`] moves one transaction from pending to confirmed once the provider's
//! active endpoint reports a receipt with at least one confirmation. It performs a single attempt;
//! re-polling is up to whoever triggers it (transaction creation, wallet re-sync, push messages).

use std::{sync::Arc, time::Duration};

use alloy::primitives::TxHash;

use crate::{
    rpc::RpcClient,
    store::Store,
    timeout::{DEFAULT_CALL_TIMEOUT, race_result},
};

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The transaction went from pending to confirmed.
    Confirmed,
    /// Nothing to do, the transaction was confirmed before.
    AlreadyConfirmed,
    /// The endpoint has no receipt yet, or one without confirmations.
    Pending,
    /// The transaction, its provider or any endpoint of the provider is missing.
    NotFound,
    /// The request failed or timed out; the transaction stays pending.
    Failed,
}

/// Advances pending transactions to confirmed.
///
/// Never returns an error: network failures are logged and leave the transaction pending.
pub struct ConfirmationPoller<C> {
    store: Arc<Store>,
    client: Arc<C>,
    call_timeout: Duration,
}

impl<C> Clone for ConfirmationPoller<C> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), client: self.client.clone(), call_timeout: self.call_timeout }
    }
}

impl<C: RpcClient> ConfirmationPoller<C> {
    #[must_use]
    pub fn new(store: Arc<Store>, client: Arc<C>) -> Self {
        Self { store, client, call_timeout: DEFAULT_CALL_TIMEOUT }
    }

    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Poll the receipt of `hash` once and record its confirmation.
    pub async fn check(&self, hash: TxHash) -> PollOutcome {
        let Some(transaction) = self.store.transaction(&hash) else {
            debug!(hash = %hash, "Transaction not found, skipping confirmation check");
            return PollOutcome::NotFound;
        };
        if transaction.confirmed {
            trace!(hash = %hash, "Transaction already confirmed");
            return PollOutcome::AlreadyConfirmed;
        }

        let Some(provider) = self.store.provider(&transaction.provider_id) else {
            debug!(
                hash = %hash,
                provider_id = %transaction.provider_id,
                "Provider not found, skipping confirmation check"
            );
            return PollOutcome::NotFound;
        };
        let Some(endpoint) = provider.active_endpoint().cloned() else {
            warn!(provider_id = %provider.id, "Provider has no endpoint configured");
            return PollOutcome::NotFound;
        };

        let receipt =
            match race_result(self.call_timeout, self.client.transaction_receipt(&endpoint, hash))
                .await
            {
                Ok(receipt) => receipt,
                Err(e) => {
                    error!(
                        hash = %hash,
                        endpoint = %endpoint,
                        error = %e,
                        "Failed to fetch transaction receipt"
                    );
                    return PollOutcome::Failed;
                }
            };

        match receipt {
            Some(receipt) if receipt.is_confirmed() => {
                if self.store.write(|txn| txn.set_transaction_confirmed(&hash)) {
                    info!(
                        hash = %hash,
                        confirmations = receipt.confirmations,
                        "Transaction confirmed"
                    );
                    PollOutcome::Confirmed
                } else {
                    // confirmed by a concurrent poll
                    PollOutcome::AlreadyConfirmed
                }
            }
            _ => {
                debug!(hash = %hash, endpoint = %endpoint, "Transaction still pending");
                PollOutcome::Pending
            }
        }
    }

    /// Poll every pending transaction once, one after another.
    pub async fn check_pending(&self) -> Vec<(TxHash, PollOutcome)> {
        let pending = self.store.transactions_where(|t| !t.confirmed);
        let mut outcomes = Vec::with_capacity(pending.len());
        for transaction in pending {
            let outcome = self.check(transaction.hash).await;
            outcomes.push((transaction.hash, outcome));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rpc::TransactionReceipt,
        test_utils::{EndpointBehavior, MockRpcClient},
        types::{Provider, Transaction},
    };
    use alloy::primitives::b256;

    const HASH: TxHash = b256!("0x2222222222222222222222222222222222222222222222222222222222222222");
    const OTHER: TxHash = b256!("0x3333333333333333333333333333333333333333333333333333333333333333");

    fn setup(client: &MockRpcClient) -> (Arc<Store>, ConfirmationPoller<MockRpcClient>) {
        let store = Arc::new(Store::new());
        store.write(|txn| {
            txn.upsert_provider(
                Provider::new("haqq", 11235, ["https://a.example", "https://b.example"]).unwrap(),
            );
            txn.insert_transaction(Transaction::pending(HASH, "haqq"));
        });
        let poller = ConfirmationPoller::new(store.clone(), Arc::new(client.clone()));
        (store, poller)
    }

    #[tokio::test]
    async fn receipt_with_confirmations_confirms() {
        let client = MockRpcClient::new()
            .with_endpoint("https://a.example", EndpointBehavior::Height(10))
            .with_receipt(TransactionReceipt::from_heights(HASH, Some(10), 10));
        let (store, poller) = setup(&client);

        assert_eq!(poller.check(HASH).await, PollOutcome::Confirmed);
        assert!(store.transaction(&HASH).unwrap().confirmed);
    }

    #[tokio::test]
    async fn second_poll_is_a_no_op() {
        let client = MockRpcClient::new()
            .with_endpoint("https://a.example", EndpointBehavior::Height(10))
            .with_receipt(TransactionReceipt::from_heights(HASH, Some(10), 12));
        let (store, poller) = setup(&client);
        poller.check(HASH).await;
        let mut changes = store.subscribe();

        assert_eq!(poller.check(HASH).await, PollOutcome::AlreadyConfirmed);
        assert_eq!(poller.check(HASH).await, PollOutcome::AlreadyConfirmed);

        assert!(changes.try_recv().is_err());
        assert_eq!(client.receipt_calls().len(), 1);
    }

    #[tokio::test]
    async fn unmined_receipt_stays_pending() {
        let client = MockRpcClient::new()
            .with_endpoint("https://a.example", EndpointBehavior::Height(10))
            .with_receipt(TransactionReceipt::from_heights(HASH, None, 10));
        let (store, poller) = setup(&client);

        assert_eq!(poller.check(HASH).await, PollOutcome::Pending);
        assert!(!store.transaction(&HASH).unwrap().confirmed);
    }

    #[tokio::test]
    async fn unknown_receipt_stays_pending() {
        let client =
            MockRpcClient::new().with_endpoint("https://a.example", EndpointBehavior::Height(10));
        let (_, poller) = setup(&client);

        assert_eq!(poller.check(HASH).await, PollOutcome::Pending);
    }

    #[tokio::test]
    async fn network_failure_is_swallowed() {
        let client = MockRpcClient::new().with_endpoint("https://a.example", EndpointBehavior::Fail);
        let (store, poller) = setup(&client);

        assert_eq!(poller.check(HASH).await, PollOutcome::Failed);
        assert!(!store.transaction(&HASH).unwrap().confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_endpoint_times_out() {
        let client = MockRpcClient::new().with_endpoint("https://a.example", EndpointBehavior::Hang);
        let (store, poller) = setup(&client);

        assert_eq!(poller.check(HASH).await, PollOutcome::Failed);
        assert!(!store.transaction(&HASH).unwrap().confirmed);
    }

    #[tokio::test]
    async fn uses_selected_endpoint() {
        let client = MockRpcClient::new()
            .with_endpoint("https://b.example", EndpointBehavior::Height(10))
            .with_receipt(TransactionReceipt::from_heights(HASH, Some(9), 10));
        let (store, poller) = setup(&client);
        let selected: url::Url = "https://b.example".parse().unwrap();
        store.write(|txn| txn.set_selected_endpoint("haqq", &selected));

        assert_eq!(poller.check(HASH).await, PollOutcome::Confirmed);
        assert_eq!(client.receipt_calls(), vec![(selected, HASH)]);
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let client = MockRpcClient::new();
        let (store, poller) = setup(&client);
        store.write(|txn| txn.insert_transaction(Transaction::pending(OTHER, "gone")));

        assert_eq!(poller.check(TxHash::repeat_byte(0x44)).await, PollOutcome::NotFound);
        assert_eq!(poller.check(OTHER).await, PollOutcome::NotFound);
        assert!(client.receipt_calls().is_empty());
    }

    #[tokio::test]
    async fn check_pending_polls_every_pending_transaction() {
        let client = MockRpcClient::new()
            .with_endpoint("https://a.example", EndpointBehavior::Height(10))
            .with_receipt(TransactionReceipt::from_heights(HASH, Some(10), 10));
        let (store, poller) = setup(&client);
        store.write(|txn| txn.insert_transaction(Transaction::pending(OTHER, "haqq")));

        let outcomes = poller.check_pending().await;

        assert_eq!(outcomes, vec![(HASH, PollOutcome::Confirmed), (OTHER, PollOutcome::Pending)]);
        assert!(poller.check_pending().await.iter().all(|(hash, _)| *hash == OTHER));
    }
}
