//! Endpoint failover selection.
//!
//! [`EndpointSelector::check_availability`] asks every candidate endpoint of a provider for its
//! block height at once, keeps the endpoints reporting the highest height, picks one of them
//! uniformly at random and commits it as the provider's selected endpoint.
//!
//! Probes that time out, fail or return garbage count as "no data". If no probe answers, the
//! provider keeps its last selection: a flaky network never takes away a last-known-good endpoint.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use rand::{Rng, seq::SliceRandom};
use url::Url;

use crate::{
    coalesce::Coalescer,
    rpc::RpcClient,
    store::Store,
    timeout::{DEFAULT_CALL_TIMEOUT, race_result},
    types::ProviderId,
};

/// Result of one availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `endpoint` reported the highest block height and is now the provider's selection.
    Selected { endpoint: Url, block_number: u64 },
    /// No endpoint answered, or the chosen one was dropped from the configuration meanwhile.
    Unchanged,
    /// No provider with that id is stored.
    ProviderNotFound,
}

/// One endpoint's answer; `None` when the probe failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub endpoint: Url,
    pub block_number: Option<u64>,
}

/// Picks a live, maximally-synced endpoint for a provider.
///
/// Cheap to clone; clones share the store, client and in-flight bookkeeping. Concurrent checks for
/// the same provider are coalesced into one probe round.
pub struct EndpointSelector<C> {
    store: Arc<Store>,
    client: Arc<C>,
    call_timeout: Duration,
    in_flight: Coalescer<ProviderId, Selection>,
}

impl<C> Clone for EndpointSelector<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            client: self.client.clone(),
            call_timeout: self.call_timeout,
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<C: RpcClient> EndpointSelector<C> {
    #[must_use]
    pub fn new(store: Arc<Store>, client: Arc<C>) -> Self {
        Self { store, client, call_timeout: DEFAULT_CALL_TIMEOUT, in_flight: Coalescer::new() }
    }

    /// Set the per-probe deadline.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Probe the provider's endpoints and commit the best-synced one.
    ///
    /// Never fails: network trouble yields [`Selection::Unchanged`].
    pub async fn check_availability(&self, provider_id: &str) -> Selection {
        let this = self.clone();
        let id = provider_id.to_owned();
        self.in_flight
            .run(provider_id.to_owned(), move || async move { this.select(&id).await })
            .await
    }

    async fn select(&self, provider_id: &str) -> Selection {
        let Some(provider) = self.store.provider(provider_id) else {
            debug!(provider_id = %provider_id, "Provider not found, skipping availability check");
            return Selection::ProviderNotFound;
        };

        let probes = self.probe_all(&provider.rpc_endpoints).await;
        let best = {
            let mut rng = rand::thread_rng();
            choose_best(&probes, &mut rng)
        };
        let Some((endpoint, block_number)) = best else {
            warn!(
                provider_id = %provider_id,
                endpoints = probes.len(),
                "No endpoint answered, keeping current selection"
            );
            return Selection::Unchanged;
        };

        let committed = self.store.write(|txn| txn.set_selected_endpoint(provider_id, &endpoint));
        if !committed {
            warn!(
                provider_id = %provider_id,
                endpoint = %endpoint,
                "Chosen endpoint no longer configured, keeping current selection"
            );
            return Selection::Unchanged;
        }

        info!(
            provider_id = %provider_id,
            endpoint = %endpoint,
            block_number = block_number,
            "Selected endpoint"
        );
        Selection::Selected { endpoint, block_number }
    }

    /// Query every endpoint concurrently; all requests are issued before any is awaited.
    async fn probe_all(&self, endpoints: &[Url]) -> Vec<Probe> {
        let requests = endpoints.iter().map(|endpoint| async move {
            let result =
                race_result(self.call_timeout, self.client.block_number(endpoint)).await;
            let block_number = match result {
                Ok(height) => Some(height),
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "Endpoint probe failed");
                    None
                }
            };
            Probe { endpoint: endpoint.clone(), block_number }
        });
        join_all(requests).await
    }
}

/// Pick uniformly among the endpoints reporting the maximum height.
///
/// Returns `None` if no probe succeeded.
pub fn choose_best<R: Rng + ?Sized>(probes: &[Probe], rng: &mut R) -> Option<(Url, u64)> {
    let max_block = probes.iter().filter_map(|p| p.block_number).max()?;
    let most_synced: Vec<&Probe> =
        probes.iter().filter(|p| p.block_number == Some(max_block)).collect();
    most_synced.choose(rng).map(|p| (p.endpoint.clone(), max_block))
}
