use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::rpc::{Error as RpcError, IntoEndpointUrl};

/// Identifier of a [`Provider`] record.
pub type ProviderId = String;

/// Identifier shared by every wallet derived from the same underlying secret.
pub type AccountId = String;

/// Configuration of one blockchain network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub chain_id: u64,
    /// Candidate RPC endpoints, in configuration order.
    pub rpc_endpoints: Vec<Url>,
    /// Endpoint chosen by the selector. Not cleared when the candidate list later drops it.
    #[serde(default)]
    pub selected_endpoint: Option<Url>,
    /// Explorer link template; `{tx_hash}` is replaced by the transaction hash.
    #[serde(default)]
    pub explorer_url: Option<String>,
}

impl Provider {
    /// Create a provider with no endpoint selected yet.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidEndpoint`] if any endpoint is not an `http(s)` URL.
    pub fn new<I, E>(id: impl Into<ProviderId>, chain_id: u64, endpoints: I) -> Result<Self, RpcError>
    where
        I: IntoIterator<Item = E>,
        E: IntoEndpointUrl,
    {
        let rpc_endpoints =
            endpoints.into_iter().map(IntoEndpointUrl::into_endpoint_url).collect::<Result<_, _>>()?;
        Ok(Self {
            id: id.into(),
            chain_id,
            rpc_endpoints,
            selected_endpoint: None,
            explorer_url: None,
        })
    }

    #[must_use]
    pub fn with_explorer_url(mut self, template: impl Into<String>) -> Self {
        self.explorer_url = Some(template.into());
        self
    }

    /// Endpoint network calls should use: the selected one, or the first candidate if the selector
    /// has not run yet.
    #[must_use]
    pub fn active_endpoint(&self) -> Option<&Url> {
        self.selected_endpoint.as_ref().or_else(|| self.rpc_endpoints.first())
    }

    #[must_use]
    pub fn is_candidate(&self, endpoint: &Url) -> bool {
        self.rpc_endpoints.contains(endpoint)
    }

    #[must_use]
    pub fn explorer_tx_url(&self, hash: &TxHash) -> Option<String> {
        self.explorer_url.as_ref().map(|template| template.replace("{tx_hash}", &hash.to_string()))
    }
}

/// How a wallet's key material is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyType {
    SeedPhrase,
    SocialRecoveryShare,
    MultiPartyShare,
    Hardware,
}

/// A locally custodied address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub custody: CustodyType,
    /// Shared by wallets derived from the same secret; hardware wallets usually have none.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub push_subscription: Option<String>,
    /// Set once the user completed a backup of this wallet's key material.
    #[serde(default)]
    pub backup_saved: bool,
}

impl Wallet {
    #[must_use]
    pub fn new(address: Address, custody: CustodyType) -> Self {
        Self {
            address,
            custody,
            account_id: None,
            hidden: false,
            push_subscription: None,
            backup_saved: false,
        }
    }

    #[must_use]
    pub fn account(mut self, account_id: impl Into<AccountId>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    #[must_use]
    pub fn backup_saved(mut self, saved: bool) -> Self {
        self.backup_saved = saved;
        self
    }
}

/// A submitted or observed on-chain operation.
///
/// Confirmation is one-way: `confirmed` goes from `false` to `true` and never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    pub provider_id: ProviderId,
    #[serde(default)]
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[must_use]
    pub fn pending(hash: TxHash, provider_id: impl Into<ProviderId>) -> Self {
        Self { hash, provider_id: provider_id.into(), confirmed: false, created_at: Utc::now() }
    }
}

/// "Do not re-prompt for `key` before `until`."
///
/// No marker means the concern was never snoozed; a marker in the past means the snooze expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeMarker {
    pub key: String,
    pub until: DateTime<Utc>,
    /// Consecutive snoozes, drives the exponential policy.
    #[serde(default)]
    pub count: u32,
}

impl SnoozeMarker {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.until > now
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.until - now).max(TimeDelta::zero())
    }
}
