//! JSON-RPC access to provider endpoints.
//!
//! Everything that talks to the network goes through the [`RpcClient`] trait. The crate only needs
//! two calls from an endpoint:
//! * `eth_blockNumber`, used by the [`EndpointSelector`](crate::EndpointSelector) to rank endpoints
//! * `eth_getTransactionReceipt`, used by the [`ConfirmationPoller`](crate::ConfirmationPoller)
//!
//! [`AlloyRpcClient`] is the production implementation and talks HTTP JSON-RPC through Alloy's
//! [`RootProvider`](alloy::providers::RootProvider). Tests substitute an in-memory client.
//!
//! Callers are expected to bound every call with the [`timeout`](crate::timeout) race; clients do
//! not retry and do not enforce deadlines of their own.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wallet_sync::rpc::{AlloyRpcClient, IntoEndpointUrl, RpcClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = AlloyRpcClient::new();
//! let endpoint = "https://rpc.example.org".into_endpoint_url()?;
//!
//! let height = client.block_number(&endpoint).await?;
//! println!("endpoint is at block {height}");
//! # Ok(()) }
//! ```

pub mod client;
pub mod endpoint;

pub use client::{AlloyRpcClient, Error, RpcClient, TransactionReceipt};
pub use endpoint::IntoEndpointUrl;
