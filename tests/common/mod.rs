#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, b256};
use tracing_subscriber::EnvFilter;
use wallet_sync::{
    CustodyType, Provider, Store, Wallet,
    test_utils::{EndpointBehavior, MockRpcClient},
};

pub const TX_HASH: TxHash =
    b256!("0xabababababababababababababababababababababababababababababababab");

pub const ENDPOINT_A: &str = "https://a.rpc.example";
pub const ENDPOINT_B: &str = "https://b.rpc.example";
pub const ENDPOINT_C: &str = "https://c.rpc.example";

/// Install a fmt subscriber honoring `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A times out, B and C agree on block 500.
pub fn three_endpoint_client() -> MockRpcClient {
    MockRpcClient::new()
        .with_endpoint(ENDPOINT_A, EndpointBehavior::Hang)
        .with_endpoint(ENDPOINT_B, EndpointBehavior::Height(500))
        .with_endpoint(ENDPOINT_C, EndpointBehavior::Height(500))
}

pub fn haqq_provider() -> anyhow::Result<Provider> {
    Ok(Provider::new("haqq", 11235, [ENDPOINT_A, ENDPOINT_B, ENDPOINT_C])?
        .with_explorer_url("https://explorer.haqq.network/tx/{tx_hash}"))
}

/// Add one seed-phrase wallet per account group, in the given order.
pub fn seed_phrase_wallets(store: &Arc<Store>, accounts: &[&str]) {
    store.write(|txn| {
        for (i, account) in accounts.iter().enumerate() {
            let address = Address::with_last_byte(u8::try_from(i + 1).unwrap_or(u8::MAX));
            txn.upsert_wallet(Wallet::new(address, CustodyType::SeedPhrase).account(*account));
        }
    });
}
