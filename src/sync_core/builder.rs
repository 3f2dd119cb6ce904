use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    SyncError,
    backup::{
        BackupKind, BackupReminder, DEFAULT_MAX_SNOOZE, DEFAULT_SNOOZE, KeyMaterialProbe,
        SnoozePolicy,
    },
    event_bus::EventBus,
    poller::ConfirmationPoller,
    rpc::RpcClient,
    selector::EndpointSelector,
    store::Store,
    sync_core::{SyncCore, handlers},
    timeout::DEFAULT_CALL_TIMEOUT,
};

/// Default window of the wallet balance/staking sync throttle.
pub const DEFAULT_BALANCE_CHECK_THROTTLE: Duration = Duration::from_millis(1_000);

/// Tunables of a [`SyncCore`].
///
/// Deserializes from JSON with durations in milliseconds; missing fields take their defaults.
///
/// ```
/// # use wallet_sync::SyncConfig;
/// let config: SyncConfig = serde_json::from_str(r#"{ "call_timeout_ms": 5000 }"#).unwrap();
/// assert_eq!(config.call_timeout.as_millis(), 5000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deadline of every RPC call.
    #[serde(rename = "call_timeout_ms", with = "millis")]
    pub call_timeout: Duration,
    /// Minimum spacing of wallet re-synchronizations.
    #[serde(rename = "balance_check_throttle_ms", with = "millis")]
    pub balance_check_throttle: Duration,
    /// First backup snooze, and the deferral after a completed backup.
    #[serde(rename = "snooze_ms", with = "millis")]
    pub snooze: Duration,
    /// Cap of the exponential backup snooze.
    #[serde(rename = "max_snooze_ms", with = "millis")]
    pub max_snooze: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            balance_check_throttle: DEFAULT_BALANCE_CHECK_THROTTLE,
            snooze: DEFAULT_SNOOZE,
            max_snooze: DEFAULT_MAX_SNOOZE,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Builder for [`SyncCore`].
///
/// ```no_run
/// use std::time::Duration;
///
/// use wallet_sync::{SyncCoreBuilder, rpc::AlloyRpcClient};
///
/// # fn example() -> Result<(), wallet_sync::SyncError> {
/// let core = SyncCoreBuilder::new()
///     .call_timeout(Duration::from_secs(10))
///     .build(AlloyRpcClient::new())?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SyncCoreBuilder {
    config: SyncConfig,
    store: Option<Arc<Store>>,
    bus: Option<EventBus>,
    probes: Vec<(BackupKind, Arc<dyn KeyMaterialProbe>)>,
}

impl SyncCoreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every tunable at once, e.g. with a deserialized [`SyncConfig`].
    #[must_use]
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the deadline of every RPC call.
    ///
    /// Must be greater than zero.
    #[must_use]
    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.config.call_timeout = call_timeout;
        self
    }

    #[must_use]
    pub fn balance_check_throttle(mut self, window: Duration) -> Self {
        self.config.balance_check_throttle = window;
        self
    }

    /// Sets the first backup snooze and the cap of the exponential ones.
    ///
    /// `base` must be greater than zero; a `max` below `base` is raised to `base`.
    #[must_use]
    pub fn snooze(mut self, base: Duration, max: Duration) -> Self {
        self.config.snooze = base;
        self.config.max_snooze = max;
        self
    }

    /// Use an existing store instead of a fresh one.
    #[must_use]
    pub fn store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register the core's handlers on an existing bus instead of a fresh one.
    #[must_use]
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Decide `kind` with `probe` instead of the wallets' `backup_saved` flags.
    #[must_use]
    pub fn probe(mut self, kind: BackupKind, probe: Arc<dyn KeyMaterialProbe>) -> Self {
        self.probes.push((kind, probe));
        self
    }

    /// Assemble the core and register its handlers on the bus.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if the call timeout or the base snooze is zero.
    pub fn build<C: RpcClient>(self, client: C) -> Result<SyncCore<C>, SyncError> {
        let config = self.config;
        if config.call_timeout.is_zero() {
            return Err(SyncError::InvalidConfig("call timeout must be greater than 0".into()));
        }
        if config.snooze.is_zero() {
            return Err(SyncError::InvalidConfig("snooze must be greater than 0".into()));
        }

        let store = self.store.unwrap_or_else(|| Arc::new(Store::new()));
        let bus = self.bus.unwrap_or_default();
        let client = Arc::new(client);

        let selector =
            EndpointSelector::new(store.clone(), client.clone()).call_timeout(config.call_timeout);
        let poller =
            ConfirmationPoller::new(store.clone(), client).call_timeout(config.call_timeout);
        let reminder = self.probes.into_iter().fold(
            BackupReminder::new(store.clone(), bus.clone())
                .snooze_policy(SnoozePolicy::new(config.snooze, config.max_snooze)),
            |reminder, (kind, probe)| reminder.probe(kind, probe),
        );

        let core = SyncCore { store, bus, selector, poller, reminder, config };
        handlers::register(&core);
        debug!(
            call_timeout = ?config.call_timeout,
            balance_check_throttle = ?config.balance_check_throttle,
            "Sync core ready"
        );
        Ok(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockRpcClient;

    #[test]
    fn config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(15));
        assert_eq!(config.balance_check_throttle, Duration::from_secs(1));
        assert_eq!(config.snooze, Duration::from_secs(86_400));
        assert_eq!(config.max_snooze, Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn config_reads_milliseconds_and_fills_gaps() -> anyhow::Result<()> {
        let config: SyncConfig =
            serde_json::from_str(r#"{ "call_timeout_ms": 2500, "snooze_ms": 60000 }"#)?;
        assert_eq!(config.call_timeout, Duration::from_millis(2_500));
        assert_eq!(config.snooze, Duration::from_secs(60));
        assert_eq!(config.max_snooze, DEFAULT_MAX_SNOOZE);

        let json = serde_json::to_value(config)?;
        assert_eq!(json["balance_check_throttle_ms"], 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn zero_timeout_is_rejected() {
        let result = SyncCoreBuilder::new().call_timeout(Duration::ZERO).build(MockRpcClient::new());
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));

        let result = SyncCoreBuilder::new()
            .snooze(Duration::ZERO, Duration::from_secs(1))
            .build(MockRpcClient::new());
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn shares_the_given_bus_and_store() -> anyhow::Result<()> {
        let store = Arc::new(Store::new());
        let bus = EventBus::new();

        let core =
            SyncCoreBuilder::new().store(store.clone()).bus(bus.clone()).build(MockRpcClient::new())?;

        assert!(Arc::ptr_eq(core.store(), &store));
        assert_eq!(bus.listener_count(crate::EventName::AvailabilityCheckRequested), 1);
        Ok(())
    }
}
