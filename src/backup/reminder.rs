use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    SyncError,
    backup::{
        BackupKind, CustodyCheck, KeyMaterialProbe, WalletFlagProbe,
        snooze::{APP_BACKUP_SNOOZE, SnoozePolicy},
    },
    event_bus::{Event, EventBus},
    store::Store,
    types::{AccountId, SnoozeMarker},
};

/// Outcome of checking one custody type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupCheck {
    /// The shared snooze has not expired yet; nothing was probed.
    Snoozed { until: DateTime<Utc> },
    /// Every account group probed as saved.
    AllSaved { checked: usize },
    /// The account group was found unsaved and a prompt event was emitted for it.
    Prompted { account_id: AccountId },
}

/// Decides, per custody type, whether the user has to be prompted to back up key material.
///
/// One table-driven algorithm serves every [`BackupKind`]; the kinds differ only in their
/// [`KeyMaterialProbe`]. All kinds share the [`APP_BACKUP_SNOOZE`] marker by default, so acting on
/// one prompt defers every other kind too.
#[derive(Debug, Clone)]
pub struct BackupReminder {
    store: Arc<Store>,
    bus: EventBus,
    checks: Vec<CustodyCheck>,
    policy: SnoozePolicy,
}

impl BackupReminder {
    /// Reminder with [`WalletFlagProbe`]s for every kind.
    #[must_use]
    pub fn new(store: Arc<Store>, bus: EventBus) -> Self {
        let checks = BackupKind::ALL
            .into_iter()
            .map(|kind| {
                let probe = Arc::new(WalletFlagProbe::new(store.clone(), kind.custody_type()));
                CustodyCheck::new(kind, probe, APP_BACKUP_SNOOZE)
            })
            .collect();
        Self { store, bus, checks, policy: SnoozePolicy::default() }
    }

    /// Replace the probe deciding `kind`.
    #[must_use]
    pub fn probe(mut self, kind: BackupKind, probe: Arc<dyn KeyMaterialProbe>) -> Self {
        if let Some(check) = self.checks.iter_mut().find(|check| check.kind == kind) {
            check.probe = probe;
        }
        self
    }

    #[must_use]
    pub fn snooze_policy(mut self, policy: SnoozePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check one custody type and emit its prompt event for the first unsaved account group.
    ///
    /// Account groups are probed in store order; probing stops at the first unsaved one, so at
    /// most one prompt is outstanding per call.
    ///
    /// # Errors
    ///
    /// Probe failures ([`SyncError::Precondition`], [`SyncError::Probe`], ...) abort this kind's
    /// check and are returned as-is. Groups probed before the failure are unaffected. A group the
    /// probe reports as [`SyncError::NotFound`] was deleted meanwhile and is skipped.
    pub async fn check(&self, kind: BackupKind) -> Result<BackupCheck, SyncError> {
        let Some(check) = self.checks.iter().find(|check| check.kind == kind) else {
            return Ok(BackupCheck::AllSaved { checked: 0 });
        };

        if let Some(marker) = self.active_snooze(&check.marker_key) {
            debug!(kind = %kind, until = %marker.until, "Backup reminder snoozed");
            return Ok(BackupCheck::Snoozed { until: marker.until });
        }

        let groups = check.account_groups(&self.store);
        for account_id in &groups {
            match check.probe.is_saved(account_id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(SyncError::NotFound(what)) => {
                    debug!(
                        kind = %kind,
                        account_id = %account_id,
                        missing = %what,
                        "Account group gone, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }

            info!(kind = %kind, account_id = %account_id, "Account group needs backup");
            // the prompt is handled by the UI layer, don't wait for it
            drop(self.bus.emit(Event::BackupNeeded { kind, account_id: account_id.clone() }));
            return Ok(BackupCheck::Prompted { account_id: account_id.clone() });
        }

        trace!(kind = %kind, checked = groups.len(), "All account groups backed up");
        Ok(BackupCheck::AllSaved { checked: groups.len() })
    }

    /// Check every custody type in [`BackupKind::ALL`] order, stopping after the first prompt.
    ///
    /// A failing kind does not prevent the following kinds from being checked; its error is
    /// reported in its slot.
    pub async fn check_all(&self) -> Vec<(BackupKind, Result<BackupCheck, SyncError>)> {
        let mut outcomes = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let outcome = self.check(check.kind).await;
            if let Err(e) = &outcome {
                warn!(kind = %check.kind, error = %e, "Backup check failed");
            }
            let prompted = matches!(outcome, Ok(BackupCheck::Prompted { .. }));
            outcomes.push((check.kind, outcome));
            if prompted {
                break;
            }
        }
        outcomes
    }

    /// The user backed up `account_id`: flag its wallets and defer every reminder for one base
    /// period. Returns how many wallets changed.
    pub fn mark_saved(&self, kind: BackupKind, account_id: &str) -> usize {
        let custody = kind.custody_type();
        let now = Utc::now();
        let updated = self.store.write(|txn| {
            let updated = txn.update_wallets(
                |w| w.custody == custody && w.account_id.as_deref() == Some(account_id),
                |w| w.backup_saved = true,
            );
            for key in self.marker_keys() {
                txn.set_snooze_marker(self.policy.resolved(&key, now));
            }
            updated
        });
        info!(kind = %kind, account_id = %account_id, wallets = updated, "Backup saved");
        updated
    }

    /// The user dismissed a prompt. `Some(until)` snoozes until that instant, `None` applies the
    /// next exponential step.
    ///
    /// Returns the new marker of the shared snooze.
    pub fn snooze(&self, until: Option<DateTime<Utc>>) -> Option<SnoozeMarker> {
        let now = Utc::now();
        let markers = self.store.write(|txn| {
            let mut markers = Vec::new();
            for key in self.marker_keys() {
                let previous = txn.snooze_marker(&key);
                let marker = match until {
                    Some(until) => self.policy.until(&key, previous, until),
                    None => self.policy.exponential(&key, previous, now),
                };
                txn.set_snooze_marker(marker.clone());
                markers.push(marker);
            }
            markers
        });

        let marker = markers.into_iter().next();
        if let Some(marker) = &marker {
            info!(until = %marker.until, count = marker.count, "Backup reminder snoozed");
        }
        marker
    }

    fn active_snooze(&self, key: &str) -> Option<SnoozeMarker> {
        self.store.snooze_marker(key).filter(|marker| marker.is_active(Utc::now()))
    }

    fn marker_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for check in &self.checks {
            if !keys.contains(&check.marker_key) {
                keys.push(check.marker_key.clone());
            }
        }
        keys
    }
}
