//! The tick loop (C6): periodically selects due and retryable notifications
//! across every tenant and hands each to the dispatcher through a bounded
//! worker pool.
//!
//! Leasing is optimistic, not a reservation: a row is claimed by flipping it
//! to `INFLIGHT` with a CAS `UPDATE ... WHERE status = expected`. If another
//! worker (or a concurrent RPC cancel) already moved the row, the CAS misses
//! and this tick simply skips it — no lock is held across the dispatch call.

pub mod backoff;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pinguin_core::{Notification, Status};
use pinguin_dispatcher::{DispatchError, Dispatcher};
use pinguin_store::NotificationStore;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, instrument, warn};

pub use backoff::BackoffSchedule;

/// Tunables from the `scheduler` section of the configuration file.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub batch_limit: i64,
    pub max_concurrent_dispatches: usize,
    pub max_retries: u32,
    pub backoff: BackoffSchedule,
    pub drain_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            batch_limit: 100,
            max_concurrent_dispatches: 16,
            max_retries: 5,
            backoff: BackoffSchedule::default(),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Owns the tick loop and the fixed-size worker pool. Holds no per-row
/// state between ticks; everything it needs to resume after a restart is
/// already in the notification table (`INFLIGHT` rows are reset to
/// `QUEUED` by [`pinguin_store::NotificationStore::reset_inflight`] at boot,
/// before a `Scheduler` is constructed).
pub struct Scheduler {
    notification_store: Arc<NotificationStore>,
    dispatcher: Arc<Dispatcher>,
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    #[must_use]
    pub fn new(notification_store: Arc<NotificationStore>, dispatcher: Arc<Dispatcher>, config: SchedulerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_dispatches));
        Self {
            notification_store,
            dispatcher,
            config,
            semaphore,
        }
    }

    /// Runs until `shutdown` carries `true`, then drains outstanding
    /// dispatches for up to `drain_timeout` before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.drain().await;
    }

    #[instrument(skip(self))]
    async fn tick(&self) {
        let now = Utc::now();

        match self.notification_store.select_due_for_dispatch(now, self.config.batch_limit).await {
            Ok(due) => self.spawn_all(due),
            Err(err) => warn!(error = %err, "failed to select due notifications"),
        }

        match self.notification_store.select_retryable(self.config.max_retries, self.config.batch_limit).await {
            Ok(candidates) => {
                let past_cutoff: Vec<Notification> = candidates
                    .into_iter()
                    .filter(|n| self.config.backoff.elapsed(n.updated_at, n.retry_count, now))
                    .collect();
                self.spawn_all(past_cutoff);
            }
            Err(err) => warn!(error = %err, "failed to select retryable notifications"),
        }
    }

    /// Submits each row to the bounded pool. A row that doesn't fit under
    /// `max_concurrent_dispatches` right now is left alone — it's still
    /// `QUEUED`/`ERRORED` in the store and will be reselected next tick.
    fn spawn_all(&self, rows: Vec<Notification>) {
        for notification in rows {
            let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
                debug!("worker pool saturated, deferring remaining rows to the next tick");
                break;
            };
            let notification_store = Arc::clone(&self.notification_store);
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                let _permit = permit;
                dispatch_one(&notification_store, &dispatcher, notification).await;
            });
        }
    }

    /// Waits for every outstanding permit to return, i.e. for all spawned
    /// dispatches to finish, up to `drain_timeout`.
    async fn drain(&self) {
        let all_permits = u32::try_from(self.config.max_concurrent_dispatches).unwrap_or(u32::MAX);
        let result = tokio::time::timeout(self.config.drain_timeout, Arc::clone(&self.semaphore).acquire_many_owned(all_permits)).await;
        match result {
            Ok(Ok(_permits)) => info!("scheduler drained with no in-flight dispatches remaining"),
            Ok(Err(_)) => warn!("semaphore closed during drain"),
            Err(_) => warn!(timeout = ?self.config.drain_timeout, "drain timed out with dispatches still in flight"),
        }
    }
}

#[instrument(skip(notification_store, dispatcher, notification), fields(tenant_id = %notification.tenant_id, notification_id = %notification.notification_id))]
async fn dispatch_one(notification_store: &NotificationStore, dispatcher: &Dispatcher, notification: Notification) {
    let now = Utc::now();
    let leased = notification_store
        .update_status(
            &notification.tenant_id,
            &notification.notification_id,
            notification.status,
            Status::Inflight,
            notification.provider_message_id.clone(),
            notification.retry_count,
            now,
        )
        .await;

    match leased {
        Ok(true) => {}
        Ok(false) => {
            debug!("lease lost before dispatch; another worker already moved this row");
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to acquire lease");
            return;
        }
    }

    let leased_notification = Notification {
        status: Status::Inflight,
        updated_at: now,
        ..notification
    };

    match dispatcher.dispatch(&leased_notification).await {
        Ok(_) => {}
        Err(DispatchError::LeaseLost) => debug!("lease lost while dispatching"),
        Err(err) => warn!(error = %err, "dispatch failed"),
    }
}
