//! Check-cycle orchestration.
//!
//! A check cycle probes the server (with retries), reconciles the result
//! against the latest stored roster, appends exactly one observation and
//! then notifies. A prune cycle drops observations past the retention window.
//! Errors from storage and notification are logged and never abort a cycle.

use log::{error, info, warn};
use shared::{reconcile, Observation, Reconciliation, StatusSample};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::notifier::{chat_title, format_changes, Notifier};
use crate::probe::Prober;
use crate::store::RetentionStore;
use crate::utils::get_timestamp;

/// The knobs a cycle needs, split out of [`Config`].
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub title: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retention: Duration,
}

impl From<&Config> for CycleSettings {
    fn from(config: &Config) -> Self {
        Self {
            title: config.title.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            retention: config.retention,
        }
    }
}

/// What one check cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub observation: Observation,
    pub reconciliation: Reconciliation,
    /// Probe attempts made, including the successful one.
    pub attempts: u32,
    /// Change message sent (or attempted) this cycle.
    pub message: Option<String>,
}

/// Process-lifetime context shared by both timers.
pub struct Monitor<P, N> {
    settings: CycleSettings,
    store: Arc<RetentionStore>,
    prober: P,
    notifier: N,
}

impl<P: Prober, N: Notifier> Monitor<P, N> {
    pub fn new(settings: CycleSettings, store: Arc<RetentionStore>, prober: P, notifier: N) -> Self {
        Self {
            settings,
            store,
            prober,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<RetentionStore> {
        &self.store
    }

    /// Runs an immediate check, then both timers until `shutdown` resolves.
    ///
    /// `shutdown` is polled from one place for the whole run, so a signal
    /// raised while a cycle is in flight ends the loop once that cycle returns.
    /// The log is flushed on the way out.
    pub async fn run_until<F>(
        &self,
        check_interval: Duration,
        cleanup_interval: Duration,
        shutdown: F,
    ) where
        F: Future,
    {
        tokio::pin!(shutdown);

        self.run_check().await;

        // First ticks are one period out; the initial check already ran
        let mut check_timer = interval_at(Instant::now() + check_interval, check_interval);
        check_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cleanup_timer = interval_at(Instant::now() + cleanup_interval, cleanup_interval);
        cleanup_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping...");
                    break;
                }
                _ = check_timer.tick() => {
                    self.run_check().await;
                }
                _ = cleanup_timer.tick() => {
                    info!("Cleaning up old status entries...");
                    self.run_prune().await;
                }
            }
        }

        if let Err(e) = self.store.flush().await {
            error!("Error writing status file on shutdown: {}", e);
        }
    }

    /// Runs one full check cycle.
    pub async fn run_check(&self) -> CycleReport {
        let previous = self
            .store
            .latest()
            .await
            .map(|latest| latest.players)
            .unwrap_or_default();

        let (sample, attempts) = self.probe_with_retries().await;
        let reconciliation = reconcile(&previous, sample.as_ref());

        let observation = self
            .store
            .append(
                reconciliation.online,
                get_timestamp(),
                reconciliation.current_players.clone(),
            )
            .await;
        if let Err(e) = self.store.flush().await {
            error!("Error writing status file: {}", e);
        }

        let message = if reconciliation.reliable {
            format_changes(&reconciliation.joined, &reconciliation.left)
        } else {
            None
        };
        if let Some(text) = &message {
            if let Err(e) = self.notifier.send_message(text).await {
                error!("Error sending Telegram message: {}", e);
            }
        }

        let title = chat_title(reconciliation.online, &self.settings.title);
        if let Err(e) = self.notifier.set_channel_title(&title).await {
            error!("Error updating chat title: {}", e);
        }

        info!(
            "Server status: {} ({} players{})",
            if reconciliation.online {
                "online"
            } else {
                "offline"
            },
            reconciliation.current_players.len(),
            if reconciliation.reliable {
                ""
            } else {
                ", unconfirmed"
            }
        );

        CycleReport {
            observation,
            reconciliation,
            attempts,
            message,
        }
    }

    /// Drops observations older than the retention window; returns how many.
    pub async fn run_prune(&self) -> usize {
        let retention_ms =
            i64::try_from(self.settings.retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = get_timestamp().saturating_sub(retention_ms);
        let removed = self.store.prune_older_than(cutoff).await;

        if let Err(e) = self.store.flush().await {
            error!("Error writing status file after cleanup: {}", e);
        }

        info!("Cleaned up {} old status entries", removed);
        removed
    }

    async fn probe_with_retries(&self) -> (Option<StatusSample>, u32) {
        let max_retries = self.settings.max_retries.max(1);

        for attempt in 1..=max_retries {
            match self.prober.probe().await {
                Ok(sample) => return (Some(sample), attempt),
                Err(e) if attempt < max_retries => {
                    warn!(
                        "Server check attempt {} failed ({}), retrying...",
                        attempt, e
                    );
                    sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    error!("Server check failed after {} attempts: {}", attempt, e);
                }
            }
        }

        (None, max_retries)
    }
}
