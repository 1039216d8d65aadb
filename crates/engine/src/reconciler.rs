use crate::TradingCore;
use chrono::Utc;
use configuration::settings::ReconciliationSettings;
use core_types::Order;
use std::sync::Arc;
use tokio::time::{Duration, interval};

/// Outcome of one sweep pass, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Accepted orders that were re-handed to the execution collaborator.
    pub redispatched: usize,
    /// Live orders older than the configured age, flagged for operator
    /// attention.
    pub stale: usize,
}

/// The background auditor for orders stuck between acceptance and the
/// execution venue.
///
/// An order can end up accepted-but-undispatched when the process
/// crashed before dispatch or when dispatch timed out. The sweep
/// re-dispatches those, and flags live orders that have been waiting
/// longer than the configured age. It never guesses an outcome: a stale
/// order is reported, not auto-cancelled, because the venue may still
/// fill it.
pub struct ReconciliationSweep {
    core: Arc<TradingCore>,
    settings: ReconciliationSettings,
}

impl ReconciliationSweep {
    pub fn new(core: Arc<TradingCore>, settings: ReconciliationSettings) -> Self {
        Self { core, settings }
    }

    /// Runs a single sweep pass. Account locks are taken one at a time
    /// and only for the in-memory scan; dispatch happens after each lock
    /// is released.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let stale_cutoff =
            Utc::now() - chrono::Duration::seconds(self.settings.stale_order_age_secs as i64);

        for (account_id, domain) in self.core.domains().await {
            let (undispatched, stale): (Vec<Order>, Vec<Order>) = {
                let state = domain.lock().await;
                let undispatched = state.book.undispatched();
                let stale = state
                    .book
                    .list(None)
                    .into_iter()
                    .filter(|order| order.status.is_live() && order.created_at < stale_cutoff)
                    .collect();
                (undispatched, stale)
            };

            for order in &stale {
                report.stale += 1;
                tracing::warn!(
                    %account_id,
                    order_id = %order.id,
                    correlation_id = %order.correlation_id,
                    status = %order.status,
                    created_at = %order.created_at,
                    "stale live order awaiting venue response"
                );
            }

            for order in undispatched {
                match self.core.dispatch(&order).await {
                    Ok(()) => {
                        report.redispatched += 1;
                        tracing::info!(%account_id, order_id = %order.id, "sweep re-dispatched order");
                    }
                    Err(err) => {
                        tracing::warn!(%account_id, order_id = %order.id, error = %err, "sweep re-dispatch failed; will retry next pass");
                    }
                }
            }
        }
        report
    }

    /// Runs sweep passes forever at the configured interval. Spawn this
    /// on its own task.
    pub async fn start(self) {
        tracing::info!(
            interval_secs = self.settings.sweep_interval_secs,
            "reconciliation sweep starting"
        );
        let mut timer = interval(Duration::from_secs(self.settings.sweep_interval_secs));
        loop {
            timer.tick().await;
            let report = self.run_once().await;
            if report.redispatched > 0 || report.stale > 0 {
                tracing::info!(
                    redispatched = report.redispatched,
                    stale = report.stale,
                    "reconciliation sweep pass complete"
                );
            }
        }
    }
}
