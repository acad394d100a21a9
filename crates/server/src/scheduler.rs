//! Periodic sync schedules.
//!
//! Two fixed-interval loops feed the command channel: the full-catalog
//! inventory sync every five minutes and the reconciliation report every
//! six hours. Missed ticks are delayed, not bunched, so a long-running
//! sync never causes a burst of queued duplicates.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use saltbridge_sync::SyncCommand;

/// Interval of the full-catalog inventory sync.
const INVENTORY_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Interval of the reconciliation report job.
const RECONCILIATION_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Spawn the periodic schedules onto the runtime.
pub fn spawn_schedules(commands: mpsc::Sender<SyncCommand>) {
    tokio::spawn(run_schedule(
        commands.clone(),
        INVENTORY_SYNC_INTERVAL,
        || SyncCommand::SyncInventory {
            item_numbers: Vec::new(),
        },
    ));
    tokio::spawn(run_schedule(commands, RECONCILIATION_INTERVAL, || {
        SyncCommand::RunReconciliation
    }));
}

async fn run_schedule<F>(commands: mpsc::Sender<SyncCommand>, period: Duration, make: F)
where
    F: Fn() -> SyncCommand + Send + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so startup stays quiet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let command = make();
        let label = command.label();
        info!(task = label, "schedule fired");
        if commands.send(command).await.is_err() {
            error!(task = label, "sync worker gone, stopping schedule");
            return;
        }
    }
}
