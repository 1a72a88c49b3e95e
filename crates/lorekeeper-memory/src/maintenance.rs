// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic frecency decay and cleanup.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use lorekeeper_core::error::LorekeeperError;

use crate::store::MemoryStore;

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Memories whose frecency was decayed.
    pub decayed: usize,
    /// Memories deleted for falling below the cleanup threshold.
    pub removed: usize,
}

/// Decays every memory and removes the ones that fall below threshold.
pub struct FrecencyMaintenance {
    store: Arc<MemoryStore>,
    interval: Duration,
}

impl FrecencyMaintenance {
    pub fn new(store: Arc<MemoryStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// One decay pass followed by one cleanup pass.
    pub async fn run_once(&self) -> Result<MaintenanceReport, LorekeeperError> {
        let decayed = self.store.decay_all_frecency().await?;
        let removed = self.store.cleanup_low_frecency().await?;
        Ok(MaintenanceReport { decayed, removed })
    }

    /// Run a pass every interval until `cancel` fires.
    ///
    /// The first pass happens one interval after start. A failed pass is
    /// logged and the loop keeps going.
    pub async fn run(self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "frecency maintenance started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match self.run_once().await {
                    Ok(report) => info!(
                        decayed = report.decayed,
                        removed = report.removed,
                        "frecency maintenance pass complete"
                    ),
                    Err(e) => error!(error = %e, "frecency maintenance pass failed"),
                },
            }
        }
        info!("frecency maintenance stopped");
    }
}
