// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background reconciliation of workspace records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::inventory::{Inventory, ReconcileOptions};

/// Spawn periodic reconciliation. The first pass runs immediately.
pub fn start_reconcile_task(
	inventory: Arc<Inventory>,
	interval: Duration,
	options: ReconcileOptions,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;
			match inventory.reconcile(options).await {
				Ok(report) => info!(
					deleted = report.deleted.len(),
					untracked = report.untracked.len(),
					"Periodic reconciliation completed"
				),
				Err(e) => error!(error = %e, "Periodic reconciliation failed"),
			}
		}
	})
}
