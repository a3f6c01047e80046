// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace teardown for departing employees.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::apply::{delete_workspace_resources, ResourceFailure};
use crate::context::WorkspaceContext;
use crate::error::WorkspaceError;
use crate::resources::ResourceNames;
use crate::types::WorkspaceId;

/// What a teardown removed.
#[derive(Debug, Clone, Serialize)]
pub struct DeprovisionReport {
	pub workspace_id: WorkspaceId,
	pub name: String,
	/// Deletions that failed; the record is removed regardless
	pub resource_failures: Vec<ResourceFailure>,
}

#[derive(Debug, Clone)]
pub enum DeprovisionOutcome {
	/// The employee had no workspace record
	NotFound,
	Removed(DeprovisionReport),
}

pub struct Deprovisioner {
	ctx: WorkspaceContext,
}

impl Deprovisioner {
	pub fn new(ctx: WorkspaceContext) -> Self {
		Self { ctx }
	}

	/// Remove every cluster object, the access name, the stored credential and
	/// the record of the employee's workspace.
	///
	/// Cluster deletions are best-effort and collected into the report. Only a
	/// failure to remove the record itself is returned as an error.
	#[instrument(skip(self))]
	pub async fn deprovision(&self, employee_id: &str) -> Result<DeprovisionOutcome, WorkspaceError> {
		let Some(workspace) = self.ctx.store.get_by_employee(employee_id).await? else {
			info!("No workspace to deprovision");
			return Ok(DeprovisionOutcome::NotFound);
		};
		info!(workspace_id = %workspace.id, name = %workspace.name, "Deprovisioning workspace");

		let names = ResourceNames::for_workspace(&workspace.name);
		let resource_failures = delete_workspace_resources(
			self.ctx.client.as_ref(),
			self.ctx.namespace(),
			&names,
			self.ctx.config.pod_grace_period_secs,
		)
		.await;

		let employee = match self.ctx.employees.get(employee_id).await {
			Ok(employee) => employee,
			Err(e) => {
				warn!(error = %e, "Employee lookup failed during teardown");
				None
			}
		};

		if let (Some(employee), Some(endpoint)) = (&employee, &workspace.endpoint) {
			if let Err(e) = self
				.ctx
				.access_records
				.remove(employee, endpoint.address())
				.await
			{
				warn!(error = %e, "Failed to remove access record");
			}
		}

		if let Err(e) = self.ctx.secrets.delete_secret(employee_id).await {
			warn!(error = %e, "Failed to delete stored credential");
		}

		if let Err(source) = self.ctx.store.delete(&workspace.id).await {
			return Err(WorkspaceError::RecordDeletion {
				workspace_id: workspace.id,
				failed_resources: resource_failures.len(),
				source,
			});
		}

		if let Some(employee) = &employee {
			self.ctx.notifier.notify_terminated(employee, Utc::now());
		}

		info!(
			workspace_id = %workspace.id,
			failed_resources = resource_failures.len(),
			"Workspace deprovisioned"
		);
		Ok(DeprovisionOutcome::Removed(DeprovisionReport {
			workspace_id: workspace.id,
			name: workspace.name,
			resource_failures,
		}))
	}
}
