// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-side queries over records and live cluster objects, plus record
//! reconciliation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hrp_server_k8s::Pod;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::apply::delete_workspace_resources;
use crate::config::RoutingMode;
use crate::context::WorkspaceContext;
use crate::error::WorkspaceError;
use crate::readiness::{evaluate_pod, PodReadiness};
use crate::resources::{
	ResourceNames, EMPLOYEE_ID_ANNOTATION, MANAGED_SELECTOR, WORKSPACE_ID_LABEL, WORKSPACE_LABEL,
};
use crate::types::{Workspace, WorkspaceId, WorkspaceStatus};

/// Extra time an in-flight record gets beyond the readiness timeout before
/// reconciliation may judge it.
const PROVISIONING_GRACE: Duration = Duration::from_secs(60);

/// Observed phase of a workspace pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivePhase {
	Pending,
	Running,
	Succeeded,
	Failed,
	Terminating,
	Unknown,
	/// The record exists but its pod does not
	Missing,
}

impl LivePhase {
	pub fn of(pod: &Pod) -> Self {
		if pod.metadata.deletion_timestamp.is_some() {
			return LivePhase::Terminating;
		}
		match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
			Some("Pending") => LivePhase::Pending,
			Some("Running") => LivePhase::Running,
			Some("Succeeded") => LivePhase::Succeeded,
			Some("Failed") => LivePhase::Failed,
			_ => LivePhase::Unknown,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			LivePhase::Pending => "pending",
			LivePhase::Running => "running",
			LivePhase::Succeeded => "succeeded",
			LivePhase::Failed => "failed",
			LivePhase::Terminating => "terminating",
			LivePhase::Unknown => "unknown",
			LivePhase::Missing => "missing",
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceStatusView {
	pub workspace_id: WorkspaceId,
	pub name: String,
	pub department: String,
	pub record_status: WorkspaceStatus,
	pub phase: LivePhase,
	pub ready: bool,
	pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StatusLookup {
	NotFound,
	Found(WorkspaceStatusView),
}

/// A managed pod as seen in the cluster.
#[derive(Debug, Clone, Serialize)]
pub struct LiveWorkspace {
	pub name: String,
	pub workspace_id: Option<String>,
	pub employee_id: Option<String>,
	pub phase: LivePhase,
	pub ready: bool,
	/// Node address (node-port mode) or load balancer hostname
	pub address: Option<String>,
	pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
	/// Delete live objects that no record refers to
	pub remove_untracked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionReason {
	/// Another record for the same employee matches the live workspace
	Duplicate,
	/// No record for the employee matches a live workspace
	Orphaned,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedRecord {
	pub workspace_id: WorkspaceId,
	pub employee_id: String,
	pub name: String,
	pub reason: DeletionReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
	pub kept: Vec<WorkspaceId>,
	pub deleted: Vec<DeletedRecord>,
	/// In-flight records left alone
	pub skipped: Vec<WorkspaceId>,
	/// Live workspace names with no record
	pub untracked: Vec<String>,
	pub removed_untracked: Vec<String>,
}

pub struct Inventory {
	ctx: WorkspaceContext,
}

impl Inventory {
	pub fn new(ctx: WorkspaceContext) -> Self {
		Self { ctx }
	}

	/// Record status joined with the pod's live phase.
	#[instrument(skip(self))]
	pub async fn status(&self, employee_id: &str) -> Result<StatusLookup, WorkspaceError> {
		let Some(workspace) = self.ctx.store.get_by_employee(employee_id).await? else {
			return Ok(StatusLookup::NotFound);
		};

		let names = ResourceNames::for_workspace(&workspace.name);
		let (phase, ready) = match self.ctx.client.get_pod(&names.pod, self.ctx.namespace()).await {
			Ok(pod) => (
				LivePhase::of(&pod),
				matches!(evaluate_pod(&pod), PodReadiness::Ready { .. }),
			),
			Err(e) if e.is_not_found() => (LivePhase::Missing, false),
			Err(e) => return Err(WorkspaceError::from_cluster("read pod", e)),
		};

		Ok(StatusLookup::Found(WorkspaceStatusView {
			workspace_id: workspace.id,
			name: workspace.name,
			department: workspace.department,
			record_status: workspace.status,
			phase,
			ready,
			url: workspace.url,
		}))
	}

	/// The employee's most recent record.
	pub async fn record_for(&self, employee_id: &str) -> Result<Option<Workspace>, WorkspaceError> {
		Ok(self.ctx.store.get_by_employee(employee_id).await?)
	}

	/// Every managed workspace pod in the namespace.
	pub async fn list_live(&self) -> Result<Vec<LiveWorkspace>, WorkspaceError> {
		let pods = self
			.ctx
			.client
			.list_pods(self.ctx.namespace(), MANAGED_SELECTOR)
			.await
			.map_err(|e| WorkspaceError::from_cluster("list pods", e))?;

		let mut live = Vec::with_capacity(pods.len());
		for pod in &pods {
			let labels = pod.metadata.labels.as_ref();
			let Some(name) = labels.and_then(|l| l.get(WORKSPACE_LABEL)).cloned() else {
				debug!(pod = ?pod.metadata.name, "Managed pod without workspace label");
				continue;
			};
			let address = self.live_address(pod, &name).await;
			live.push(LiveWorkspace {
				workspace_id: labels.and_then(|l| l.get(WORKSPACE_ID_LABEL)).cloned(),
				employee_id: pod
					.metadata
					.annotations
					.as_ref()
					.and_then(|a| a.get(EMPLOYEE_ID_ANNOTATION))
					.cloned(),
				phase: LivePhase::of(pod),
				ready: matches!(evaluate_pod(pod), PodReadiness::Ready { .. }),
				address,
				created_at: pod.metadata.creation_timestamp.as_ref().map(|t| t.0),
				name,
			});
		}
		Ok(live)
	}

	async fn live_address(&self, pod: &Pod, name: &str) -> Option<String> {
		match self.ctx.config.routing_mode {
			RoutingMode::NodePort => pod.status.as_ref().and_then(|s| s.host_ip.clone()),
			RoutingMode::LoadBalancer => {
				let service_name = ResourceNames::for_workspace(name).service;
				let service = match self
					.ctx
					.client
					.get_service(&service_name, self.ctx.namespace())
					.await
				{
					Ok(service) => service,
					Err(e) => {
						debug!(service = %service_name, error = %e, "No service for live workspace");
						return None;
					}
				};
				let ingress = service.status?.load_balancer?.ingress?.into_iter().next()?;
				ingress.hostname.or(ingress.ip)
			}
		}
	}

	pub async fn list_records(&self) -> Result<Vec<Workspace>, WorkspaceError> {
		Ok(self.ctx.store.list_all().await?)
	}

	/// Bring records in line with the cluster: per employee keep the one record
	/// backed by a live workspace and delete the rest.
	#[instrument(skip(self))]
	pub async fn reconcile(
		&self,
		options: ReconcileOptions,
	) -> Result<ReconcileReport, WorkspaceError> {
		let records = self.ctx.store.list_all().await?;
		let live = self.list_live().await?;
		let live_by_name: HashMap<&str, &LiveWorkspace> =
			live.iter().map(|w| (w.name.as_str(), w)).collect();

		let mut report = ReconcileReport::default();
		let recorded_names: HashSet<&str> = records.iter().map(|w| w.name.as_str()).collect();
		let in_flight_cutoff = self.ctx.config.ready_timeout() + PROVISIONING_GRACE;
		let now = Utc::now();

		let mut by_employee: BTreeMap<&str, Vec<&Workspace>> = BTreeMap::new();
		for record in &records {
			let age = (now - record.created_at).to_std().unwrap_or_default();
			if record.status == WorkspaceStatus::Provisioning && age < in_flight_cutoff {
				report.skipped.push(record.id);
				continue;
			}
			by_employee
				.entry(record.employee_id.as_str())
				.or_default()
				.push(record);
		}

		for (employee_id, group) in by_employee {
			let keeper = select_keeper(&group, &live_by_name);
			for record in group {
				if Some(record.id) == keeper {
					report.kept.push(record.id);
					continue;
				}
				let reason = if keeper.is_some() {
					DeletionReason::Duplicate
				} else {
					DeletionReason::Orphaned
				};
				match self.ctx.store.delete(&record.id).await {
					Ok(()) => {
						info!(workspace_id = %record.id, employee_id, ?reason, "Deleted stale workspace record");
						report.deleted.push(DeletedRecord {
							workspace_id: record.id,
							employee_id: employee_id.to_string(),
							name: record.name.clone(),
							reason,
						});
					}
					Err(e) => {
						warn!(workspace_id = %record.id, error = %e, "Failed to delete stale workspace record")
					}
				}
			}
		}

		for workspace in &live {
			if recorded_names.contains(workspace.name.as_str()) {
				continue;
			}
			report.untracked.push(workspace.name.clone());
			if !options.remove_untracked {
				warn!(name = %workspace.name, "Live workspace has no record");
				continue;
			}
			let failures = delete_workspace_resources(
				self.ctx.client.as_ref(),
				self.ctx.namespace(),
				&ResourceNames::for_workspace(&workspace.name),
				self.ctx.config.pod_grace_period_secs,
			)
			.await;
			if failures.is_empty() {
				info!(name = %workspace.name, "Removed untracked workspace");
				report.removed_untracked.push(workspace.name.clone());
			}
		}

		info!(
			kept = report.kept.len(),
			deleted = report.deleted.len(),
			skipped = report.skipped.len(),
			untracked = report.untracked.len(),
			"Reconciliation finished"
		);
		Ok(report)
	}
}

/// Among one employee's records, the one backed by a running workspace:
/// matching address first, then the newest. Pods that have exited or are
/// terminating back nothing.
fn select_keeper(
	group: &[&Workspace],
	live_by_name: &HashMap<&str, &LiveWorkspace>,
) -> Option<WorkspaceId> {
	group
		.iter()
		.filter_map(|record| {
			let live = live_by_name
				.get(record.name.as_str())
				.filter(|live| live.phase == LivePhase::Running)?;
			let address_matches = match (&record.endpoint, &live.address) {
				(Some(endpoint), Some(address)) => endpoint.address() == address,
				_ => false,
			};
			Some((address_matches, record.created_at, record.id))
		})
		.max_by_key(|(address_matches, created_at, _)| (*address_matches, *created_at))
		.map(|(_, _, id)| id)
}
