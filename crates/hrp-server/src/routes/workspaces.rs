// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace HTTP handlers.
//!
//! Every path parameter is an employee id; the workspace looked up is the
//! employee's most recent record.

use std::time::Duration;

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use chrono::{DateTime, Utc};
use hrp_server_workspace::{
	DeprovisionOutcome, DeprovisionReport, LiveWorkspace, ReconcileOptions, ReconcileReport,
	StatusLookup, Workspace, WorkspaceError, WorkspaceId, WorkspaceStatus, WorkspaceStatusView,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::ServerError;

/// A workspace record as returned over HTTP. Never carries the password.
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
	pub id: WorkspaceId,
	pub employee_id: String,
	pub name: String,
	pub department: String,
	pub status: WorkspaceStatus,
	pub url: Option<String>,
	pub dns_name: Option<String>,
	pub username: Option<String>,
	pub error: Option<String>,
	pub created_at: DateTime<Utc>,
	pub terminated_at: Option<DateTime<Utc>>,
}

impl From<Workspace> for WorkspaceResponse {
	fn from(workspace: Workspace) -> Self {
		Self {
			id: workspace.id,
			employee_id: workspace.employee_id,
			name: workspace.name,
			department: workspace.department,
			status: workspace.status,
			url: workspace.url,
			dns_name: workspace.dns_name,
			username: workspace.credentials.map(|c| c.username),
			error: workspace.error,
			created_at: workspace.created_at,
			terminated_at: workspace.terminated_at,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct ListWorkspacesResponse {
	pub workspaces: Vec<WorkspaceResponse>,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceEnvelope {
	pub workspace: WorkspaceResponse,
}

#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
	pub username: String,
	pub password: String,
}

/// Returned once, when the workspace is created.
#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
	pub workspace: WorkspaceResponse,
	pub credentials: Option<CredentialsResponse>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
	pub status: WorkspaceStatusView,
}

#[derive(Debug, Serialize)]
pub struct LiveWorkspacesResponse {
	pub workspaces: Vec<LiveWorkspace>,
}

#[derive(Debug, Serialize)]
pub struct DeprovisionResponse {
	pub message: String,
	pub report: Option<DeprovisionReport>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvisionQuery {
	/// Overrides the routing mode's readiness timeout
	pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileQuery {
	pub remove_untracked: Option<bool>,
}

/// GET /api/workspaces - every workspace record.
pub async fn list_workspaces(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
	let records = state
		.inventory
		.list_records()
		.await
		.map_err(|e| state.fail(e))?;

	Ok(Json(ListWorkspacesResponse {
		workspaces: records.into_iter().map(WorkspaceResponse::from).collect(),
	}))
}

/// GET /api/workspaces/live - managed workspace pods in the cluster.
pub async fn list_live_workspaces(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
	let workspaces = state
		.inventory
		.list_live()
		.await
		.map_err(|e| state.fail(e))?;

	Ok(Json(LiveWorkspacesResponse { workspaces }))
}

/// GET /api/workspaces/employee/{employee_id}
pub async fn get_employee_workspace(
	State(state): State<AppState>,
	Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let workspace = state
		.inventory
		.record_for(&employee_id)
		.await
		.map_err(|e| state.fail(e))?
		.ok_or_else(|| {
			ServerError::NotFound(format!("No workspace found for employee {employee_id}"))
		})?;

	Ok(Json(WorkspaceEnvelope {
		workspace: workspace.into(),
	}))
}

/// GET /api/workspaces/employee/{employee_id}/status - record joined with the
/// live pod phase.
pub async fn get_workspace_status(
	State(state): State<AppState>,
	Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	match state
		.inventory
		.status(&employee_id)
		.await
		.map_err(|e| state.fail(e))?
	{
		StatusLookup::Found(status) => Ok(Json(StatusResponse { status })),
		StatusLookup::NotFound => Err(ServerError::NotFound(format!(
			"No workspace found for employee {employee_id}"
		))),
	}
}

/// POST /api/workspaces/provision/{employee_id}
pub async fn provision_workspace(
	State(state): State<AppState>,
	Path(employee_id): Path<String>,
	Query(query): Query<ProvisionQuery>,
) -> Result<impl IntoResponse, ServerError> {
	let deadline = match query.timeout_secs {
		Some(0) => {
			return Err(ServerError::BadRequest(
				"timeout_secs must be greater than zero".to_string(),
			))
		}
		Some(secs) => Some(Duration::from_secs(secs)),
		None => None,
	};

	let employee = state
		.employees
		.get(&employee_id)
		.await
		.map_err(|e| state.fail(WorkspaceError::Store(e)))?
		.ok_or_else(|| {
			state.fail(WorkspaceError::EmployeeNotFound {
				employee_id: employee_id.clone(),
			})
		})?;

	let workspace = state
		.provisioner
		.provision_with_deadline(&employee, deadline)
		.await
		.map_err(|e| state.fail(e))?;

	info!(
		employee_id = %employee_id,
		workspace_id = %workspace.id,
		name = %workspace.name,
		"Workspace provisioned"
	);

	let credentials = workspace.credentials.as_ref().and_then(|c| {
		c.password.as_ref().map(|password| CredentialsResponse {
			username: c.username.clone(),
			password: password.expose().clone(),
		})
	});

	Ok((
		StatusCode::CREATED,
		Json(ProvisionResponse {
			workspace: workspace.into(),
			credentials,
		}),
	))
}

/// POST /api/workspaces/{employee_id}/restart - recreate the desktop pod.
pub async fn restart_workspace(
	State(state): State<AppState>,
	Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let workspace = state
		.provisioner
		.restart(&employee_id)
		.await
		.map_err(|e| state.fail(e))?;

	info!(employee_id = %employee_id, workspace_id = %workspace.id, "Workspace restarted");

	Ok(Json(WorkspaceEnvelope {
		workspace: workspace.into(),
	}))
}

/// DELETE /api/workspaces/{employee_id} - tear down the employee's workspace.
///
/// Answers 200 when there was nothing to remove.
pub async fn deprovision_workspace(
	State(state): State<AppState>,
	Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let outcome = state
		.deprovisioner
		.deprovision(&employee_id)
		.await
		.map_err(|e| state.fail(e))?;

	let response = match outcome {
		DeprovisionOutcome::NotFound => DeprovisionResponse {
			message: format!("No workspace found for employee {employee_id}"),
			report: None,
		},
		DeprovisionOutcome::Removed(report) => {
			info!(
				employee_id = %employee_id,
				workspace_id = %report.workspace_id,
				failures = report.resource_failures.len(),
				"Workspace deprovisioned"
			);
			DeprovisionResponse {
				message: format!("Workspace {} deprovisioned", report.name),
				report: Some(report),
			}
		}
	};

	Ok(Json(response))
}

/// POST /api/workspaces/reconcile - align records with live workspaces.
pub async fn reconcile_workspaces(
	State(state): State<AppState>,
	Query(query): Query<ReconcileQuery>,
) -> Result<Json<ReconcileReport>, ServerError> {
	let options = ReconcileOptions {
		remove_untracked: query.remove_untracked.unwrap_or(state.remove_untracked),
	};
	let report = state
		.inventory
		.reconcile(options)
		.await
		.map_err(|e| state.fail(e))?;

	info!(
		kept = report.kept.len(),
		deleted = report.deleted.len(),
		untracked = report.untracked.len(),
		"Reconciliation requested"
	);

	Ok(Json(report))
}
