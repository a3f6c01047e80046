// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared application state and router construction.

use std::sync::Arc;

use axum::{
	routing::{delete, get, post},
	Router,
};
use hrp_server_workspace::{
	Deprovisioner, EmployeeDirectory, Inventory, Provisioner, WorkspaceContext, WorkspaceError,
};
use sqlx::SqlitePool;

use crate::error::ServerError;
use crate::routes;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub employees: Arc<dyn EmployeeDirectory>,
	pub provisioner: Provisioner,
	pub deprovisioner: Arc<Deprovisioner>,
	pub inventory: Arc<Inventory>,
	/// Include error source chains in 500 responses
	pub debug_errors: bool,
	/// Default for reconcile requests that do not say
	pub remove_untracked: bool,
}

impl AppState {
	pub fn new(pool: SqlitePool, ctx: WorkspaceContext, debug_errors: bool) -> Self {
		let remove_untracked = ctx.config.remove_untracked;
		Self {
			pool,
			employees: ctx.employees.clone(),
			provisioner: Provisioner::new(ctx.clone()),
			deprovisioner: Arc::new(Deprovisioner::new(ctx.clone())),
			inventory: Arc::new(Inventory::new(ctx)),
			debug_errors,
			remove_untracked,
		}
	}

	pub(crate) fn fail(&self, err: WorkspaceError) -> ServerError {
		ServerError::from_workspace(err, self.debug_errors)
	}
}

/// Build the HTTP router. Path parameters are employee ids.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/workspaces", get(routes::workspaces::list_workspaces))
		.route("/api/workspaces/live", get(routes::workspaces::list_live_workspaces))
		.route(
			"/api/workspaces/reconcile",
			post(routes::workspaces::reconcile_workspaces),
		)
		.route(
			"/api/workspaces/employee/{employee_id}",
			get(routes::workspaces::get_employee_workspace),
		)
		.route(
			"/api/workspaces/employee/{employee_id}/status",
			get(routes::workspaces::get_workspace_status),
		)
		.route(
			"/api/workspaces/provision/{employee_id}",
			post(routes::workspaces::provision_workspace),
		)
		.route(
			"/api/workspaces/{employee_id}/restart",
			post(routes::workspaces::restart_workspace),
		)
		.route(
			"/api/workspaces/{employee_id}",
			delete(routes::workspaces::deprovision_workspace),
		)
		.with_state(state)
}
