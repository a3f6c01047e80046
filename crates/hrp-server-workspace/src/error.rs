// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace orchestration error types.

use hrp_server_k8s::{K8sError, ResourceKind};

use crate::types::WorkspaceId;

/// Errors raised by the record, employee and secret stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("Record not found: {0}")]
	NotFound(String),

	#[error("Store backend error: {0}")]
	Backend(String),
}

/// Errors that can occur while provisioning, deprovisioning or inspecting
/// workspaces.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
	/// The employee already has a live workspace
	#[error("Employee {employee_id} already has workspace {workspace_id}")]
	AlreadyProvisioned {
		employee_id: String,
		workspace_id: WorkspaceId,
	},

	/// No cluster client could be constructed
	#[error("Cluster unavailable: {message}")]
	ClusterUnavailable { message: String },

	/// A resource still existed after deleting it and retrying the create
	#[error("{kind} {name} still conflicts after retry")]
	ResourceConflict { kind: ResourceKind, name: String },

	/// The workspace did not become reachable before the deadline
	#[error("Workspace {name} not ready after {timeout_secs}s")]
	ReadinessTimeout { name: String, timeout_secs: u64 },

	/// A cluster call or the workload itself failed
	#[error("{step} failed: {reason}")]
	DependencyFailure { step: String, reason: String },

	#[error("No workspace found for employee {employee_id}")]
	NotFound { employee_id: String },

	#[error("Employee not found: {employee_id}")]
	EmployeeNotFound { employee_id: String },

	#[error(transparent)]
	Store(#[from] StoreError),

	/// Teardown finished but the record could not be removed
	#[error(
		"Failed to delete record for workspace {workspace_id} ({failed_resources} resource deletions also failed): {source}"
	)]
	RecordDeletion {
		workspace_id: WorkspaceId,
		failed_resources: usize,
		#[source]
		source: StoreError,
	},
}

impl WorkspaceError {
	/// Classify a cluster error raised during `step`.
	pub fn from_cluster(step: &str, err: K8sError) -> Self {
		match err {
			K8sError::Unavailable { message } => WorkspaceError::ClusterUnavailable { message },
			other => WorkspaceError::DependencyFailure {
				step: step.to_string(),
				reason: other.to_string(),
			},
		}
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, WorkspaceError::ReadinessTimeout { .. })
	}
}
