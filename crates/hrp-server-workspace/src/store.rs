// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collaborators the orchestrator persists to and reads from.

use async_trait::async_trait;
use hrp_common_secret::SecretString;

use crate::error::StoreError;
use crate::types::{Employee, Workspace, WorkspaceId, WorkspaceUpdate};

/// Durable workspace records.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
	/// The most recently created record for the employee, if any.
	async fn get_by_employee(&self, employee_id: &str) -> Result<Option<Workspace>, StoreError>;

	async fn create(&self, workspace: &Workspace) -> Result<(), StoreError>;

	/// Apply a partial update and return the updated record.
	async fn update(&self, id: &WorkspaceId, update: WorkspaceUpdate)
		-> Result<Workspace, StoreError>;

	async fn delete(&self, id: &WorkspaceId) -> Result<(), StoreError>;

	async fn list_all(&self) -> Result<Vec<Workspace>, StoreError>;
}

/// Read access to the HR system's employees.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
	async fn get(&self, employee_id: &str) -> Result<Option<Employee>, StoreError>;
}

/// Where generated desktop passwords are kept, keyed by employee.
#[async_trait]
pub trait SecretStore: Send + Sync {
	/// Store or replace the employee's password.
	async fn store_secret(
		&self,
		employee_id: &str,
		password: &SecretString,
	) -> Result<(), StoreError>;

	/// Remove the employee's password. Absence is not an error.
	async fn delete_secret(&self, employee_id: &str) -> Result<(), StoreError>;
}
