// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace record repository.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hrp_server_workspace::{
	Credentials, Endpoint, StoreError, Workspace, WorkspaceId, WorkspaceStatus, WorkspaceStore,
	WorkspaceUpdate,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{DbError, Result};

const SELECT_COLUMNS: &str = "id, employee_id, name, department, status, url, endpoint, dns_name, username, error, created_at, terminated_at";

/// Timestamps are stored with fixed precision so that text order is time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|ts| ts.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid timestamp {value}: {e}")))
}

fn row_to_workspace(row: &SqliteRow) -> Result<Workspace> {
	let id: String = row.get("id");
	let status: String = row.get("status");
	let endpoint: Option<String> = row.get("endpoint");
	let username: Option<String> = row.get("username");
	let created_at: String = row.get("created_at");
	let terminated_at: Option<String> = row.get("terminated_at");

	Ok(Workspace {
		id: id
			.parse::<WorkspaceId>()
			.map_err(|e| DbError::Internal(format!("Invalid workspace id {id}: {e}")))?,
		employee_id: row.get("employee_id"),
		name: row.get("name"),
		department: row.get("department"),
		status: status
			.parse::<WorkspaceStatus>()
			.map_err(DbError::Internal)?,
		url: row.get("url"),
		endpoint: endpoint
			.map(|json| serde_json::from_str::<Endpoint>(&json))
			.transpose()?,
		dns_name: row.get("dns_name"),
		credentials: username.map(|username| Credentials {
			username,
			password: None,
		}),
		error: row.get("error"),
		created_at: parse_timestamp(&created_at)?,
		terminated_at: terminated_at
			.as_deref()
			.map(parse_timestamp)
			.transpose()?,
	})
}

/// Repository for workspace records.
///
/// Only the username of a record's credentials is persisted; passwords live in
/// the encrypted secret store.
#[derive(Clone)]
pub struct WorkspaceRepository {
	pool: SqlitePool,
}

impl WorkspaceRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, workspace), fields(workspace_id = %workspace.id, employee_id = %workspace.employee_id))]
	pub async fn create_workspace(&self, workspace: &Workspace) -> Result<()> {
		let endpoint = workspace
			.endpoint
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		sqlx::query(
			r#"
			INSERT INTO workspaces (id, employee_id, name, department, status, url, endpoint, dns_name, username, error, created_at, terminated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(workspace.id.to_string())
		.bind(&workspace.employee_id)
		.bind(&workspace.name)
		.bind(&workspace.department)
		.bind(workspace.status.as_str())
		.bind(&workspace.url)
		.bind(endpoint)
		.bind(&workspace.dns_name)
		.bind(workspace.credentials.as_ref().map(|c| c.username.clone()))
		.bind(&workspace.error)
		.bind(format_timestamp(&workspace.created_at))
		.bind(workspace.terminated_at.as_ref().map(format_timestamp))
		.execute(&self.pool)
		.await?;

		tracing::debug!(workspace_id = %workspace.id, "workspace record created");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>> {
		let row = sqlx::query(&format!(
			"SELECT {SELECT_COLUMNS} FROM workspaces WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_workspace).transpose()
	}

	/// The newest record for the employee.
	#[tracing::instrument(skip(self))]
	pub async fn get_latest_for_employee(&self, employee_id: &str) -> Result<Option<Workspace>> {
		let row = sqlx::query(&format!(
			"SELECT {SELECT_COLUMNS} FROM workspaces WHERE employee_id = ? ORDER BY created_at DESC, id DESC LIMIT 1"
		))
		.bind(employee_id)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_workspace).transpose()
	}

	/// Apply `update` to the stored record and return the result.
	///
	/// Returns `Err(DbError::NotFound)` if the record does not exist.
	#[tracing::instrument(skip(self, update))]
	pub async fn update_workspace(
		&self,
		id: &WorkspaceId,
		update: WorkspaceUpdate,
	) -> Result<Workspace> {
		let mut workspace = self
			.get_workspace(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("workspace {id}")))?;
		workspace.apply(update);

		let endpoint = workspace
			.endpoint
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;
		sqlx::query(
			r#"
			UPDATE workspaces
			SET status = ?, url = ?, endpoint = ?, dns_name = ?, username = ?, error = ?, terminated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(workspace.status.as_str())
		.bind(&workspace.url)
		.bind(endpoint)
		.bind(&workspace.dns_name)
		.bind(workspace.credentials.as_ref().map(|c| c.username.clone()))
		.bind(&workspace.error)
		.bind(workspace.terminated_at.as_ref().map(format_timestamp))
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if let Some(credentials) = workspace.credentials.as_mut() {
			credentials.password = None;
		}
		tracing::debug!(workspace_id = %id, status = workspace.status.as_str(), "workspace record updated");
		Ok(workspace)
	}

	/// Returns `true` if a record was deleted.
	#[tracing::instrument(skip(self))]
	pub async fn delete_workspace(&self, id: &WorkspaceId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
		let rows = sqlx::query(&format!(
			"SELECT {SELECT_COLUMNS} FROM workspaces ORDER BY created_at, id"
		))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_workspace).collect()
	}
}

#[async_trait]
impl WorkspaceStore for WorkspaceRepository {
	async fn get_by_employee(
		&self,
		employee_id: &str,
	) -> std::result::Result<Option<Workspace>, StoreError> {
		Ok(self.get_latest_for_employee(employee_id).await?)
	}

	async fn create(&self, workspace: &Workspace) -> std::result::Result<(), StoreError> {
		Ok(self.create_workspace(workspace).await?)
	}

	async fn update(
		&self,
		id: &WorkspaceId,
		update: WorkspaceUpdate,
	) -> std::result::Result<Workspace, StoreError> {
		Ok(self.update_workspace(id, update).await?)
	}

	async fn delete(&self, id: &WorkspaceId) -> std::result::Result<(), StoreError> {
		self.delete_workspace(id).await?;
		Ok(())
	}

	async fn list_all(&self) -> std::result::Result<Vec<Workspace>, StoreError> {
		Ok(self.list_workspaces().await?)
	}
}
