// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Employee directory backed by the HR system's synchronized table.

use async_trait::async_trait;
use hrp_server_workspace::{Employee, EmployeeDirectory, EmployeeStatus, StoreError};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{DbError, Result};

fn row_to_employee(row: &SqliteRow) -> Result<Employee> {
	let status: String = row.get("status");
	Ok(Employee {
		employee_id: row.get("employee_id"),
		first_name: row.get("first_name"),
		last_name: row.get("last_name"),
		email: row.get("email"),
		department: row.get("department"),
		role: row.get("role"),
		status: status.parse::<EmployeeStatus>().map_err(DbError::Internal)?,
	})
}

#[derive(Clone)]
pub struct EmployeeRepository {
	pool: SqlitePool,
}

impl EmployeeRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>> {
		let row = sqlx::query(
			r#"
			SELECT employee_id, first_name, last_name, email, department, role, status
			FROM employees
			WHERE employee_id = ?
			"#,
		)
		.bind(employee_id)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_employee).transpose()
	}

	/// Insert the employee or overwrite the existing row with the same id.
	#[tracing::instrument(skip(self, employee), fields(employee_id = %employee.employee_id))]
	pub async fn upsert_employee(&self, employee: &Employee) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO employees (employee_id, first_name, last_name, email, department, role, status)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(employee_id) DO UPDATE SET
				first_name = excluded.first_name,
				last_name = excluded.last_name,
				email = excluded.email,
				department = excluded.department,
				role = excluded.role,
				status = excluded.status
			"#,
		)
		.bind(&employee.employee_id)
		.bind(&employee.first_name)
		.bind(&employee.last_name)
		.bind(&employee.email)
		.bind(&employee.department)
		.bind(&employee.role)
		.bind(employee.status.as_str())
		.execute(&self.pool)
		.await?;

		tracing::debug!(employee_id = %employee.employee_id, "employee upserted");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_employees(&self) -> Result<Vec<Employee>> {
		let rows = sqlx::query(
			r#"
			SELECT employee_id, first_name, last_name, email, department, role, status
			FROM employees
			ORDER BY employee_id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_employee).collect()
	}
}

#[async_trait]
impl EmployeeDirectory for EmployeeRepository {
	async fn get(&self, employee_id: &str) -> std::result::Result<Option<Employee>, StoreError> {
		Ok(self.get_employee(employee_id).await?)
	}
}
