// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage for envelope-encrypted workspace credentials.
//!
//! This repository only moves opaque bytes. Encryption and key handling live
//! in `hrp-server-secrets`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::Result;
use crate::workspace::{format_timestamp, parse_timestamp};

/// One encrypted credential row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecretRow {
	pub employee_id: String,
	pub ciphertext: Vec<u8>,
	pub nonce: Vec<u8>,
	/// Data key encrypted under the key-encryption key
	pub encrypted_dek: Vec<u8>,
	pub dek_nonce: Vec<u8>,
	pub kek_version: u32,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

fn row_to_secret(row: &SqliteRow) -> Result<EncryptedSecretRow> {
	let kek_version: i64 = row.get("kek_version");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");
	Ok(EncryptedSecretRow {
		employee_id: row.get("employee_id"),
		ciphertext: row.get("ciphertext"),
		nonce: row.get("nonce"),
		encrypted_dek: row.get("encrypted_dek"),
		dek_nonce: row.get("dek_nonce"),
		kek_version: kek_version as u32,
		created_at: parse_timestamp(&created_at)?,
		updated_at: parse_timestamp(&updated_at)?,
	})
}

#[derive(Clone)]
pub struct SecretRepository {
	pool: SqlitePool,
}

impl SecretRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert or replace the employee's credential. `created_at` of an
	/// existing row is preserved.
	#[tracing::instrument(skip(self, row), fields(employee_id = %row.employee_id, kek_version = row.kek_version))]
	pub async fn upsert_secret(&self, row: &EncryptedSecretRow) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO workspace_secrets (employee_id, ciphertext, nonce, encrypted_dek, dek_nonce, kek_version, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(employee_id) DO UPDATE SET
				ciphertext = excluded.ciphertext,
				nonce = excluded.nonce,
				encrypted_dek = excluded.encrypted_dek,
				dek_nonce = excluded.dek_nonce,
				kek_version = excluded.kek_version,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(&row.employee_id)
		.bind(&row.ciphertext)
		.bind(&row.nonce)
		.bind(&row.encrypted_dek)
		.bind(&row.dek_nonce)
		.bind(i64::from(row.kek_version))
		.bind(format_timestamp(&row.created_at))
		.bind(format_timestamp(&row.updated_at))
		.execute(&self.pool)
		.await?;

		tracing::debug!(employee_id = %row.employee_id, "workspace secret stored");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_secret(&self, employee_id: &str) -> Result<Option<EncryptedSecretRow>> {
		let row = sqlx::query(
			r#"
			SELECT employee_id, ciphertext, nonce, encrypted_dek, dek_nonce, kek_version, created_at, updated_at
			FROM workspace_secrets
			WHERE employee_id = ?
			"#,
		)
		.bind(employee_id)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_secret).transpose()
	}

	/// Returns `true` if a row was deleted.
	#[tracing::instrument(skip(self))]
	pub async fn delete_secret(&self, employee_id: &str) -> Result<bool> {
		let result = sqlx::query("DELETE FROM workspace_secrets WHERE employee_id = ?")
			.bind(employee_id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}
}
