// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed credential store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hrp_common_secret::SecretString;
use hrp_server_db::{EncryptedSecretRow, SecretRepository};
use hrp_server_workspace::{SecretStore, StoreError};

use crate::encryption::{self, EncryptedData};
use crate::error::{SecretsError, SecretsResult};
use crate::key::MasterKey;

/// Stores one password per employee, each under its own data key.
#[derive(Clone)]
pub struct SqliteSecretStore {
	repo: SecretRepository,
	master: Arc<MasterKey>,
}

impl SqliteSecretStore {
	pub fn new(repo: SecretRepository, master: Arc<MasterKey>) -> Self {
		Self { repo, master }
	}

	#[tracing::instrument(skip(self, value))]
	pub async fn put(&self, employee_id: &str, value: &SecretString) -> SecretsResult<()> {
		let dek = encryption::generate_key();
		let sealed = encryption::seal(&dek, value.expose().as_bytes())?;
		let wrapped = self.master.wrap(&dek)?;

		let now = Utc::now();
		let row = EncryptedSecretRow {
			employee_id: employee_id.to_string(),
			ciphertext: sealed.ciphertext,
			nonce: sealed.nonce.to_vec(),
			encrypted_dek: wrapped.ciphertext,
			dek_nonce: wrapped.nonce.to_vec(),
			kek_version: self.master.version(),
			created_at: now,
			updated_at: now,
		};
		self.repo.upsert_secret(&row).await?;
		tracing::debug!(employee_id, kek_version = row.kek_version, "credential sealed and stored");
		Ok(())
	}

	/// Decrypt the employee's stored password.
	#[tracing::instrument(skip(self))]
	pub async fn get(&self, employee_id: &str) -> SecretsResult<Option<SecretString>> {
		let Some(row) = self.repo.get_secret(employee_id).await? else {
			return Ok(None);
		};

		let wrapped = EncryptedData::from_parts(row.encrypted_dek, &row.dek_nonce)?;
		let dek = self.master.unwrap_key(row.kek_version, &wrapped)?;
		let sealed = EncryptedData::from_parts(row.ciphertext, &row.nonce)?;
		let plaintext = encryption::open(&dek, &sealed)?;

		let value = std::str::from_utf8(&plaintext)
			.map_err(|e| SecretsError::CorruptedData(format!("credential is not UTF-8: {e}")))?;
		Ok(Some(SecretString::new(value.to_string())))
	}

	/// Returns `true` if a credential was removed.
	#[tracing::instrument(skip(self))]
	pub async fn remove(&self, employee_id: &str) -> SecretsResult<bool> {
		Ok(self.repo.delete_secret(employee_id).await?)
	}
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
	async fn store_secret(
		&self,
		employee_id: &str,
		password: &SecretString,
	) -> Result<(), StoreError> {
		Ok(self.put(employee_id, password).await?)
	}

	async fn delete_secret(&self, employee_id: &str) -> Result<(), StoreError> {
		self.remove(employee_id).await?;
		Ok(())
	}
}
