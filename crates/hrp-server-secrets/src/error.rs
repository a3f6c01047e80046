// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for credential storage.

use hrp_server_db::DbError;
use hrp_server_workspace::StoreError;
use thiserror::Error;

pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Debug, Error)]
pub enum SecretsError {
	#[error("configuration error: {0}")]
	Configuration(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("decryption failed: {0}")]
	Decryption(String),

	#[error("invalid key size: expected {expected}, got {actual}")]
	InvalidKeySize { expected: usize, actual: usize },

	#[error("key version mismatch: expected {expected}, got {actual}")]
	KeyVersionMismatch { expected: u32, actual: u32 },

	#[error("corrupted data: {0}")]
	CorruptedData(String),

	#[error("database error: {0}")]
	Database(#[from] DbError),
}

impl SecretsError {
	/// Returns true if this error points at server misconfiguration or storage
	/// rather than bad stored data.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			SecretsError::Configuration(_) | SecretsError::Database(_)
		)
	}
}

impl From<SecretsError> for StoreError {
	fn from(err: SecretsError) -> Self {
		StoreError::Backend(err.to_string())
	}
}
