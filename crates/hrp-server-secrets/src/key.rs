// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The key-encryption key that wraps every per-credential data key.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hrp_common_secret::SecretString;
use zeroize::Zeroizing;

use crate::encryption::{self, EncryptedData, KEY_SIZE};
use crate::error::{SecretsError, SecretsResult};

/// Master key plus the version recorded next to every data key it wraps.
pub struct MasterKey {
	kek: Zeroizing<[u8; KEY_SIZE]>,
	version: u32,
}

impl MasterKey {
	pub fn new(kek: Zeroizing<[u8; KEY_SIZE]>, version: u32) -> Self {
		Self { kek, version }
	}

	/// Decode a base64 (standard alphabet) 32-byte key.
	pub fn from_base64(encoded: &SecretString, version: u32) -> SecretsResult<Self> {
		let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
			BASE64
				.decode(encoded.expose().trim().as_bytes())
				.map_err(|e| SecretsError::Configuration(format!("invalid master key base64: {e}")))?,
		);
		if bytes.len() != KEY_SIZE {
			return Err(SecretsError::Configuration(format!(
				"master key must be {KEY_SIZE} bytes, got {}",
				bytes.len()
			)));
		}

		let mut kek = Zeroizing::new([0u8; KEY_SIZE]);
		kek.copy_from_slice(&bytes);
		Ok(Self::new(kek, version))
	}

	/// A random key that lives only as long as the process.
	///
	/// Credentials sealed with it cannot be read after a restart.
	pub fn ephemeral() -> Self {
		Self::new(encryption::generate_key(), 1)
	}

	pub fn version(&self) -> u32 {
		self.version
	}

	pub fn wrap(&self, dek: &[u8; KEY_SIZE]) -> SecretsResult<EncryptedData> {
		encryption::seal(&self.kek, dek.as_slice())
	}

	pub fn unwrap_key(
		&self,
		version: u32,
		wrapped: &EncryptedData,
	) -> SecretsResult<Zeroizing<[u8; KEY_SIZE]>> {
		if version != self.version {
			return Err(SecretsError::KeyVersionMismatch {
				expected: self.version,
				actual: version,
			});
		}
		encryption::open_key(&self.kek, wrapped)
	}
}

impl std::fmt::Debug for MasterKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MasterKey")
			.field("kek", &"[REDACTED]")
			.field("version", &self.version)
			.finish()
	}
}
