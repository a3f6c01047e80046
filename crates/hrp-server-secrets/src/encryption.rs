// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AES-256-GCM primitives for envelope encryption.
//!
//! Every credential is sealed with its own data key (DEK); the DEK is sealed
//! with the master key (KEK). Both layers use the same primitive.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

#[derive(Debug, Clone)]
pub struct EncryptedData {
	pub ciphertext: Vec<u8>,
	pub nonce: [u8; NONCE_SIZE],
}

impl EncryptedData {
	/// Rebuild from stored columns, rejecting a nonce of the wrong length.
	pub fn from_parts(ciphertext: Vec<u8>, nonce: &[u8]) -> SecretsResult<Self> {
		let nonce: [u8; NONCE_SIZE] = nonce.try_into().map_err(|_| {
			SecretsError::CorruptedData(format!(
				"nonce must be {NONCE_SIZE} bytes, got {}",
				nonce.len()
			))
		})?;
		Ok(Self { ciphertext, nonce })
	}
}

pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	OsRng.fill_bytes(key.as_mut());
	key
}

/// Random 96-bit nonce. A (key, nonce) pair must never repeat; each DEK
/// seals exactly one value so this holds trivially for the data layer.
fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> SecretsResult<EncryptedData> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let nonce_bytes = generate_nonce();

	let ciphertext = cipher
		.encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
		.map_err(|e| SecretsError::Encryption(e.to_string()))?;

	Ok(EncryptedData {
		ciphertext,
		nonce: nonce_bytes,
	})
}

pub fn open(key: &[u8; KEY_SIZE], encrypted: &EncryptedData) -> SecretsResult<Zeroizing<Vec<u8>>> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

	let plaintext = cipher
		.decrypt(
			Nonce::from_slice(&encrypted.nonce),
			encrypted.ciphertext.as_slice(),
		)
		.map_err(|e| SecretsError::Decryption(e.to_string()))?;

	Ok(Zeroizing::new(plaintext))
}

/// Open a sealed data key and check its length.
pub fn open_key(
	kek: &[u8; KEY_SIZE],
	encrypted: &EncryptedData,
) -> SecretsResult<Zeroizing<[u8; KEY_SIZE]>> {
	let plaintext = open(kek, encrypted)?;
	if plaintext.len() != KEY_SIZE {
		return Err(SecretsError::InvalidKeySize {
			expected: KEY_SIZE,
			actual: plaintext.len(),
		});
	}

	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	key.copy_from_slice(&plaintext);
	Ok(key)
}
