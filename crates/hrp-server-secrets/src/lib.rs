// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Envelope-encrypted storage for generated workspace passwords.
//!
//! Each password is encrypted with a fresh AES-256-GCM data key; the data key
//! is encrypted with the master key and stored alongside it, tagged with the
//! master key version.

pub mod encryption;
pub mod error;
pub mod key;
pub mod store;

pub use encryption::{generate_key, EncryptedData, KEY_SIZE, NONCE_SIZE};
pub use error::{SecretsError, SecretsResult};
pub use key::MasterKey;
pub use store::SqliteSecretStore;
