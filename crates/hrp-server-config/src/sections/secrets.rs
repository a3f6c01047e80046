// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential encryption section. The master key itself only comes from the
//! environment (`HRP_SERVER_SECRETS_MASTER_KEY` or `..._FILE`).

use hrp_common_secret::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretsConfigLayer {
	#[serde(default)]
	pub kek_version: Option<u32>,
}

impl SecretsConfigLayer {
	pub fn merge(&mut self, other: SecretsConfigLayer) {
		if other.kek_version.is_some() {
			self.kek_version = other.kek_version;
		}
	}

	pub fn finalize(self, master_key: Option<SecretString>) -> SecretsConfig {
		SecretsConfig {
			master_key,
			kek_version: self.kek_version.unwrap_or(1),
		}
	}
}

/// Without a master key the server generates an ephemeral one.
#[derive(Debug, Clone)]
pub struct SecretsConfig {
	pub master_key: Option<SecretString>,
	pub kek_version: u32,
}

impl Default for SecretsConfig {
	fn default() -> Self {
		SecretsConfigLayer::default().finalize(None)
	}
}
