// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! DNS access record section.

use hrp_common_secret::SecretString;
use hrp_server_workspace::dns::DEFAULT_RECORD_TTL;
use hrp_server_workspace::HttpAccessRecordsConfig;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DnsConfigLayer {
	#[serde(default)]
	pub api_url: Option<String>,
	#[serde(default)]
	pub domain: Option<String>,
	#[serde(default)]
	pub ttl: Option<u32>,
}

impl DnsConfigLayer {
	pub fn merge(&mut self, other: DnsConfigLayer) {
		if other.api_url.is_some() {
			self.api_url = other.api_url;
		}
		if other.domain.is_some() {
			self.domain = other.domain;
		}
		if other.ttl.is_some() {
			self.ttl = other.ttl;
		}
	}

	/// `None` when access records are disabled, i.e. neither the API URL nor
	/// the domain is set.
	pub fn finalize(
		self,
		url_scheme: &str,
		token: Option<SecretString>,
	) -> Result<Option<HttpAccessRecordsConfig>, ConfigError> {
		match (self.api_url, self.domain) {
			(None, None) => Ok(None),
			(Some(api_url), Some(domain)) => Ok(Some(HttpAccessRecordsConfig {
				api_url,
				domain,
				url_scheme: url_scheme.to_string(),
				token,
				ttl: self.ttl.unwrap_or(DEFAULT_RECORD_TTL),
			})),
			_ => Err(ConfigError::Validation(
				"dns.api_url and dns.domain must be set together".to_string(),
			)),
		}
	}
}
