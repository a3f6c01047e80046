// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Friendly access names (`first.last.<domain>`) for workspace endpoints.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hrp_common_secret::SecretString;
use serde::Serialize;
use tracing::{debug, info};

use crate::naming::access_dns_name;
use crate::types::{url_for_host, Employee, Endpoint};

pub const DEFAULT_RECORD_TTL: u32 = 60;

/// A registered access name and the URL built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
	pub dns_name: String,
	pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
	#[error("DNS access records are disabled")]
	Disabled,

	#[error("No usable DNS name for employee {employee_id}")]
	InvalidName { employee_id: String },

	#[error("DNS API request failed: {0}")]
	Request(String),

	#[error("DNS API rejected {action} for {name}: status {status}")]
	Rejected {
		action: &'static str,
		name: String,
		status: u16,
	},
}

/// Registers and removes access names for workspaces.
#[async_trait]
pub trait AccessRecordRegistrar: Send + Sync {
	/// Point the employee's access name at `endpoint`.
	async fn register(
		&self,
		employee: &Employee,
		endpoint: &Endpoint,
	) -> Result<AccessRecord, DnsError>;

	/// Remove the employee's access name, which currently points at `address`.
	async fn remove(&self, employee: &Employee, address: &str) -> Result<(), DnsError>;
}

/// Registrar used when no DNS zone is configured. Callers fall back to the
/// raw endpoint address.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAccessRecords;

#[async_trait]
impl AccessRecordRegistrar for DisabledAccessRecords {
	async fn register(&self, _: &Employee, _: &Endpoint) -> Result<AccessRecord, DnsError> {
		Err(DnsError::Disabled)
	}

	async fn remove(&self, _: &Employee, _: &str) -> Result<(), DnsError> {
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum ChangeAction {
	Upsert,
	Delete,
}

impl ChangeAction {
	fn as_str(&self) -> &'static str {
		match self {
			ChangeAction::Upsert => "UPSERT",
			ChangeAction::Delete => "DELETE",
		}
	}
}

/// One record change as accepted by the DNS API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct RecordChange {
	action: ChangeAction,
	name: String,
	#[serde(rename = "type")]
	record_type: &'static str,
	ttl: u32,
	value: String,
}

impl RecordChange {
	fn new(action: ChangeAction, name: &str, address: &str, ttl: u32) -> Self {
		let record_type = if address.parse::<IpAddr>().is_ok() {
			"A"
		} else {
			"CNAME"
		};
		Self {
			action,
			name: name.to_string(),
			record_type,
			ttl,
			value: address.to_string(),
		}
	}
}

/// Settings for [`HttpAccessRecords`].
#[derive(Debug, Clone)]
pub struct HttpAccessRecordsConfig {
	/// Base URL of the DNS API; changes are posted to `{api_url}/records`
	pub api_url: String,
	/// Zone the access names live under
	pub domain: String,
	pub url_scheme: String,
	pub token: Option<SecretString>,
	pub ttl: u32,
}

/// Manages access names through an HTTP DNS API.
pub struct HttpAccessRecords {
	config: HttpAccessRecordsConfig,
	http_client: reqwest::Client,
}

impl HttpAccessRecords {
	pub fn new(config: HttpAccessRecordsConfig) -> Result<Self, DnsError> {
		let http_client = reqwest::Client::builder()
			.timeout(Duration::from_secs(15))
			.build()
			.map_err(|e| DnsError::Request(e.to_string()))?;
		Ok(Self {
			config,
			http_client,
		})
	}

	fn dns_name(&self, employee: &Employee) -> Result<String, DnsError> {
		access_dns_name(employee, &self.config.domain).ok_or_else(|| DnsError::InvalidName {
			employee_id: employee.employee_id.clone(),
		})
	}

	async fn submit(&self, change: &RecordChange) -> Result<(), DnsError> {
		let url = format!("{}/records", self.config.api_url.trim_end_matches('/'));
		let mut request = self.http_client.post(&url).json(change);
		if let Some(token) = &self.config.token {
			request = request.bearer_auth(token.expose());
		}

		let response = request
			.send()
			.await
			.map_err(|e| DnsError::Request(e.to_string()))?;
		if !response.status().is_success() {
			return Err(DnsError::Rejected {
				action: change.action.as_str(),
				name: change.name.clone(),
				status: response.status().as_u16(),
			});
		}
		Ok(())
	}
}

#[async_trait]
impl AccessRecordRegistrar for HttpAccessRecords {
	async fn register(
		&self,
		employee: &Employee,
		endpoint: &Endpoint,
	) -> Result<AccessRecord, DnsError> {
		let dns_name = self.dns_name(employee)?;
		let change = RecordChange::new(
			ChangeAction::Upsert,
			&dns_name,
			endpoint.address(),
			self.config.ttl,
		);
		self.submit(&change).await?;

		info!(dns_name = %dns_name, target = %endpoint.address(), "Access record registered");
		Ok(AccessRecord {
			url: url_for_host(&self.config.url_scheme, &dns_name, endpoint.port()),
			dns_name,
		})
	}

	async fn remove(&self, employee: &Employee, address: &str) -> Result<(), DnsError> {
		let dns_name = self.dns_name(employee)?;
		let change = RecordChange::new(ChangeAction::Delete, &dns_name, address, self.config.ttl);
		self.submit(&change).await?;
		debug!(dns_name = %dns_name, "Access record removed");
		Ok(())
	}
}
