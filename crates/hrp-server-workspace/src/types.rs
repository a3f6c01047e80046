// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Employee and workspace record types.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use hrp_common_secret::SecretString;
use serde::{Deserialize, Serialize};

/// Department key used when an employee has neither a department nor a role.
pub const DEFAULT_DEPARTMENT: &str = "default";

/// Employment status as recorded by the HR system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
	Active,
	Inactive,
	Terminated,
}

impl EmployeeStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			EmployeeStatus::Active => "active",
			EmployeeStatus::Inactive => "inactive",
			EmployeeStatus::Terminated => "terminated",
		}
	}
}

impl std::str::FromStr for EmployeeStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(EmployeeStatus::Active),
			"inactive" => Ok(EmployeeStatus::Inactive),
			"terminated" => Ok(EmployeeStatus::Terminated),
			other => Err(format!("unknown employee status: {other}")),
		}
	}
}

/// An employee as read from the directory. Owned by the HR system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
	pub employee_id: String,
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub department: Option<String>,
	pub role: Option<String>,
	pub status: EmployeeStatus,
}

impl Employee {
	/// Lowercased department, falling back to role, then `default`.
	pub fn department_key(&self) -> String {
		[self.department.as_deref(), self.role.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.find(|value| !value.is_empty())
			.unwrap_or(DEFAULT_DEPARTMENT)
			.to_lowercase()
	}

	pub fn full_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name)
	}
}

/// Unique identifier for a workspace, using UUID7 (time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(uuid7::Uuid);

impl WorkspaceId {
	pub fn new() -> Self {
		Self(uuid7::uuid7())
	}
}

impl Default for WorkspaceId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for WorkspaceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for WorkspaceId {
	type Err = uuid7::ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let uuid = s.parse::<uuid7::Uuid>()?;
		Ok(Self(uuid))
	}
}

/// Lifecycle of a workspace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
	/// Placeholder written before any cluster resource exists
	Provisioning,
	/// Resources ready and access URL resolved
	Active,
	Terminated,
	/// Provisioning failed and its resources were rolled back
	Error,
}

impl WorkspaceStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			WorkspaceStatus::Provisioning => "provisioning",
			WorkspaceStatus::Active => "active",
			WorkspaceStatus::Terminated => "terminated",
			WorkspaceStatus::Error => "error",
		}
	}

	/// Whether a record in this state blocks a new provision for the employee.
	pub fn is_live(&self) -> bool {
		matches!(self, WorkspaceStatus::Provisioning | WorkspaceStatus::Active)
	}
}

impl std::str::FromStr for WorkspaceStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"provisioning" => Ok(WorkspaceStatus::Provisioning),
			"active" => Ok(WorkspaceStatus::Active),
			"terminated" => Ok(WorkspaceStatus::Terminated),
			"error" => Ok(WorkspaceStatus::Error),
			other => Err(format!("unknown workspace status: {other}")),
		}
	}
}

/// Login for the remote desktop session.
///
/// The password is only present on the value returned by provisioning;
/// persisted records keep the username and the secret store keeps the
/// password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	pub username: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password: Option<SecretString>,
}

/// Where a ready workspace can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
	/// Node address plus the service's allocated node port.
	NodePort { node_ip: String, node_port: i32 },
	/// External load balancer hostname (or address) plus the service port.
	LoadBalancer { hostname: String, port: i32 },
}

impl Endpoint {
	pub fn address(&self) -> &str {
		match self {
			Endpoint::NodePort { node_ip, .. } => node_ip,
			Endpoint::LoadBalancer { hostname, .. } => hostname,
		}
	}

	pub fn port(&self) -> i32 {
		match self {
			Endpoint::NodePort { node_port, .. } => *node_port,
			Endpoint::LoadBalancer { port, .. } => *port,
		}
	}

	/// Whether the address is a literal IP (as opposed to a hostname).
	pub fn is_ip(&self) -> bool {
		self.address().parse::<IpAddr>().is_ok()
	}

	pub fn url(&self, scheme: &str) -> String {
		url_for_host(scheme, self.address(), self.port())
	}
}

pub(crate) fn url_for_host(scheme: &str, host: &str, port: i32) -> String {
	format!("{scheme}://{host}:{port}")
}

/// A persisted workspace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
	pub id: WorkspaceId,
	pub employee_id: String,
	/// Base name shared by the pod and its derived resources
	pub name: String,
	pub department: String,
	pub status: WorkspaceStatus,
	pub url: Option<String>,
	pub endpoint: Option<Endpoint>,
	pub dns_name: Option<String>,
	pub credentials: Option<Credentials>,
	pub error: Option<String>,
	pub created_at: DateTime<Utc>,
	pub terminated_at: Option<DateTime<Utc>>,
}

impl Workspace {
	/// A fresh `provisioning` record.
	pub fn placeholder(id: WorkspaceId, employee_id: &str, name: &str, department: &str) -> Self {
		Self {
			id,
			employee_id: employee_id.to_string(),
			name: name.to_string(),
			department: department.to_string(),
			status: WorkspaceStatus::Provisioning,
			url: None,
			endpoint: None,
			dns_name: None,
			credentials: None,
			error: None,
			created_at: Utc::now(),
			terminated_at: None,
		}
	}

	/// Overwrite every field the update carries.
	pub fn apply(&mut self, update: WorkspaceUpdate) {
		if let Some(status) = update.status {
			self.status = status;
		}
		if let Some(url) = update.url {
			self.url = Some(url);
		}
		if let Some(endpoint) = update.endpoint {
			self.endpoint = Some(endpoint);
		}
		if let Some(dns_name) = update.dns_name {
			self.dns_name = Some(dns_name);
		}
		if let Some(credentials) = update.credentials {
			self.credentials = Some(credentials);
		}
		if let Some(error) = update.error {
			self.error = Some(error);
		}
		if let Some(terminated_at) = update.terminated_at {
			self.terminated_at = Some(terminated_at);
		}
	}
}

/// Partial update of a workspace record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceUpdate {
	pub status: Option<WorkspaceStatus>,
	pub url: Option<String>,
	pub endpoint: Option<Endpoint>,
	pub dns_name: Option<String>,
	pub credentials: Option<Credentials>,
	pub error: Option<String>,
	pub terminated_at: Option<DateTime<Utc>>,
}

impl WorkspaceUpdate {
	pub fn failed(reason: impl Into<String>) -> Self {
		Self {
			status: Some(WorkspaceStatus::Error),
			error: Some(reason.into()),
			..Default::default()
		}
	}
}
