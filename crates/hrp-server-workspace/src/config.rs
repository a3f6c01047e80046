// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace orchestrator configuration.

use std::time::Duration;

use crate::naming::NamingStrategy;

/// How a workspace is exposed outside the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
	/// Service of type NodePort, reached at a node's internal address
	#[default]
	NodePort,
	/// Service of type LoadBalancer, reached at the ingress hostname
	LoadBalancer,
}

impl RoutingMode {
	/// Readiness deadline used when neither config nor caller sets one.
	pub fn default_ready_timeout(&self) -> Duration {
		match self {
			RoutingMode::NodePort => Duration::from_secs(300),
			RoutingMode::LoadBalancer => Duration::from_secs(120),
		}
	}

	pub fn service_type(&self) -> &'static str {
		match self {
			RoutingMode::NodePort => "NodePort",
			RoutingMode::LoadBalancer => "LoadBalancer",
		}
	}
}

impl std::str::FromStr for RoutingMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"nodeport" | "node_port" | "node-port" => Ok(RoutingMode::NodePort),
			"loadbalancer" | "load_balancer" | "load-balancer" => Ok(RoutingMode::LoadBalancer),
			other => Err(format!("unknown routing mode: {other}")),
		}
	}
}

/// Configuration for the workspace provisioner.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
	/// Kubernetes namespace holding every workspace
	pub namespace: String,
	pub routing_mode: RoutingMode,
	pub naming: NamingStrategy,
	/// Readiness deadline override; the routing mode's default applies otherwise
	pub ready_timeout_secs: Option<u64>,
	pub poll_interval_secs: u64,
	/// Pause between deleting a conflicting resource and recreating it
	pub conflict_retry_delay_ms: u64,
	/// Attach a persistent volume claim for the employee's home directory
	pub persistent_storage: bool,
	pub storage_class: Option<String>,
	/// Replaces the department profile's desktop image
	pub image: Option<String>,
	pub service_account: Option<String>,
	pub image_pull_secrets: Vec<String>,
	/// Port the desktop listens on inside the pod
	pub container_port: i32,
	/// Port the service exposes (load-balancer mode)
	pub service_port: i32,
	pub url_scheme: String,
	/// Injected as AD_DOMAIN for directory login inside the desktop
	pub ad_domain: Option<String>,
	pub password_length: usize,
	pub pod_grace_period_secs: u32,
	/// Background reconciliation interval; zero disables the task
	pub reconcile_interval_secs: u64,
	/// Delete live resources that have no record during reconciliation
	pub remove_untracked: bool,
}

impl WorkspaceConfig {
	pub fn ready_timeout(&self) -> Duration {
		self
			.ready_timeout_secs
			.map(Duration::from_secs)
			.unwrap_or_else(|| self.routing_mode.default_ready_timeout())
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	pub fn conflict_retry_delay(&self) -> Duration {
		Duration::from_millis(self.conflict_retry_delay_ms)
	}
}

impl Default for WorkspaceConfig {
	fn default() -> Self {
		Self {
			namespace: "workspaces".to_string(),
			routing_mode: RoutingMode::NodePort,
			naming: NamingStrategy::WorkspaceId,
			ready_timeout_secs: None,
			poll_interval_secs: 5,
			conflict_retry_delay_ms: 2000,
			persistent_storage: true,
			storage_class: Some("gp2".to_string()),
			image: None,
			service_account: Some("workspace-user".to_string()),
			image_pull_secrets: Vec::new(),
			container_port: 6901,
			service_port: 6901,
			url_scheme: "https".to_string(),
			ad_domain: None,
			password_length: 16,
			pod_grace_period_secs: 5,
			reconcile_interval_secs: 1800, // 30 minutes
			remove_untracked: false,
		}
	}
}
