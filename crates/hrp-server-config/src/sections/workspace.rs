// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace orchestrator section.
//!
//! Finalizes directly into [`WorkspaceConfig`]; unset fields keep the
//! orchestrator's own defaults.

use hrp_server_workspace::credentials::MIN_PASSWORD_LENGTH;
use hrp_server_workspace::{NamingStrategy, RoutingMode, WorkspaceConfig};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceConfigLayer {
	#[serde(default)]
	pub namespace: Option<String>,
	/// `node_port` or `load_balancer`
	#[serde(default)]
	pub routing_mode: Option<String>,
	/// `workspace_id` or `employee_name`
	#[serde(default)]
	pub naming: Option<String>,
	#[serde(default)]
	pub ready_timeout_secs: Option<u64>,
	#[serde(default)]
	pub poll_interval_secs: Option<u64>,
	#[serde(default)]
	pub conflict_retry_delay_ms: Option<u64>,
	#[serde(default)]
	pub persistent_storage: Option<bool>,
	#[serde(default)]
	pub storage_class: Option<String>,
	#[serde(default)]
	pub image: Option<String>,
	#[serde(default)]
	pub service_account: Option<String>,
	#[serde(default)]
	pub image_pull_secrets: Option<Vec<String>>,
	#[serde(default)]
	pub container_port: Option<i32>,
	#[serde(default)]
	pub service_port: Option<i32>,
	#[serde(default)]
	pub url_scheme: Option<String>,
	#[serde(default)]
	pub ad_domain: Option<String>,
	#[serde(default)]
	pub password_length: Option<usize>,
	#[serde(default)]
	pub pod_grace_period_secs: Option<u32>,
	#[serde(default)]
	pub reconcile_interval_secs: Option<u64>,
	#[serde(default)]
	pub remove_untracked: Option<bool>,
}

macro_rules! overlay {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$self.$field = $other.$field;
			}
		)+
	};
}

impl WorkspaceConfigLayer {
	pub fn merge(&mut self, other: WorkspaceConfigLayer) {
		overlay!(
			self,
			other,
			namespace,
			routing_mode,
			naming,
			ready_timeout_secs,
			poll_interval_secs,
			conflict_retry_delay_ms,
			persistent_storage,
			storage_class,
			image,
			service_account,
			image_pull_secrets,
			container_port,
			service_port,
			url_scheme,
			ad_domain,
			password_length,
			pod_grace_period_secs,
			reconcile_interval_secs,
			remove_untracked,
		);
	}

	pub fn finalize(self) -> Result<WorkspaceConfig, ConfigError> {
		let defaults = WorkspaceConfig::default();

		let routing_mode = match self.routing_mode {
			Some(mode) => mode
				.parse::<RoutingMode>()
				.map_err(|e| ConfigError::invalid("workspace.routing_mode", e))?,
			None => defaults.routing_mode,
		};
		let naming = match self.naming {
			Some(naming) => naming
				.parse::<NamingStrategy>()
				.map_err(|e| ConfigError::invalid("workspace.naming", e))?,
			None => defaults.naming,
		};
		let password_length = self.password_length.unwrap_or(defaults.password_length);
		if password_length < MIN_PASSWORD_LENGTH {
			return Err(ConfigError::invalid(
				"workspace.password_length",
				format!("must be at least {MIN_PASSWORD_LENGTH}, got {password_length}"),
			));
		}
		let poll_interval_secs = self.poll_interval_secs.unwrap_or(defaults.poll_interval_secs);
		if poll_interval_secs == 0 {
			return Err(ConfigError::invalid(
				"workspace.poll_interval_secs",
				"must be greater than zero",
			));
		}

		Ok(WorkspaceConfig {
			namespace: self.namespace.unwrap_or(defaults.namespace),
			routing_mode,
			naming,
			ready_timeout_secs: self.ready_timeout_secs.or(defaults.ready_timeout_secs),
			poll_interval_secs,
			conflict_retry_delay_ms: self
				.conflict_retry_delay_ms
				.unwrap_or(defaults.conflict_retry_delay_ms),
			persistent_storage: self
				.persistent_storage
				.unwrap_or(defaults.persistent_storage),
			storage_class: self.storage_class.or(defaults.storage_class),
			image: self.image.or(defaults.image),
			service_account: self.service_account.or(defaults.service_account),
			image_pull_secrets: self
				.image_pull_secrets
				.unwrap_or(defaults.image_pull_secrets),
			container_port: self.container_port.unwrap_or(defaults.container_port),
			service_port: self.service_port.unwrap_or(defaults.service_port),
			url_scheme: self.url_scheme.unwrap_or(defaults.url_scheme),
			ad_domain: self.ad_domain.or(defaults.ad_domain),
			password_length,
			pod_grace_period_secs: self
				.pod_grace_period_secs
				.unwrap_or(defaults.pod_grace_period_secs),
			reconcile_interval_secs: self
				.reconcile_interval_secs
				.unwrap_or(defaults.reconcile_interval_secs),
			remove_untracked: self.remove_untracked.unwrap_or(defaults.remove_untracked),
		})
	}
}
