// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, DnsConfigLayer, HttpConfigLayer, LoggingConfigLayer,
	NotificationsConfigLayer, SecretsConfigLayer, WorkspaceConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub workspace: Option<WorkspaceConfigLayer>,
	#[serde(default)]
	pub notifications: Option<NotificationsConfigLayer>,
	#[serde(default)]
	pub dns: Option<DnsConfigLayer>,
	#[serde(default)]
	pub secrets: Option<SecretsConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_option(
			&mut self.workspace,
			other.workspace,
			WorkspaceConfigLayer::merge,
		);
		merge_option(
			&mut self.notifications,
			other.notifications,
			NotificationsConfigLayer::merge,
		);
		merge_option(&mut self.dns, other.dns, DnsConfigLayer::merge);
		merge_option(&mut self.secrets, other.secrets, SecretsConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
