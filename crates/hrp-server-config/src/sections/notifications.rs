// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook notification section.

use hrp_common_secret::SecretString;
use hrp_server_workspace::{NotificationKind, WebhookEndpoint};
use serde::Deserialize;

use crate::error::ConfigError;

/// One webhook subscription. An empty `events` list subscribes to every event.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WebhookConfigLayer {
	pub url: String,
	#[serde(default)]
	pub events: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfigLayer {
	#[serde(default)]
	pub webhooks: Option<Vec<WebhookConfigLayer>>,
}

impl NotificationsConfigLayer {
	/// A later webhook list replaces the earlier one as a whole.
	pub fn merge(&mut self, other: NotificationsConfigLayer) {
		if other.webhooks.is_some() {
			self.webhooks = other.webhooks;
		}
	}

	/// `secret` signs every configured webhook.
	pub fn finalize(self, secret: Option<SecretString>) -> Result<NotificationsConfig, ConfigError> {
		let webhooks = self
			.webhooks
			.unwrap_or_default()
			.into_iter()
			.map(|hook| {
				if hook.url.trim().is_empty() {
					return Err(ConfigError::invalid(
						"notifications.webhooks.url",
						"must not be empty",
					));
				}
				let events = if hook.events.is_empty() {
					vec![NotificationKind::Provisioned, NotificationKind::Terminated]
				} else {
					hook
						.events
						.iter()
						.map(|event| parse_event(event))
						.collect::<Result<Vec<_>, _>>()?
				};
				Ok(WebhookEndpoint {
					url: hook.url,
					events,
					secret: secret.clone(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(NotificationsConfig { webhooks })
	}
}

fn parse_event(value: &str) -> Result<NotificationKind, ConfigError> {
	match value.trim() {
		"provisioned" | "workspace.provisioned" => Ok(NotificationKind::Provisioned),
		"terminated" | "workspace.terminated" => Ok(NotificationKind::Terminated),
		other => Err(ConfigError::invalid(
			"notifications.webhooks.events",
			format!("unknown event '{other}'"),
		)),
	}
}

#[derive(Debug, Clone, Default)]
pub struct NotificationsConfig {
	pub webhooks: Vec<WebhookEndpoint>,
}

impl NotificationsConfig {
	pub fn enabled(&self) -> bool {
		!self.webhooks.is_empty()
	}
}
