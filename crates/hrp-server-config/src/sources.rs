// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, DnsConfigLayer, HttpConfigLayer, LoggingConfigLayer,
	NotificationsConfigLayer, SecretsConfigLayer, WebhookConfigLayer, WorkspaceConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is skipped.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/hrp/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: HRP_SERVER_<SECTION>_<FIELD>. Secrets are not read here; see
/// [`crate::load_config`].
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(DatabaseConfigLayer {
				url: env_var("HRP_SERVER_DATABASE_URL"),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("HRP_SERVER_LOG_LEVEL"),
				json: env_bool("HRP_SERVER_LOG_JSON"),
			}),
			workspace: Some(load_workspace_from_env()?),
			notifications: Some(load_notifications_from_env()),
			dns: Some(DnsConfigLayer {
				api_url: env_var("HRP_SERVER_DNS_API_URL"),
				domain: env_var("HRP_SERVER_DNS_DOMAIN"),
				ttl: env_parse("HRP_SERVER_DNS_TTL")?,
			}),
			secrets: Some(SecretsConfigLayer {
				kek_version: env_parse("HRP_SERVER_SECRETS_KEK_VERSION")?,
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::invalid(name, format!("invalid value '{v}'"))),
		None => Ok(None),
	}
}

/// Comma-separated list; blank entries are dropped.
fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|v| {
		v.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(String::from)
			.collect()
	})
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("HRP_SERVER_HOST"),
		port: env_parse("HRP_SERVER_PORT")?,
		debug_errors: env_bool("HRP_SERVER_DEBUG_ERRORS"),
	})
}

fn load_workspace_from_env() -> Result<WorkspaceConfigLayer, ConfigError> {
	Ok(WorkspaceConfigLayer {
		namespace: env_var("HRP_SERVER_WORKSPACE_NAMESPACE"),
		routing_mode: env_var("HRP_SERVER_WORKSPACE_ROUTING_MODE"),
		naming: env_var("HRP_SERVER_WORKSPACE_NAMING"),
		ready_timeout_secs: env_parse("HRP_SERVER_WORKSPACE_READY_TIMEOUT_SECS")?,
		poll_interval_secs: env_parse("HRP_SERVER_WORKSPACE_POLL_INTERVAL_SECS")?,
		conflict_retry_delay_ms: env_parse("HRP_SERVER_WORKSPACE_CONFLICT_RETRY_DELAY_MS")?,
		persistent_storage: env_bool("HRP_SERVER_WORKSPACE_PERSISTENT_STORAGE"),
		storage_class: env_var("HRP_SERVER_WORKSPACE_STORAGE_CLASS"),
		image: env_var("HRP_SERVER_WORKSPACE_IMAGE"),
		service_account: env_var("HRP_SERVER_WORKSPACE_SERVICE_ACCOUNT"),
		image_pull_secrets: env_list("HRP_SERVER_WORKSPACE_IMAGE_PULL_SECRETS"),
		container_port: env_parse("HRP_SERVER_WORKSPACE_CONTAINER_PORT")?,
		service_port: env_parse("HRP_SERVER_WORKSPACE_SERVICE_PORT")?,
		url_scheme: env_var("HRP_SERVER_WORKSPACE_URL_SCHEME"),
		ad_domain: env_var("HRP_SERVER_WORKSPACE_AD_DOMAIN"),
		password_length: env_parse("HRP_SERVER_WORKSPACE_PASSWORD_LENGTH")?,
		pod_grace_period_secs: env_parse("HRP_SERVER_WORKSPACE_POD_GRACE_PERIOD_SECS")?,
		reconcile_interval_secs: env_parse("HRP_SERVER_WORKSPACE_RECONCILE_INTERVAL_SECS")?,
		remove_untracked: env_bool("HRP_SERVER_WORKSPACE_REMOVE_UNTRACKED"),
	})
}

/// A single webhook can be configured from the environment.
fn load_notifications_from_env() -> NotificationsConfigLayer {
	NotificationsConfigLayer {
		webhooks: env_var("HRP_SERVER_WEBHOOK_URL").map(|url| {
			vec![WebhookConfigLayer {
				url,
				events: env_list("HRP_SERVER_WEBHOOK_EVENTS").unwrap_or_default(),
			}]
		}),
	}
}
