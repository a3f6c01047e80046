// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the workspace provisioning server.
//!
//! Layered from built-in defaults, a TOML file and `HRP_SERVER_*`
//! environment variables, in increasing precedence. Secrets (master key,
//! webhook signing secret, DNS API token) are read only from the environment
//! and accept the `VAR_FILE` convention.
//!
//! # Usage
//!
//! ```ignore
//! use hrp_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use hrp_common_secret::{load_secret_env, SecretString};
use hrp_server_workspace::{HttpAccessRecordsConfig, WorkspaceConfig};
use tracing::{debug, info};

pub const MASTER_KEY_ENV: &str = "HRP_SERVER_SECRETS_MASTER_KEY";
pub const WEBHOOK_SECRET_ENV: &str = "HRP_SERVER_WEBHOOK_SECRET";
pub const DNS_TOKEN_ENV: &str = "HRP_SERVER_DNS_TOKEN";

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub workspace: WorkspaceConfig,
	pub notifications: NotificationsConfig,
	/// `None` disables access records; workspaces use their raw address
	pub dns: Option<HttpAccessRecordsConfig>,
	pub secrets: SecretsConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Secret values read outside the layered sources.
#[derive(Debug, Default)]
pub struct ConfigSecrets {
	pub master_key: Option<SecretString>,
	pub webhook_secret: Option<SecretString>,
	pub dns_token: Option<SecretString>,
}

impl ConfigSecrets {
	pub fn from_env() -> Result<Self, ConfigError> {
		let load = |var: &str| load_secret_env(var).map_err(|e| ConfigError::Secret(e.to_string()));
		Ok(Self {
			master_key: load(MASTER_KEY_ENV)?,
			webhook_secret: load(WEBHOOK_SECRET_ENV)?,
			dns_token: load(DNS_TOKEN_ENV)?,
		})
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`HRP_SERVER_*`)
/// 2. Config file (`/etc/hrp/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Same as [`load_config`] with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged, ConfigSecrets::from_env()?)
}

/// Resolve a merged layer into the runtime configuration.
pub fn finalize(
	layer: ServerConfigLayer,
	secrets: ConfigSecrets,
) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let workspace = layer.workspace.unwrap_or_default().finalize()?;
	let notifications = layer
		.notifications
		.unwrap_or_default()
		.finalize(secrets.webhook_secret)?;
	let dns = layer
		.dns
		.unwrap_or_default()
		.finalize(&workspace.url_scheme, secrets.dns_token)?;
	let secrets = layer.secrets.unwrap_or_default().finalize(secrets.master_key);

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		namespace = %workspace.namespace,
		routing_mode = ?workspace.routing_mode,
		webhooks = notifications.webhooks.len(),
		dns_enabled = dns.is_some(),
		master_key_configured = secrets.master_key.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		logging,
		workspace,
		notifications,
		dns,
		secrets,
	})
}
