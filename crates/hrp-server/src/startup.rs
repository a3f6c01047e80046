// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring of configured services into a [`WorkspaceContext`].

use std::sync::Arc;

use hrp_server_config::ServerConfig;
use hrp_server_db::{EmployeeRepository, SecretRepository, WorkspaceRepository};
use hrp_server_k8s::K8sClient;
use hrp_server_secrets::{MasterKey, SecretsError, SqliteSecretStore};
use hrp_server_workspace::{
	DnsError, HttpAccessRecords, NotificationDispatcher, NotifyError, WebhookNotifier,
	WorkspaceContext,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("secrets setup failed: {0}")]
	Secrets(#[from] SecretsError),

	#[error("webhook notifier setup failed: {0}")]
	Notify(#[from] NotifyError),

	#[error("access record client setup failed: {0}")]
	Dns(#[from] DnsError),
}

/// Build the orchestrator context over SQLite-backed stores.
///
/// Without a configured master key an ephemeral one is generated; stored
/// credentials then cannot be read after a restart. Must be called inside a
/// tokio runtime when webhooks are configured.
pub fn build_context(
	config: &ServerConfig,
	pool: SqlitePool,
	client: Arc<dyn K8sClient>,
) -> Result<WorkspaceContext, StartupError> {
	let master_key = match &config.secrets.master_key {
		Some(encoded) => MasterKey::from_base64(encoded, config.secrets.kek_version)?,
		None => {
			warn!("No master key configured, generating an ephemeral key; stored credentials will not survive a restart");
			MasterKey::ephemeral()
		}
	};
	let secrets = SqliteSecretStore::new(SecretRepository::new(pool.clone()), Arc::new(master_key));

	let mut ctx = WorkspaceContext::new(
		client,
		Arc::new(WorkspaceRepository::new(pool.clone())),
		Arc::new(EmployeeRepository::new(pool)),
		Arc::new(secrets),
		config.workspace.clone(),
	);

	if config.notifications.enabled() {
		let notifier = WebhookNotifier::new(config.notifications.webhooks.clone())?;
		ctx = ctx.with_notifier(NotificationDispatcher::spawn(Arc::new(notifier)));
		info!(
			webhooks = config.notifications.webhooks.len(),
			"Webhook notifications enabled"
		);
	}

	if let Some(dns) = &config.dns {
		info!(domain = %dns.domain, "Access records enabled");
		ctx = ctx.with_access_records(Arc::new(HttpAccessRecords::new(dns.clone())?));
	}

	Ok(ctx)
}
