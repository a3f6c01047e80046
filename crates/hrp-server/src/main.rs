// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Employee workspace provisioning server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hrp_server::{build_context, create_router, AppState};
use hrp_server_k8s::LazyKubeClient;
use hrp_server_workspace::{start_reconcile_task, ReconcileOptions};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod version;

/// hrp-server - provisions remote desktop workspaces for employees.
#[derive(Parser, Debug)]
#[command(name = "hrp-server", about = "Employee workspace provisioning server", version)]
struct Args {
	/// Config file to load instead of /etc/hrp/server.toml
	#[arg(long, env = "HRP_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => hrp_server_config::load_config_with_file(path),
		None => hrp_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	if config.logging.json {
		registry.with(tracing_subscriber::fmt::layer().json()).init();
	} else {
		registry.with(tracing_subscriber::fmt::layer()).init();
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		namespace = %config.workspace.namespace,
		"starting hrp-server"
	);

	let pool = hrp_server_db::create_pool(&config.database.url)
		.await
		.context("failed to open database")?;
	hrp_server_db::run_migrations(&pool)
		.await
		.context("failed to run migrations")?;

	let client = Arc::new(LazyKubeClient::new());
	let ctx = build_context(&config, pool.clone(), client)?;
	let state = AppState::new(pool, ctx, config.http.debug_errors);

	if let Err(e) = state.provisioner.ensure_namespace().await {
		tracing::warn!(
			error = %e,
			namespace = %config.workspace.namespace,
			"Workspace namespace check failed, provisioning will retry it"
		);
	}

	let reconcile_task = (config.workspace.reconcile_interval_secs > 0).then(|| {
		start_reconcile_task(
			Arc::clone(&state.inventory),
			Duration::from_secs(config.workspace.reconcile_interval_secs),
			ReconcileOptions {
				remove_untracked: config.workspace.remove_untracked,
			},
		)
	});

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	tracing::info!(addr = %addr, "listening");

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	if let Some(task) = reconcile_task {
		task.abort();
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
