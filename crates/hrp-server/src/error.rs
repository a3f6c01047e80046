// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use std::error::Error as _;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use hrp_server_workspace::{StoreError, WorkspaceError};
use serde::Serialize;

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// No record for the requested employee or workspace.
	#[error("Not found: {0}")]
	NotFound(String),

	/// The employee already has a live workspace.
	#[error("Conflict: {0}")]
	Conflict(String),

	/// The cluster could not be reached.
	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),

	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// Anything else. `chain` carries the error's sources when detailed errors
	/// are switched on.
	#[error("Internal error: {message}")]
	Internal {
		message: String,
		chain: Option<Vec<String>>,
	},
}

impl ServerError {
	/// Map an orchestrator error, attaching its source chain if `detailed`.
	pub fn from_workspace(err: WorkspaceError, detailed: bool) -> Self {
		match &err {
			WorkspaceError::AlreadyProvisioned { .. } => ServerError::Conflict(err.to_string()),
			WorkspaceError::NotFound { .. }
			| WorkspaceError::EmployeeNotFound { .. }
			| WorkspaceError::Store(StoreError::NotFound(_)) => ServerError::NotFound(err.to_string()),
			WorkspaceError::ClusterUnavailable { .. } => {
				ServerError::ServiceUnavailable(err.to_string())
			}
			_ => ServerError::Internal {
				message: err.to_string(),
				chain: detailed.then(|| source_chain(&err)),
			},
		}
	}
}

fn source_chain(err: &WorkspaceError) -> Vec<String> {
	let mut chain = Vec::new();
	let mut current = err.source();
	while let Some(source) = current {
		chain.push(source.to_string());
		current = source.source();
	}
	chain
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chain: Option<Vec<String>>,
}

impl ErrorResponse {
	fn new(error: &str, message: String) -> Self {
		Self {
			error: error.to_string(),
			message,
			chain: None,
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match self {
			ServerError::NotFound(message) => {
				(StatusCode::NOT_FOUND, ErrorResponse::new("not_found", message))
			}
			ServerError::Conflict(message) => {
				(StatusCode::CONFLICT, ErrorResponse::new("conflict", message))
			}
			ServerError::ServiceUnavailable(message) => {
				tracing::warn!(error = %message, "cluster unavailable");
				(
					StatusCode::SERVICE_UNAVAILABLE,
					ErrorResponse::new("service_unavailable", message),
				)
			}
			ServerError::BadRequest(message) => {
				(StatusCode::BAD_REQUEST, ErrorResponse::new("bad_request", message))
			}
			ServerError::Internal { message, chain } => {
				tracing::error!(error = %message, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse {
						error: "internal_error".to_string(),
						message,
						chain,
					},
				)
			}
		};

		(status, Json(body)).into_response()
	}
}
