// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface for employee workspace provisioning.
//!
//! Exposes provisioning, restart, teardown, status and reconciliation of
//! employee workspaces over axum. The orchestration itself lives in
//! `hrp-server-workspace`; this crate maps requests onto it and its errors
//! onto status codes.

pub mod api;
pub mod error;
pub mod routes;
pub mod startup;

pub use api::{create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use startup::{build_context, StartupError};
