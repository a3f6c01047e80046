// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the provisioning server.
//!
//! Repositories expose inherent async methods returning [`DbError`] and
//! implement the collaborator traits from `hrp-server-workspace` on top of
//! them.

pub mod employee;
pub mod error;
pub mod pool;
pub mod secret;
pub mod testing;
pub mod workspace;

pub use employee::EmployeeRepository;
pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use secret::{EncryptedSecretRow, SecretRepository};
pub use workspace::WorkspaceRepository;
