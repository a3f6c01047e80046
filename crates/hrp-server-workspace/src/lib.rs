// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Employee workspace orchestration.
//!
//! Provisions a remote desktop workspace for a new employee (credential
//! Secret, optional home volume claim, desktop Pod and access Service), waits
//! until it is reachable, records it and notifies the employee. Departing
//! employees have everything removed again.
//!
//! # Architecture
//!
//! The orchestrator sits between the HTTP API (hrp-server) and the cluster
//! client (hrp-server-k8s). Persistence, the employee directory, credential
//! storage, DNS and notifications are reached through traits so that each can
//! be swapped or faked:
//!
//! - [`WorkspaceStore`], [`EmployeeDirectory`], [`SecretStore`]
//! - [`AccessRecordRegistrar`]
//! - [`Notifier`], driven by the fire-and-forget [`NotificationDispatcher`]

pub mod apply;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod credentials;
pub mod deprovisioner;
pub mod dns;
pub mod error;
pub mod inventory;
pub mod naming;
pub mod notify;
pub mod profile;
pub mod provisioner;
pub mod readiness;
pub mod resources;
pub mod store;
pub mod types;

pub use apply::ResourceFailure;
pub use cleanup::start_reconcile_task;
pub use config::{RoutingMode, WorkspaceConfig};
pub use context::WorkspaceContext;
pub use deprovisioner::{DeprovisionOutcome, DeprovisionReport, Deprovisioner};
pub use dns::{
	AccessRecord, AccessRecordRegistrar, DisabledAccessRecords, DnsError, HttpAccessRecords,
	HttpAccessRecordsConfig,
};
pub use error::{StoreError, WorkspaceError};
pub use inventory::{
	DeletedRecord, DeletionReason, Inventory, LivePhase, LiveWorkspace, ReconcileOptions,
	ReconcileReport, StatusLookup, WorkspaceStatusView,
};
pub use naming::NamingStrategy;
pub use notify::{
	NotificationDispatcher, NotificationEvent, NotificationKind, Notifier, NotifyError,
	WebhookEndpoint, WebhookNotifier,
};
pub use provisioner::Provisioner;
pub use store::{EmployeeDirectory, SecretStore, WorkspaceStore};
pub use types::{
	Credentials, Employee, EmployeeStatus, Endpoint, Workspace, WorkspaceId, WorkspaceStatus,
	WorkspaceUpdate,
};
