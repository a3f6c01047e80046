// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use hrp_server_k8s::K8sClient;

use crate::config::WorkspaceConfig;
use crate::dns::{AccessRecordRegistrar, DisabledAccessRecords};
use crate::notify::NotificationDispatcher;
use crate::store::{EmployeeDirectory, SecretStore, WorkspaceStore};

/// Shared handles used by the provisioner, deprovisioner and inventory.
#[derive(Clone)]
pub struct WorkspaceContext {
	pub client: Arc<dyn K8sClient>,
	pub store: Arc<dyn WorkspaceStore>,
	pub employees: Arc<dyn EmployeeDirectory>,
	pub secrets: Arc<dyn SecretStore>,
	pub access_records: Arc<dyn AccessRecordRegistrar>,
	pub notifier: NotificationDispatcher,
	pub config: Arc<WorkspaceConfig>,
}

impl WorkspaceContext {
	/// A context with access records and notifications switched off.
	pub fn new(
		client: Arc<dyn K8sClient>,
		store: Arc<dyn WorkspaceStore>,
		employees: Arc<dyn EmployeeDirectory>,
		secrets: Arc<dyn SecretStore>,
		config: WorkspaceConfig,
	) -> Self {
		Self {
			client,
			store,
			employees,
			secrets,
			access_records: Arc::new(DisabledAccessRecords),
			notifier: NotificationDispatcher::disabled(),
			config: Arc::new(config),
		}
	}

	pub fn with_access_records(mut self, access_records: Arc<dyn AccessRecordRegistrar>) -> Self {
		self.access_records = access_records;
		self
	}

	pub fn with_notifier(mut self, notifier: NotificationDispatcher) -> Self {
		self.notifier = notifier;
		self
	}

	pub fn namespace(&self) -> &str {
		&self.config.namespace
	}
}
