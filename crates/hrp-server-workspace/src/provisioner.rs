// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace provisioning: create, wait, publish, and roll back on failure.

use std::collections::BTreeMap;
use std::time::Duration;

use hrp_common_secret::SecretString;
use hrp_server_k8s::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, error, info, instrument, warn};

use crate::apply::{
	create_or_replace, delete_resource, delete_workspace_resources, wait_for_pod_deletion,
	ConflictPolicy, CreatedResources, ManagedResource,
};
use crate::context::WorkspaceContext;
use crate::credentials::generate_password;
use crate::dns::DnsError;
use crate::error::WorkspaceError;
use crate::naming::{username_for, workspace_name};
use crate::readiness::{ReadinessError, ReadinessWaiter};
use crate::resources::{ResourceNames, WorkspaceBlueprint, MANAGED_LABEL};
use crate::types::{
	Credentials, Employee, Endpoint, Workspace, WorkspaceId, WorkspaceStatus, WorkspaceUpdate,
};

/// Creates and restarts employee workspaces.
#[derive(Clone)]
pub struct Provisioner {
	ctx: WorkspaceContext,
}

impl Provisioner {
	pub fn new(ctx: WorkspaceContext) -> Self {
		Self { ctx }
	}

	/// Provision a workspace using the routing mode's readiness timeout.
	pub async fn provision(&self, employee: &Employee) -> Result<Workspace, WorkspaceError> {
		self.provision_with_deadline(employee, None).await
	}

	/// Provision a workspace for `employee`.
	///
	/// `deadline` bounds only the readiness wait. Once cluster objects have
	/// been created, a failure always rolls them back before returning.
	#[instrument(skip(self, employee), fields(employee_id = %employee.employee_id))]
	pub async fn provision_with_deadline(
		&self,
		employee: &Employee,
		deadline: Option<Duration>,
	) -> Result<Workspace, WorkspaceError> {
		self.check_not_provisioned(&employee.employee_id).await?;

		let config = &self.ctx.config;
		let id = WorkspaceId::new();
		let name = workspace_name(config.naming, &id, employee);
		let blueprint = WorkspaceBlueprint::new(id, &name, employee, config);
		let password = generate_password(config.password_length);

		let placeholder = Workspace::placeholder(id, &employee.employee_id, &name, &blueprint.department);
		self.ctx.store.create(&placeholder).await?;
		info!(workspace_id = %id, name = %name, department = %blueprint.department, "Provisioning workspace");

		let timeout = deadline.unwrap_or_else(|| config.ready_timeout());
		let mut created = CreatedResources::default();
		let result = self
			.build(employee, &blueprint, &password, timeout, &mut created)
			.await;
		match result {
			Ok(workspace) => {
				if let Err(e) = self
					.ctx
					.secrets
					.store_secret(&employee.employee_id, &password)
					.await
				{
					warn!(workspace_id = %id, error = %e, "Failed to store workspace credential");
				}
				self.ctx
					.notifier
					.notify_provisioned(employee, &workspace, &password);
				info!(workspace_id = %id, url = ?workspace.url, "Workspace provisioned");
				Ok(workspace)
			}
			Err(err) => {
				error!(workspace_id = %id, error = %err, rolled_back = created.len(), "Provisioning failed, rolling back");
				created
					.rollback(
						self.ctx.client.as_ref(),
						self.ctx.namespace(),
						config.pod_grace_period_secs,
					)
					.await;
				if let Err(e) = self
					.ctx
					.store
					.update(&id, WorkspaceUpdate::failed(err.to_string()))
					.await
				{
					warn!(workspace_id = %id, error = %e, "Failed to mark workspace record as errored");
				}
				Err(err)
			}
		}
	}

	async fn check_not_provisioned(&self, employee_id: &str) -> Result<(), WorkspaceError> {
		let Some(existing) = self.ctx.store.get_by_employee(employee_id).await? else {
			return Ok(());
		};
		if existing.status.is_live() {
			return Err(WorkspaceError::AlreadyProvisioned {
				employee_id: employee_id.to_string(),
				workspace_id: existing.id,
			});
		}

		debug!(workspace_id = %existing.id, status = existing.status.as_str(), "Removing stale workspace record");
		let failures = delete_workspace_resources(
			self.ctx.client.as_ref(),
			self.ctx.namespace(),
			&ResourceNames::for_workspace(&existing.name),
			self.ctx.config.pod_grace_period_secs,
		)
		.await;
		if !failures.is_empty() {
			warn!(workspace_id = %existing.id, failed = failures.len(), "Stale workspace resources left behind");
		}
		self.ctx.store.delete(&existing.id).await?;
		Ok(())
	}

	async fn build(
		&self,
		employee: &Employee,
		blueprint: &WorkspaceBlueprint,
		password: &SecretString,
		timeout: Duration,
		created: &mut CreatedResources,
	) -> Result<Workspace, WorkspaceError> {
		let config = &self.ctx.config;
		self.ensure_namespace().await?;

		let mut resources = vec![ManagedResource::Secret(blueprint.secret(config, password))];
		if config.persistent_storage {
			resources.push(ManagedResource::Pvc(blueprint.pvc(config)));
		}
		resources.push(ManagedResource::Pod(blueprint.pod(config)));
		resources.push(ManagedResource::Service(blueprint.service(config)));

		for resource in &resources {
			create_or_replace(
				self.ctx.client.as_ref(),
				self.ctx.namespace(),
				resource,
				self.conflict_policy(),
			)
			.await?;
			created.record(resource.kind(), resource.name());
			debug!(kind = %resource.kind(), name = resource.name(), "Created workspace resource");
		}

		let endpoint = self.wait_ready(blueprint, timeout).await?;
		let (url, dns_name) = self.publish(employee, &endpoint).await;

		let credentials = Credentials {
			username: username_for(employee),
			password: Some(password.clone()),
		};
		let update = WorkspaceUpdate {
			status: Some(WorkspaceStatus::Active),
			url: Some(url),
			endpoint: Some(endpoint),
			dns_name,
			credentials: Some(credentials.clone()),
			..Default::default()
		};
		let mut workspace = self.ctx.store.update(&blueprint.id, update).await?;
		workspace.credentials = Some(credentials);
		Ok(workspace)
	}

	/// Make sure the shared workspace namespace exists. It is never removed.
	pub async fn ensure_namespace(&self) -> Result<(), WorkspaceError> {
		let name = self.ctx.namespace();
		match self.ctx.client.get_namespace(name).await {
			Ok(_) => return Ok(()),
			Err(e) if e.is_not_found() => {}
			Err(e) => return Err(WorkspaceError::from_cluster("read namespace", e)),
		}

		let namespace = Namespace {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				labels: Some(BTreeMap::from([(
					MANAGED_LABEL.to_string(),
					"true".to_string(),
				)])),
				..Default::default()
			},
			..Default::default()
		};
		match self.ctx.client.create_namespace(namespace).await {
			Ok(_) => {
				info!(namespace = %name, "Created workspace namespace");
				Ok(())
			}
			Err(e) if e.is_conflict() => Ok(()),
			Err(e) => Err(WorkspaceError::from_cluster("create namespace", e)),
		}
	}

	async fn wait_ready(
		&self,
		blueprint: &WorkspaceBlueprint,
		timeout: Duration,
	) -> Result<Endpoint, WorkspaceError> {
		let config = &self.ctx.config;
		ReadinessWaiter::new(
			self.ctx.client.as_ref(),
			self.ctx.namespace(),
			config.routing_mode,
			config.poll_interval(),
		)
		.wait(&blueprint.names, timeout)
		.await
		.map_err(|e| readiness_failure(e, timeout))
	}

	/// Register the access name, falling back to the raw endpoint URL.
	async fn publish(&self, employee: &Employee, endpoint: &Endpoint) -> (String, Option<String>) {
		match self.ctx.access_records.register(employee, endpoint).await {
			Ok(record) => (record.url, Some(record.dns_name)),
			Err(DnsError::Disabled) => (endpoint.url(&self.ctx.config.url_scheme), None),
			Err(e) => {
				warn!(error = %e, address = %endpoint.address(), "Access record registration failed, using raw address");
				(endpoint.url(&self.ctx.config.url_scheme), None)
			}
		}
	}

	fn conflict_policy(&self) -> ConflictPolicy {
		ConflictPolicy {
			retry_delay: self.ctx.config.conflict_retry_delay(),
			pod_grace_period_secs: self.ctx.config.pod_grace_period_secs,
			poll_interval: self.ctx.config.poll_interval(),
		}
	}

	/// Recreate the employee's desktop pod and refresh its endpoint.
	///
	/// The credential Secret and home volume are left in place. If the pod
	/// cannot be brought back the record is marked errored.
	#[instrument(skip(self))]
	pub async fn restart(&self, employee_id: &str) -> Result<Workspace, WorkspaceError> {
		let workspace = self
			.ctx
			.store
			.get_by_employee(employee_id)
			.await?
			.filter(|w| w.status == WorkspaceStatus::Active)
			.ok_or_else(|| WorkspaceError::NotFound {
				employee_id: employee_id.to_string(),
			})?;
		let employee = self.ctx.employees.get(employee_id).await?.ok_or_else(|| {
			WorkspaceError::EmployeeNotFound {
				employee_id: employee_id.to_string(),
			}
		})?;

		let config = &self.ctx.config;
		let blueprint = WorkspaceBlueprint::new(workspace.id, &workspace.name, &employee, config);
		info!(workspace_id = %workspace.id, name = %workspace.name, "Restarting workspace");

		let endpoint = match self.recreate_pod(&blueprint).await {
			Ok(endpoint) => endpoint,
			Err(err) => {
				error!(workspace_id = %workspace.id, error = %err, "Restart failed, marking workspace as errored");
				if let Err(e) = self
					.ctx
					.store
					.update(&workspace.id, WorkspaceUpdate::failed(err.to_string()))
					.await
				{
					warn!(workspace_id = %workspace.id, error = %e, "Failed to mark workspace record as errored");
				}
				return Err(err);
			}
		};
		if workspace.endpoint.as_ref() == Some(&endpoint) {
			debug!(workspace_id = %workspace.id, "Endpoint unchanged after restart");
			return Ok(workspace);
		}

		let (url, dns_name) = self.publish(&employee, &endpoint).await;
		let update = WorkspaceUpdate {
			url: Some(url),
			endpoint: Some(endpoint),
			dns_name,
			..Default::default()
		};
		let updated = self.ctx.store.update(&workspace.id, update).await?;
		info!(workspace_id = %updated.id, url = ?updated.url, "Workspace restarted");
		Ok(updated)
	}

	/// Delete the pod, wait for it to terminate, create it again and wait
	/// for the new one to be ready.
	async fn recreate_pod(&self, blueprint: &WorkspaceBlueprint) -> Result<Endpoint, WorkspaceError> {
		let config = &self.ctx.config;
		let client = self.ctx.client.as_ref();
		let pod_name = &blueprint.names.pod;

		delete_resource(
			client,
			self.ctx.namespace(),
			hrp_server_k8s::ResourceKind::Pod,
			pod_name,
			config.pod_grace_period_secs,
		)
		.await
		.map_err(|e| WorkspaceError::from_cluster("delete pod", e))?;
		wait_for_pod_deletion(
			client,
			self.ctx.namespace(),
			pod_name,
			config.pod_grace_period_secs,
			config.poll_interval(),
		)
		.await
		.map_err(|e| WorkspaceError::from_cluster("wait for pod deletion", e))?;

		create_or_replace(
			client,
			self.ctx.namespace(),
			&ManagedResource::Pod(blueprint.pod(config)),
			self.conflict_policy(),
		)
		.await?;
		self.wait_ready(blueprint, config.ready_timeout()).await
	}
}

fn readiness_failure(err: ReadinessError, timeout: Duration) -> WorkspaceError {
	match err {
		ReadinessError::Timeout { name, .. } => WorkspaceError::ReadinessTimeout {
			name,
			timeout_secs: timeout.as_secs(),
		},
		ReadinessError::Failed { name, reason } => WorkspaceError::DependencyFailure {
			step: format!("start pod {name}"),
			reason,
		},
		ReadinessError::Cluster(e) => WorkspaceError::from_cluster("wait for readiness", e),
	}
}
