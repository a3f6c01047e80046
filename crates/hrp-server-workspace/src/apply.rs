// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Creating workspace objects with conflict replacement, and tearing them down.

use std::time::Duration;

use hrp_server_k8s::{
	K8sClient, K8sError, PersistentVolumeClaim, Pod, ResourceKind, Secret, Service,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::WorkspaceError;
use crate::resources::ResourceNames;

/// A workspace object ready to submit to the cluster.
#[derive(Debug, Clone)]
pub enum ManagedResource {
	Secret(Secret),
	Pvc(PersistentVolumeClaim),
	Pod(Pod),
	Service(Service),
}

impl ManagedResource {
	pub fn kind(&self) -> ResourceKind {
		match self {
			ManagedResource::Secret(_) => ResourceKind::Secret,
			ManagedResource::Pvc(_) => ResourceKind::PersistentVolumeClaim,
			ManagedResource::Pod(_) => ResourceKind::Pod,
			ManagedResource::Service(_) => ResourceKind::Service,
		}
	}

	pub fn name(&self) -> &str {
		let name = match self {
			ManagedResource::Secret(r) => &r.metadata.name,
			ManagedResource::Pvc(r) => &r.metadata.name,
			ManagedResource::Pod(r) => &r.metadata.name,
			ManagedResource::Service(r) => &r.metadata.name,
		};
		name.as_deref().unwrap_or_default()
	}

	async fn create(&self, client: &dyn K8sClient, namespace: &str) -> Result<(), K8sError> {
		match self {
			ManagedResource::Secret(r) => client.create_secret(namespace, r.clone()).await.map(drop),
			ManagedResource::Pvc(r) => client.create_pvc(namespace, r.clone()).await.map(drop),
			ManagedResource::Pod(r) => client.create_pod(namespace, r.clone()).await.map(drop),
			ManagedResource::Service(r) => {
				client.create_service(namespace, r.clone()).await.map(drop)
			}
		}
	}
}

/// How a name clash on create is resolved.
#[derive(Debug, Clone, Copy)]
pub struct ConflictPolicy {
	/// Pause between deleting the stale object and the single retry
	pub retry_delay: Duration,
	pub pod_grace_period_secs: u32,
	/// Poll interval while a deleted pod terminates
	pub poll_interval: Duration,
}

/// Slack on top of the pod grace period before a terminating pod is given up on.
const POD_DELETION_MARGIN: Duration = Duration::from_secs(30);

/// Wait until the named pod no longer exists.
///
/// The API server rejects a new pod with the same name while the old one is
/// still terminating. Returns `false` if the pod outlives its grace period
/// plus [`POD_DELETION_MARGIN`].
pub async fn wait_for_pod_deletion(
	client: &dyn K8sClient,
	namespace: &str,
	name: &str,
	pod_grace_period_secs: u32,
	poll_interval: Duration,
) -> Result<bool, K8sError> {
	let deadline = tokio::time::Instant::now()
		+ Duration::from_secs(u64::from(pod_grace_period_secs))
		+ POD_DELETION_MARGIN;
	loop {
		match client.get_pod(name, namespace).await {
			Err(e) if e.is_not_found() => return Ok(true),
			Err(e) => return Err(e),
			Ok(_) => {}
		}
		if tokio::time::Instant::now() >= deadline {
			warn!(pod = name, "Pod still terminating after grace period");
			return Ok(false);
		}
		debug!(pod = name, "Waiting for pod to terminate");
		tokio::time::sleep(poll_interval).await;
	}
}

/// Delete one workspace object. An object that is already gone counts as
/// deleted.
pub async fn delete_resource(
	client: &dyn K8sClient,
	namespace: &str,
	kind: ResourceKind,
	name: &str,
	pod_grace_period_secs: u32,
) -> Result<(), K8sError> {
	let result = match kind {
		ResourceKind::Secret => client.delete_secret(name, namespace).await,
		ResourceKind::PersistentVolumeClaim => client.delete_pvc(name, namespace).await,
		ResourceKind::Pod => {
			client
				.delete_pod(name, namespace, pod_grace_period_secs)
				.await
		}
		ResourceKind::Service => client.delete_service(name, namespace).await,
		ResourceKind::Namespace | ResourceKind::Node => {
			return Err(K8sError::ApiError {
				message: format!("{kind} {name} is not owned by a workspace"),
			})
		}
	};

	match result {
		Err(e) if e.is_not_found() => {
			debug!(%kind, name, "Already deleted");
			Ok(())
		}
		other => other,
	}
}

/// Create `resource`; if it already exists, delete the stale object, wait
/// the fixed backoff (and for a pod, until the old one is gone) and retry
/// exactly once.
///
/// A second clash yields [`WorkspaceError::ResourceConflict`]; any other
/// failure is classified with [`WorkspaceError::from_cluster`].
pub async fn create_or_replace(
	client: &dyn K8sClient,
	namespace: &str,
	resource: &ManagedResource,
	policy: ConflictPolicy,
) -> Result<(), WorkspaceError> {
	let kind = resource.kind();
	let name = resource.name();
	let step = format!("create {kind} {name}");

	match resource.create(client, namespace).await {
		Ok(()) => return Ok(()),
		Err(e) if e.is_conflict() => {
			warn!(%kind, name, "Resource already exists, replacing it");
		}
		Err(e) => return Err(WorkspaceError::from_cluster(&step, e)),
	}

	delete_resource(client, namespace, kind, name, policy.pod_grace_period_secs)
		.await
		.map_err(|e| WorkspaceError::from_cluster(&format!("replace {kind} {name}"), e))?;
	if kind == ResourceKind::Pod {
		wait_for_pod_deletion(
			client,
			namespace,
			name,
			policy.pod_grace_period_secs,
			policy.poll_interval,
		)
		.await
		.map_err(|e| WorkspaceError::from_cluster(&format!("replace {kind} {name}"), e))?;
	}
	tokio::time::sleep(policy.retry_delay).await;

	match resource.create(client, namespace).await {
		Ok(()) => {
			info!(%kind, name, "Replaced stale resource");
			Ok(())
		}
		Err(e) if e.is_conflict() => Err(WorkspaceError::ResourceConflict {
			kind,
			name: name.to_string(),
		}),
		Err(e) => Err(WorkspaceError::from_cluster(&step, e)),
	}
}

/// Objects created by one provisioning attempt, for rollback.
#[derive(Debug, Default)]
pub struct CreatedResources {
	created: Vec<(ResourceKind, String)>,
}

impl CreatedResources {
	pub fn record(&mut self, kind: ResourceKind, name: &str) {
		self.created.push((kind, name.to_string()));
	}

	pub fn len(&self) -> usize {
		self.created.len()
	}

	pub fn is_empty(&self) -> bool {
		self.created.is_empty()
	}

	/// Delete everything recorded, newest first. Failures are logged and
	/// skipped so that the remaining objects are still removed.
	pub async fn rollback(self, client: &dyn K8sClient, namespace: &str, pod_grace_period_secs: u32) {
		for (kind, name) in self.created.into_iter().rev() {
			match delete_resource(client, namespace, kind, &name, pod_grace_period_secs).await {
				Ok(()) => debug!(%kind, name = %name, "Rolled back resource"),
				Err(e) => {
					warn!(%kind, name = %name, error = %e, "Failed to roll back resource")
				}
			}
		}
	}
}

/// One teardown step that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFailure {
	pub kind: String,
	pub name: String,
	pub error: String,
}

/// Delete every object of a workspace in reverse dependency order: Service,
/// Pod, Secret, volume claim.
///
/// Each deletion is attempted regardless of earlier failures.
pub async fn delete_workspace_resources(
	client: &dyn K8sClient,
	namespace: &str,
	names: &ResourceNames,
	pod_grace_period_secs: u32,
) -> Vec<ResourceFailure> {
	let steps = [
		(ResourceKind::Service, &names.service),
		(ResourceKind::Pod, &names.pod),
		(ResourceKind::Secret, &names.secret),
		(ResourceKind::PersistentVolumeClaim, &names.pvc),
	];

	let mut failures = Vec::new();
	for (kind, name) in steps {
		if let Err(e) = delete_resource(client, namespace, kind, name, pod_grace_period_secs).await {
			warn!(%kind, name = %name, error = %e, "Failed to delete workspace resource");
			failures.push(ResourceFailure {
				kind: kind.to_string(),
				name: name.clone(),
				error: e.to_string(),
			});
		}
	}
	failures
}
