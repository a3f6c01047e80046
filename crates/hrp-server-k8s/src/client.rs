// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service};

/// Cluster operations used by the workspace orchestrator.
///
/// Creates return [`K8sError::AlreadyExists`] on a name clash and reads and
/// deletes return [`K8sError::NotFound`] for absent objects, so callers can
/// branch on conflicts and treat absence as success during teardown.
#[async_trait]
pub trait K8sClient: Send + Sync {
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError>;

	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError>;

	async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, K8sError>;

	async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	async fn create_pvc(
		&self,
		namespace: &str,
		pvc: PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError>;

	async fn delete_pvc(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// Delete a pod, giving its containers `grace_period_seconds` to exit.
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError>;

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError>;

	/// List pods in a namespace matching the given label selector.
	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError>;

	async fn create_service(&self, namespace: &str, service: Service)
		-> Result<Service, K8sError>;

	async fn delete_service(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	async fn get_service(&self, name: &str, namespace: &str) -> Result<Service, K8sError>;

	/// Nodes are cluster scoped.
	async fn get_node(&self, name: &str) -> Result<Node, K8sError>;
}
