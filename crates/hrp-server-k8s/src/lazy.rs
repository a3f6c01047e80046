// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::kube_client::KubeClient;
use crate::types::{Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service};

/// Establishes a cluster connection.
#[async_trait]
pub trait Connect: Send + Sync {
	type Client: Send + Sync;

	async fn connect(&self) -> Result<Self::Client, K8sError>;
}

/// Connects with [`KubeClient::connect`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KubeConnector;

#[async_trait]
impl Connect for KubeConnector {
	type Client = KubeClient;

	async fn connect(&self) -> Result<KubeClient, K8sError> {
		KubeClient::connect().await
	}
}

/// A client that connects on first use.
///
/// A failed connection is not remembered: every call made while the cluster is
/// unreachable returns the connect error and the next call tries again.
pub struct LazyClient<C: Connect> {
	connector: C,
	cell: OnceCell<C::Client>,
}

pub type LazyKubeClient = LazyClient<KubeConnector>;

impl LazyKubeClient {
	pub fn new() -> Self {
		Self::with_connector(KubeConnector)
	}
}

impl Default for LazyKubeClient {
	fn default() -> Self {
		Self::new()
	}
}

impl<C: Connect> LazyClient<C> {
	pub fn with_connector(connector: C) -> Self {
		Self {
			connector,
			cell: OnceCell::new(),
		}
	}

	/// Whether a connection has been established.
	pub fn is_connected(&self) -> bool {
		self.cell.initialized()
	}

	async fn client(&self) -> Result<&C::Client, K8sError> {
		self
			.cell
			.get_or_try_init(|| async move {
				self.connector.connect().await.map_err(|e| {
					warn!(error = %e, "K8s client initialization failed, will retry on next use");
					e
				})
			})
			.await
	}
}

#[async_trait]
impl<C> K8sClient for LazyClient<C>
where
	C: Connect,
	C::Client: K8sClient,
{
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		self.client().await?.get_namespace(name).await
	}

	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError> {
		self.client().await?.create_namespace(namespace).await
	}

	async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, K8sError> {
		self.client().await?.create_secret(namespace, secret).await
	}

	async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		self.client().await?.delete_secret(name, namespace).await
	}

	async fn create_pvc(
		&self,
		namespace: &str,
		pvc: PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError> {
		self.client().await?.create_pvc(namespace, pvc).await
	}

	async fn delete_pvc(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		self.client().await?.delete_pvc(name, namespace).await
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		self.client().await?.create_pod(namespace, pod).await
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		self
			.client()
			.await?
			.delete_pod(name, namespace, grace_period_seconds)
			.await
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		self.client().await?.get_pod(name, namespace).await
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		self.client().await?.list_pods(namespace, label_selector).await
	}

	async fn create_service(
		&self,
		namespace: &str,
		service: Service,
	) -> Result<Service, K8sError> {
		self.client().await?.create_service(namespace, service).await
	}

	async fn delete_service(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		self.client().await?.delete_service(name, namespace).await
	}

	async fn get_service(&self, name: &str, namespace: &str) -> Result<Service, K8sError> {
		self.client().await?.get_service(name, namespace).await
	}

	async fn get_node(&self, name: &str) -> Result<Node, K8sError> {
		self.client().await?.get_node(name).await
	}
}
