// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Debug;

use async_trait::async_trait;
use kube::{
	api::{Api, DeleteParams, ListParams, PostParams},
	config::KubeConfigOptions,
	Client, Config, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::client::K8sClient;
use crate::error::{K8sError, ResourceKind};
use crate::types::{Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service};

/// Production K8s client implementation using the kube crate.
#[derive(Clone)]
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Connect using the pod's service account when running in-cluster,
	/// otherwise the local kubeconfig (`KUBECONFIG` or `~/.kube/config`).
	pub async fn connect() -> Result<Self, K8sError> {
		let config = match Config::incluster() {
			Ok(config) => {
				debug!("Using in-cluster service account configuration");
				config
			}
			Err(in_cluster) => {
				debug!(error = %in_cluster, "In-cluster configuration unavailable, trying kubeconfig");
				Config::from_kubeconfig(&KubeConfigOptions::default())
					.await
					.map_err(|e| K8sError::Unavailable {
						message: format!("not running in-cluster ({in_cluster}) and no usable kubeconfig: {e}"),
					})?
			}
		};

		let client = Client::try_from(config).map_err(|e| K8sError::Unavailable {
			message: e.to_string(),
		})?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Wrap an already-built kube client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}

	fn namespaced<K>(&self, namespace: &str) -> Api<K>
	where
		K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
		<K as Resource>::DynamicType: Default,
	{
		Api::namespaced(self.client.clone(), namespace)
	}
}

async fn create_object<K>(api: Api<K>, kind: ResourceKind, object: &K) -> Result<K, K8sError>
where
	K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
	let name = object.name_any();
	api
		.create(&PostParams::default(), object)
		.await
		.map_err(|e| K8sError::from_kube(kind, &name, e))
}

async fn get_object<K>(api: Api<K>, kind: ResourceKind, name: &str) -> Result<K, K8sError>
where
	K: Resource + Clone + DeserializeOwned + Debug,
{
	api
		.get(name)
		.await
		.map_err(|e| K8sError::from_kube(kind, name, e))
}

async fn delete_object<K>(
	api: Api<K>,
	kind: ResourceKind,
	name: &str,
	params: &DeleteParams,
) -> Result<(), K8sError>
where
	K: Resource + Clone + DeserializeOwned + Debug,
{
	api
		.delete(name, params)
		.await
		.map(|_| ())
		.map_err(|e| K8sError::from_kube(kind, name, e))
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		get_object(Api::all(self.client.clone()), ResourceKind::Namespace, name).await
	}

	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError> {
		create_object(Api::all(self.client.clone()), ResourceKind::Namespace, &namespace).await
	}

	async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, K8sError> {
		create_object(self.namespaced(namespace), ResourceKind::Secret, &secret).await
	}

	async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		delete_object::<Secret>(
			self.namespaced(namespace),
			ResourceKind::Secret,
			name,
			&DeleteParams::default(),
		)
		.await
	}

	async fn create_pvc(
		&self,
		namespace: &str,
		pvc: PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError> {
		create_object(
			self.namespaced(namespace),
			ResourceKind::PersistentVolumeClaim,
			&pvc,
		)
		.await
	}

	async fn delete_pvc(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		delete_object::<PersistentVolumeClaim>(
			self.namespaced(namespace),
			ResourceKind::PersistentVolumeClaim,
			name,
			&DeleteParams::default(),
		)
		.await
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		create_object(self.namespaced(namespace), ResourceKind::Pod, &pod).await
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let dp = DeleteParams {
			grace_period_seconds: Some(grace_period_seconds),
			..Default::default()
		};
		delete_object::<Pod>(self.namespaced(namespace), ResourceKind::Pod, name, &dp).await
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		get_object(self.namespaced(namespace), ResourceKind::Pod, name).await
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = self.namespaced(namespace);
		let lp = ListParams::default().labels(label_selector);
		let pod_list = pods.list(&lp).await.map_err(|e| K8sError::ApiError {
			message: e.to_string(),
		})?;
		Ok(pod_list.items)
	}

	async fn create_service(
		&self,
		namespace: &str,
		service: Service,
	) -> Result<Service, K8sError> {
		create_object(self.namespaced(namespace), ResourceKind::Service, &service).await
	}

	async fn delete_service(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		delete_object::<Service>(
			self.namespaced(namespace),
			ResourceKind::Service,
			name,
			&DeleteParams::default(),
		)
		.await
	}

	async fn get_service(&self, name: &str, namespace: &str) -> Result<Service, K8sError> {
		get_object(self.namespaced(namespace), ResourceKind::Service, name).await
	}

	async fn get_node(&self, name: &str) -> Result<Node, K8sError> {
		get_object(Api::all(self.client.clone()), ResourceKind::Node, name).await
	}
}
