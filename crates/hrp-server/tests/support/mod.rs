// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use hrp_server::{create_router, AppState};
use hrp_server_db::testing::create_test_pool;
use hrp_server_db::{EmployeeRepository, SecretRepository, WorkspaceRepository};
use hrp_server_k8s::{
	K8sClient, K8sError, Namespace, Node, NodeAddress, PersistentVolumeClaim, Pod, PodCondition,
	PodSpec, PodStatus, ResourceKind, Secret, Service,
};
use hrp_server_secrets::{MasterKey, SqliteSecretStore};
use hrp_server_workspace::{Employee, EmployeeStatus, WorkspaceConfig, WorkspaceContext};
use k8s_openapi::api::core::v1::NodeStatus;
use tower::ServiceExt;

pub const NODE_IP: &str = "10.0.1.17";
pub const NODE_PORT: i32 = 31234;

/// Cluster whose pods are ready as soon as they are created.
#[derive(Default)]
pub struct ReadyCluster {
	objects: Mutex<HashMap<(ResourceKind, String), Option<Pod>>>,
	namespaces: Mutex<HashSet<String>>,
	services: Mutex<BTreeMap<String, Service>>,
	unavailable: AtomicBool,
}

impl ReadyCluster {
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::SeqCst);
	}

	/// Secrets, claims, pods and services present.
	pub fn resource_count(&self) -> usize {
		self.objects.lock().unwrap().len() + self.services.lock().unwrap().len()
	}

	pub fn has_pod(&self, name: &str) -> bool {
		self
			.objects
			.lock()
			.unwrap()
			.contains_key(&(ResourceKind::Pod, name.to_string()))
	}

	fn check(&self) -> Result<(), K8sError> {
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(K8sError::Unavailable {
				message: "no kubeconfig found".to_string(),
			});
		}
		Ok(())
	}

	fn insert(&self, kind: ResourceKind, name: String, pod: Option<Pod>) -> Result<(), K8sError> {
		self.check()?;
		let mut objects = self.objects.lock().unwrap();
		let key = (kind, name.clone());
		if objects.contains_key(&key) {
			return Err(K8sError::AlreadyExists { kind, name });
		}
		objects.insert(key, pod);
		Ok(())
	}

	fn remove(&self, kind: ResourceKind, name: &str) -> Result<(), K8sError> {
		self.check()?;
		match self.objects.lock().unwrap().remove(&(kind, name.to_string())) {
			Some(_) => Ok(()),
			None => Err(not_found(kind, name)),
		}
	}
}

fn not_found(kind: ResourceKind, name: &str) -> K8sError {
	K8sError::NotFound {
		kind,
		name: name.to_string(),
	}
}

fn make_ready(mut pod: Pod) -> Pod {
	pod.spec.get_or_insert_with(PodSpec::default).node_name = Some("node-a".to_string());
	pod.status = Some(PodStatus {
		phase: Some("Running".to_string()),
		host_ip: Some(NODE_IP.to_string()),
		conditions: Some(vec![PodCondition {
			type_: "Ready".to_string(),
			status: "True".to_string(),
			..Default::default()
		}]),
		..Default::default()
	});
	pod
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
	let labels = pod.metadata.labels.clone().unwrap_or_default();
	selector.split(',').all(|term| match term.split_once('=') {
		Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
		None => labels.contains_key(term),
	})
}

#[async_trait]
impl K8sClient for ReadyCluster {
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		self.check()?;
		if self.namespaces.lock().unwrap().contains(name) {
			Ok(Namespace::default())
		} else {
			Err(not_found(ResourceKind::Namespace, name))
		}
	}

	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError> {
		self.check()?;
		let name = namespace.metadata.name.clone().unwrap_or_default();
		self.namespaces.lock().unwrap().insert(name);
		Ok(namespace)
	}

	async fn create_secret(&self, _namespace: &str, secret: Secret) -> Result<Secret, K8sError> {
		let name = secret.metadata.name.clone().unwrap_or_default();
		self.insert(ResourceKind::Secret, name, None)?;
		Ok(secret)
	}

	async fn delete_secret(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.remove(ResourceKind::Secret, name)
	}

	async fn create_pvc(
		&self,
		_namespace: &str,
		pvc: PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError> {
		let name = pvc.metadata.name.clone().unwrap_or_default();
		self.insert(ResourceKind::PersistentVolumeClaim, name, None)?;
		Ok(pvc)
	}

	async fn delete_pvc(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.remove(ResourceKind::PersistentVolumeClaim, name)
	}

	async fn create_pod(&self, _namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let pod = make_ready(pod);
		self.insert(ResourceKind::Pod, name, Some(pod.clone()))?;
		Ok(pod)
	}

	async fn delete_pod(
		&self,
		name: &str,
		_namespace: &str,
		_grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		self.remove(ResourceKind::Pod, name)
	}

	async fn get_pod(&self, name: &str, _namespace: &str) -> Result<Pod, K8sError> {
		self.check()?;
		self
			.objects
			.lock()
			.unwrap()
			.get(&(ResourceKind::Pod, name.to_string()))
			.cloned()
			.flatten()
			.ok_or_else(|| not_found(ResourceKind::Pod, name))
	}

	async fn list_pods(&self, _namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		self.check()?;
		Ok(self
			.objects
			.lock()
			.unwrap()
			.values()
			.flatten()
			.filter(|pod| matches_selector(pod, label_selector))
			.cloned()
			.collect())
	}

	async fn create_service(&self, _namespace: &str, mut service: Service) -> Result<Service, K8sError> {
		self.check()?;
		let name = service.metadata.name.clone().unwrap_or_default();
		let mut services = self.services.lock().unwrap();
		if services.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: ResourceKind::Service,
				name,
			});
		}
		if let Some(port) = service
			.spec
			.as_mut()
			.and_then(|s| s.ports.as_mut())
			.and_then(|ports| ports.first_mut())
		{
			port.node_port = Some(NODE_PORT);
		}
		services.insert(name, service.clone());
		Ok(service)
	}

	async fn delete_service(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.check()?;
		match self.services.lock().unwrap().remove(name) {
			Some(_) => Ok(()),
			None => Err(not_found(ResourceKind::Service, name)),
		}
	}

	async fn get_service(&self, name: &str, _namespace: &str) -> Result<Service, K8sError> {
		self.check()?;
		self
			.services
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| not_found(ResourceKind::Service, name))
	}

	async fn get_node(&self, name: &str) -> Result<Node, K8sError> {
		self.check()?;
		Ok(Node {
			status: Some(NodeStatus {
				addresses: Some(vec![NodeAddress {
					type_: "InternalIP".to_string(),
					address: NODE_IP.to_string(),
				}]),
				..Default::default()
			}),
			metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			..Default::default()
		})
	}
}

pub fn ada() -> Employee {
	Employee {
		employee_id: "E-1001".to_string(),
		first_name: "Ada".to_string(),
		last_name: "Lovelace".to_string(),
		email: "ada@example.com".to_string(),
		department: Some("engineering".to_string()),
		role: None,
		status: EmployeeStatus::Active,
	}
}

/// Router over an in-memory database and a [`ReadyCluster`].
pub struct TestApp {
	pub cluster: Arc<ReadyCluster>,
	pub employees: EmployeeRepository,
	pub workspaces: WorkspaceRepository,
	pub secrets: SqliteSecretStore,
	pub router: Router,
}

impl TestApp {
	pub async fn new() -> Self {
		Self::with_debug_errors(false).await
	}

	pub async fn with_debug_errors(debug_errors: bool) -> Self {
		let pool = create_test_pool().await;
		let cluster = Arc::new(ReadyCluster::default());
		let employees = EmployeeRepository::new(pool.clone());
		let workspaces = WorkspaceRepository::new(pool.clone());
		let secrets = SqliteSecretStore::new(
			SecretRepository::new(pool.clone()),
			Arc::new(MasterKey::ephemeral()),
		);

		let config = WorkspaceConfig {
			ready_timeout_secs: Some(5),
			poll_interval_secs: 1,
			conflict_retry_delay_ms: 10,
			..Default::default()
		};
		let ctx = WorkspaceContext::new(
			cluster.clone(),
			Arc::new(workspaces.clone()),
			Arc::new(employees.clone()),
			Arc::new(secrets.clone()),
			config,
		);
		let router = create_router(AppState::new(pool, ctx, debug_errors));

		Self {
			cluster,
			employees,
			workspaces,
			secrets,
			router,
		}
	}

	pub async fn add_employee(&self, employee: &Employee) {
		self.employees.upsert_employee(employee).await.unwrap();
	}

	/// Send a request and decode the JSON body.
	pub async fn call(&self, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
		let request = Request::builder()
			.method(method)
			.uri(uri)
			.body(Body::empty())
			.unwrap();
		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let body = if bytes.is_empty() {
			serde_json::Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, body)
	}
}
