// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hrp_common_secret::SecretString;
use hrp_server_k8s::{
	K8sClient, K8sError, LoadBalancerIngress, Namespace, Node, NodeAddress, PersistentVolumeClaim,
	Pod, PodCondition, PodSpec, PodStatus, ResourceKind, Secret, Service,
};
use hrp_server_workspace::{
	AccessRecord, AccessRecordRegistrar, DnsError, Employee, EmployeeDirectory, EmployeeStatus,
	Endpoint, NotificationDispatcher, NotificationEvent, NotificationKind, Notifier, NotifyError,
	SecretStore, StoreError, Workspace, WorkspaceConfig, WorkspaceContext, WorkspaceId,
	WorkspaceStore, WorkspaceUpdate,
};
use k8s_openapi::api::core::v1::{LoadBalancerStatus, NodeStatus, ServiceStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tokio::sync::mpsc;

pub const NODE_IP: &str = "10.0.1.17";
pub const NODE_PORT: i32 = 31234;
pub const LB_HOSTNAME: &str = "a1b2c3.elb.example.com";

/// How pods created in the fake cluster behave.
#[derive(Debug, Clone)]
pub enum PodBehavior {
	Ready,
	NeverReady,
	Fails(String),
}

struct ClusterState {
	namespaces: HashSet<String>,
	secrets: BTreeMap<String, Secret>,
	pvcs: BTreeMap<String, PersistentVolumeClaim>,
	pods: BTreeMap<String, Pod>,
	services: BTreeMap<String, Service>,
	calls: Vec<String>,
	pod_behavior: PodBehavior,
	unavailable: bool,
	fail_create: HashSet<ResourceKind>,
	fail_delete: HashSet<ResourceKind>,
	/// Remaining create attempts per kind that answer "already exists"
	conflicts: HashMap<ResourceKind, usize>,
	/// Deleted pods stay terminating for their grace period
	linger_deleted_pods: bool,
	terminating: BTreeMap<String, tokio::time::Instant>,
}

impl ClusterState {
	fn purge_terminated(&mut self) {
		let now = tokio::time::Instant::now();
		let gone: Vec<String> = self
			.terminating
			.iter()
			.filter(|(_, until)| **until <= now)
			.map(|(name, _)| name.clone())
			.collect();
		for name in gone {
			self.terminating.remove(&name);
			self.pods.remove(&name);
		}
	}
}

/// In-memory cluster with call recording and failure injection.
pub struct FakeCluster {
	state: Mutex<ClusterState>,
}

impl FakeCluster {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(ClusterState {
				namespaces: HashSet::new(),
				secrets: BTreeMap::new(),
				pvcs: BTreeMap::new(),
				pods: BTreeMap::new(),
				services: BTreeMap::new(),
				calls: Vec::new(),
				pod_behavior: PodBehavior::Ready,
				unavailable: false,
				fail_create: HashSet::new(),
				fail_delete: HashSet::new(),
				conflicts: HashMap::new(),
				linger_deleted_pods: false,
				terminating: BTreeMap::new(),
			}),
		}
	}

	pub fn set_pod_behavior(&self, behavior: PodBehavior) {
		self.state.lock().unwrap().pod_behavior = behavior;
	}

	pub fn set_unavailable(&self, unavailable: bool) {
		self.state.lock().unwrap().unavailable = unavailable;
	}

	pub fn fail_create(&self, kind: ResourceKind) {
		self.state.lock().unwrap().fail_create.insert(kind);
	}

	pub fn fail_delete(&self, kind: ResourceKind) {
		self.state.lock().unwrap().fail_delete.insert(kind);
	}

	pub fn conflict_on_create(&self, kind: ResourceKind, times: usize) {
		self.state.lock().unwrap().conflicts.insert(kind, times);
	}

	/// Keep deleted pods around, terminating, until their grace period has
	/// passed. Creating a pod with the same name conflicts meanwhile.
	pub fn linger_deleted_pods(&self) {
		self.state.lock().unwrap().linger_deleted_pods = true;
	}

	pub fn set_pod_phase(&self, name: &str, phase: &str) {
		let mut state = self.state.lock().unwrap();
		if let Some(status) = state.pods.get_mut(name).and_then(|p| p.status.as_mut()) {
			status.phase = Some(phase.to_string());
			status.conditions = None;
		}
	}

	/// Number of workspace objects (secrets, claims, pods, services) present.
	pub fn resource_count(&self) -> usize {
		let mut state = self.state.lock().unwrap();
		state.purge_terminated();
		state.secrets.len() + state.pvcs.len() + state.pods.len() + state.services.len()
	}

	pub fn has(&self, kind: ResourceKind, name: &str) -> bool {
		let mut state = self.state.lock().unwrap();
		state.purge_terminated();
		match kind {
			ResourceKind::Secret => state.secrets.contains_key(name),
			ResourceKind::PersistentVolumeClaim => state.pvcs.contains_key(name),
			ResourceKind::Pod => state.pods.contains_key(name),
			ResourceKind::Service => state.services.contains_key(name),
			ResourceKind::Namespace => state.namespaces.contains(name),
			ResourceKind::Node => false,
		}
	}

	pub fn pod(&self, name: &str) -> Option<Pod> {
		self.state.lock().unwrap().pods.get(name).cloned()
	}

	pub fn calls(&self) -> Vec<String> {
		self.state.lock().unwrap().calls.clone()
	}

	pub fn count_calls(&self, prefix: &str) -> usize {
		self
			.state
			.lock()
			.unwrap()
			.calls
			.iter()
			.filter(|c| c.starts_with(prefix))
			.count()
	}

	/// Place a running pod for `name` as if an earlier provision created it.
	pub fn insert_live_pod(&self, name: &str, employee_id: &str, host_ip: &str) {
		let mut pod = ready_pod();
		pod.metadata.name = Some(name.to_string());
		pod.metadata.labels = Some(BTreeMap::from([
			("hrp.dev/managed".to_string(), "true".to_string()),
			("hrp.dev/workspace".to_string(), name.to_string()),
		]));
		pod.metadata.annotations = Some(BTreeMap::from([(
			"hrp.dev/employee-id".to_string(),
			employee_id.to_string(),
		)]));
		if let Some(status) = pod.status.as_mut() {
			status.host_ip = Some(host_ip.to_string());
		}
		self.state.lock().unwrap().pods.insert(name.to_string(), pod);
	}

	fn begin(&self, call: String, kind: ResourceKind, create: bool) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		state.purge_terminated();
		state.calls.push(call);
		if state.unavailable {
			return Err(K8sError::Unavailable {
				message: "no kubeconfig found".to_string(),
			});
		}
		if create {
			if state.fail_create.contains(&kind) {
				return Err(K8sError::ApiError {
					message: format!("injected {kind} create failure"),
				});
			}
			if let Some(remaining) = state.conflicts.get_mut(&kind) {
				if *remaining > 0 {
					*remaining -= 1;
					return Err(K8sError::AlreadyExists {
						kind,
						name: "injected".to_string(),
					});
				}
			}
		} else if state.fail_delete.contains(&kind) {
			return Err(K8sError::ApiError {
				message: format!("injected {kind} delete failure"),
			});
		}
		Ok(())
	}
}

fn ready_pod() -> Pod {
	Pod {
		spec: Some(PodSpec {
			node_name: Some("node-a".to_string()),
			..Default::default()
		}),
		status: Some(PodStatus {
			phase: Some("Running".to_string()),
			host_ip: Some(NODE_IP.to_string()),
			conditions: Some(vec![PodCondition {
				type_: "Ready".to_string(),
				status: "True".to_string(),
				..Default::default()
			}]),
			..Default::default()
		}),
		..Default::default()
	}
}

fn not_found(kind: ResourceKind, name: &str) -> K8sError {
	K8sError::NotFound {
		kind,
		name: name.to_string(),
	}
}

fn object_name(name: &Option<String>) -> String {
	name.clone().unwrap_or_default()
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
	let labels = pod.metadata.labels.clone().unwrap_or_default();
	selector.split(',').all(|term| match term.split_once('=') {
		Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
		None => labels.contains_key(term),
	})
}

#[async_trait]
impl K8sClient for FakeCluster {
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		self.begin(format!("get Namespace {name}"), ResourceKind::Namespace, false)?;
		let state = self.state.lock().unwrap();
		if state.namespaces.contains(name) {
			Ok(Namespace::default())
		} else {
			Err(not_found(ResourceKind::Namespace, name))
		}
	}

	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError> {
		let name = object_name(&namespace.metadata.name);
		self.begin(format!("create Namespace {name}"), ResourceKind::Namespace, true)?;
		self.state.lock().unwrap().namespaces.insert(name);
		Ok(namespace)
	}

	async fn create_secret(&self, _namespace: &str, secret: Secret) -> Result<Secret, K8sError> {
		let name = object_name(&secret.metadata.name);
		self.begin(format!("create Secret {name}"), ResourceKind::Secret, true)?;
		let mut state = self.state.lock().unwrap();
		if state.secrets.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: ResourceKind::Secret,
				name,
			});
		}
		state.secrets.insert(name, secret.clone());
		Ok(secret)
	}

	async fn delete_secret(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.begin(format!("delete Secret {name}"), ResourceKind::Secret, false)?;
		match self.state.lock().unwrap().secrets.remove(name) {
			Some(_) => Ok(()),
			None => Err(not_found(ResourceKind::Secret, name)),
		}
	}

	async fn create_pvc(
		&self,
		_namespace: &str,
		pvc: PersistentVolumeClaim,
	) -> Result<PersistentVolumeClaim, K8sError> {
		let name = object_name(&pvc.metadata.name);
		self.begin(
			format!("create PersistentVolumeClaim {name}"),
			ResourceKind::PersistentVolumeClaim,
			true,
		)?;
		let mut state = self.state.lock().unwrap();
		if state.pvcs.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: ResourceKind::PersistentVolumeClaim,
				name,
			});
		}
		state.pvcs.insert(name, pvc.clone());
		Ok(pvc)
	}

	async fn delete_pvc(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.begin(
			format!("delete PersistentVolumeClaim {name}"),
			ResourceKind::PersistentVolumeClaim,
			false,
		)?;
		match self.state.lock().unwrap().pvcs.remove(name) {
			Some(_) => Ok(()),
			None => Err(not_found(ResourceKind::PersistentVolumeClaim, name)),
		}
	}

	async fn create_pod(&self, _namespace: &str, mut pod: Pod) -> Result<Pod, K8sError> {
		let name = object_name(&pod.metadata.name);
		self.begin(format!("create Pod {name}"), ResourceKind::Pod, true)?;
		let mut state = self.state.lock().unwrap();
		if state.pods.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: ResourceKind::Pod,
				name,
			});
		}

		let template = ready_pod();
		if let Some(spec) = pod.spec.as_mut() {
			spec.node_name = Some("node-a".to_string());
		}
		pod.status = match &state.pod_behavior {
			PodBehavior::Ready => template.status,
			PodBehavior::NeverReady => Some(PodStatus {
				phase: Some("Pending".to_string()),
				..Default::default()
			}),
			PodBehavior::Fails(message) => Some(PodStatus {
				phase: Some("Failed".to_string()),
				message: Some(message.clone()),
				..Default::default()
			}),
		};
		state.pods.insert(name, pod.clone());
		Ok(pod)
	}

	async fn delete_pod(
		&self,
		name: &str,
		_namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		self.begin(format!("delete Pod {name}"), ResourceKind::Pod, false)?;
		let mut state = self.state.lock().unwrap();
		if !state.linger_deleted_pods {
			return match state.pods.remove(name) {
				Some(_) => Ok(()),
				None => Err(not_found(ResourceKind::Pod, name)),
			};
		}

		let Some(pod) = state.pods.get_mut(name) else {
			return Err(not_found(ResourceKind::Pod, name));
		};
		pod.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
		let until = tokio::time::Instant::now() + Duration::from_secs(u64::from(grace_period_seconds));
		state.terminating.entry(name.to_string()).or_insert(until);
		Ok(())
	}

	async fn get_pod(&self, name: &str, _namespace: &str) -> Result<Pod, K8sError> {
		self.begin(format!("get Pod {name}"), ResourceKind::Pod, false)?;
		self
			.state
			.lock()
			.unwrap()
			.pods
			.get(name)
			.cloned()
			.ok_or_else(|| not_found(ResourceKind::Pod, name))
	}

	async fn list_pods(&self, _namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		self.begin(format!("list Pod {label_selector}"), ResourceKind::Pod, false)?;
		Ok(
			self
				.state
				.lock()
				.unwrap()
				.pods
				.values()
				.filter(|pod| matches_selector(pod, label_selector))
				.cloned()
				.collect(),
		)
	}

	async fn create_service(&self, _namespace: &str, mut service: Service) -> Result<Service, K8sError> {
		let name = object_name(&service.metadata.name);
		self.begin(format!("create Service {name}"), ResourceKind::Service, true)?;
		let mut state = self.state.lock().unwrap();
		if state.services.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: ResourceKind::Service,
				name,
			});
		}

		let service_type = service
			.spec
			.as_ref()
			.and_then(|s| s.type_.clone())
			.unwrap_or_default();
		if service_type == "LoadBalancer" {
			service.status = Some(ServiceStatus {
				load_balancer: Some(LoadBalancerStatus {
					ingress: Some(vec![LoadBalancerIngress {
						hostname: Some(LB_HOSTNAME.to_string()),
						..Default::default()
					}]),
				}),
				..Default::default()
			});
		} else if let Some(port) = service
			.spec
			.as_mut()
			.and_then(|s| s.ports.as_mut())
			.and_then(|ports| ports.first_mut())
		{
			port.node_port = Some(NODE_PORT);
		}
		state.services.insert(name, service.clone());
		Ok(service)
	}

	async fn delete_service(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.begin(format!("delete Service {name}"), ResourceKind::Service, false)?;
		match self.state.lock().unwrap().services.remove(name) {
			Some(_) => Ok(()),
			None => Err(not_found(ResourceKind::Service, name)),
		}
	}

	async fn get_service(&self, name: &str, _namespace: &str) -> Result<Service, K8sError> {
		self.begin(format!("get Service {name}"), ResourceKind::Service, false)?;
		self
			.state
			.lock()
			.unwrap()
			.services
			.get(name)
			.cloned()
			.ok_or_else(|| not_found(ResourceKind::Service, name))
	}

	async fn get_node(&self, name: &str) -> Result<Node, K8sError> {
		self.begin(format!("get Node {name}"), ResourceKind::Node, false)?;
		Ok(Node {
			status: Some(NodeStatus {
				addresses: Some(vec![
					NodeAddress {
						type_: "Hostname".to_string(),
						address: name.to_string(),
					},
					NodeAddress {
						type_: "InternalIP".to_string(),
						address: NODE_IP.to_string(),
					},
				]),
				..Default::default()
			}),
			..Default::default()
		})
	}
}

/// Records kept in memory; `get_by_employee` returns the newest.
#[derive(Default)]
pub struct MemoryWorkspaceStore {
	records: Mutex<Vec<Workspace>>,
	fail_delete: AtomicBool,
}

impl MemoryWorkspaceStore {
	pub fn records(&self) -> Vec<Workspace> {
		self.records.lock().unwrap().clone()
	}

	pub fn insert(&self, workspace: Workspace) {
		self.records.lock().unwrap().push(workspace);
	}

	pub fn fail_delete(&self, fail: bool) {
		self.fail_delete.store(fail, Ordering::SeqCst);
	}
}

#[async_trait]
impl WorkspaceStore for MemoryWorkspaceStore {
	async fn get_by_employee(&self, employee_id: &str) -> Result<Option<Workspace>, StoreError> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.iter()
			.filter(|w| w.employee_id == employee_id)
			.max_by_key(|w| w.created_at)
			.cloned())
	}

	async fn create(&self, workspace: &Workspace) -> Result<(), StoreError> {
		self.records.lock().unwrap().push(workspace.clone());
		Ok(())
	}

	async fn update(
		&self,
		id: &WorkspaceId,
		update: WorkspaceUpdate,
	) -> Result<Workspace, StoreError> {
		let mut records = self.records.lock().unwrap();
		let record = records
			.iter_mut()
			.find(|w| &w.id == id)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
		record.apply(update);
		Ok(record.clone())
	}

	async fn delete(&self, id: &WorkspaceId) -> Result<(), StoreError> {
		if self.fail_delete.load(Ordering::SeqCst) {
			return Err(StoreError::Backend("injected delete failure".to_string()));
		}
		self.records.lock().unwrap().retain(|w| &w.id != id);
		Ok(())
	}

	async fn list_all(&self) -> Result<Vec<Workspace>, StoreError> {
		Ok(self.records())
	}
}

#[derive(Default)]
pub struct MemoryEmployees {
	employees: Mutex<HashMap<String, Employee>>,
}

impl MemoryEmployees {
	pub fn add(&self, employee: Employee) {
		self
			.employees
			.lock()
			.unwrap()
			.insert(employee.employee_id.clone(), employee);
	}
}

#[async_trait]
impl EmployeeDirectory for MemoryEmployees {
	async fn get(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
		Ok(self.employees.lock().unwrap().get(employee_id).cloned())
	}
}

#[derive(Default)]
pub struct MemorySecrets {
	secrets: Mutex<HashMap<String, String>>,
	fail: AtomicBool,
}

impl MemorySecrets {
	pub fn get(&self, employee_id: &str) -> Option<String> {
		self.secrets.lock().unwrap().get(employee_id).cloned()
	}

	pub fn fail(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}
}

#[async_trait]
impl SecretStore for MemorySecrets {
	async fn store_secret(&self, employee_id: &str, password: &SecretString) -> Result<(), StoreError> {
		if self.fail.load(Ordering::SeqCst) {
			return Err(StoreError::Backend("parameter store unreachable".to_string()));
		}
		self
			.secrets
			.lock()
			.unwrap()
			.insert(employee_id.to_string(), password.expose().clone());
		Ok(())
	}

	async fn delete_secret(&self, employee_id: &str) -> Result<(), StoreError> {
		self.secrets.lock().unwrap().remove(employee_id);
		Ok(())
	}
}

/// Forwards delivered event kinds to the test; optionally fails every delivery.
pub struct RecordingNotifier {
	sender: mpsc::UnboundedSender<NotificationKind>,
	fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
		let _ = self.sender.send(event.kind());
		if self.fail {
			return Err(NotifyError::Delivery {
				url: "http://mailer.invalid/hook".to_string(),
				message: "connection refused".to_string(),
			});
		}
		Ok(())
	}
}

/// Registrar that maps every endpoint to `first.last.corp.example`, or fails.
pub struct StaticAccessRecords {
	pub fail: bool,
	pub removed: Mutex<Vec<String>>,
}

#[async_trait]
impl AccessRecordRegistrar for StaticAccessRecords {
	async fn register(
		&self,
		employee: &Employee,
		endpoint: &Endpoint,
	) -> Result<AccessRecord, DnsError> {
		if self.fail {
			return Err(DnsError::Request("zone not found".to_string()));
		}
		let dns_name = format!(
			"{}.{}.corp.example",
			employee.first_name.to_lowercase(),
			employee.last_name.to_lowercase()
		);
		Ok(AccessRecord {
			url: format!("https://{dns_name}:{}", endpoint.port()),
			dns_name,
		})
	}

	async fn remove(&self, _employee: &Employee, address: &str) -> Result<(), DnsError> {
		self.removed.lock().unwrap().push(address.to_string());
		Ok(())
	}
}

pub fn test_config() -> WorkspaceConfig {
	WorkspaceConfig {
		ready_timeout_secs: Some(30),
		poll_interval_secs: 1,
		conflict_retry_delay_ms: 10,
		..Default::default()
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

pub fn employee(id: &str, first: &str, last: &str, department: &str) -> Employee {
	Employee {
		employee_id: id.to_string(),
		first_name: first.to_string(),
		last_name: last.to_string(),
		email: format!("{}@example.com", first.to_lowercase()),
		department: Some(department.to_string()),
		role: None,
		status: EmployeeStatus::Active,
	}
}

pub struct Harness {
	pub cluster: Arc<FakeCluster>,
	pub store: Arc<MemoryWorkspaceStore>,
	pub employees: Arc<MemoryEmployees>,
	pub secrets: Arc<MemorySecrets>,
	pub notifications: mpsc::UnboundedReceiver<NotificationKind>,
	pub ctx: WorkspaceContext,
}

impl Harness {
	pub fn new(config: WorkspaceConfig) -> Self {
		Self::build(config, false)
	}

	/// A harness whose notifier fails every delivery.
	pub fn with_failing_notifier(config: WorkspaceConfig) -> Self {
		Self::build(config, true)
	}

	fn build(config: WorkspaceConfig, fail_notifications: bool) -> Self {
		let cluster = Arc::new(FakeCluster::new());
		let store = Arc::new(MemoryWorkspaceStore::default());
		let employees = Arc::new(MemoryEmployees::default());
		let secrets = Arc::new(MemorySecrets::default());
		let (sender, notifications) = mpsc::unbounded_channel();
		let notifier = NotificationDispatcher::spawn(Arc::new(RecordingNotifier {
			sender,
			fail: fail_notifications,
		}));

		let ctx = WorkspaceContext::new(
			cluster.clone(),
			store.clone(),
			employees.clone(),
			secrets.clone(),
			config,
		)
		.with_notifier(notifier);

		Self {
			cluster,
			store,
			employees,
			secrets,
			notifications,
			ctx,
		}
	}

	pub fn with_access_records(mut self, registrar: Arc<dyn AccessRecordRegistrar>) -> Self {
		self.ctx = self.ctx.with_access_records(registrar);
		self
	}

	pub fn provisioner(&self) -> hrp_server_workspace::Provisioner {
		hrp_server_workspace::Provisioner::new(self.ctx.clone())
	}

	pub fn deprovisioner(&self) -> hrp_server_workspace::Deprovisioner {
		hrp_server_workspace::Deprovisioner::new(self.ctx.clone())
	}

	pub fn inventory(&self) -> hrp_server_workspace::Inventory {
		hrp_server_workspace::Inventory::new(self.ctx.clone())
	}

	/// Wait for the next delivered notification.
	pub async fn next_notification(&mut self) -> Option<NotificationKind> {
		tokio::time::timeout(Duration::from_secs(5), self.notifications.recv())
			.await
			.ok()
			.flatten()
	}
}
