// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster objects making up one workspace: credential Secret, home volume
//! claim, desktop Pod and access Service.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use hrp_common_secret::SecretString;
use hrp_server_k8s::{
	Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource, PersistentVolumeClaim,
	PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod, PodSecurityContext, PodSpec,
	Probe, ResourceRequirements, Secret, SecretKeySelector, Service, ServicePort, ServiceSpec,
	TCPSocketAction, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::core::v1::LocalObjectReference;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::config::{RoutingMode, WorkspaceConfig};
use crate::naming::sanitize_label_value;
use crate::profile::DepartmentProfile;
use crate::types::{Employee, WorkspaceId};

pub const MANAGED_LABEL: &str = "hrp.dev/managed";
pub const WORKSPACE_LABEL: &str = "hrp.dev/workspace";
pub const WORKSPACE_ID_LABEL: &str = "hrp.dev/workspace-id";
pub const EMPLOYEE_LABEL: &str = "hrp.dev/employee";
pub const DEPARTMENT_LABEL: &str = "hrp.dev/department";
pub const EMPLOYEE_ID_ANNOTATION: &str = "hrp.dev/employee-id";
pub const EMPLOYEE_NAME_ANNOTATION: &str = "hrp.dev/employee-name";
pub const CREATED_AT_ANNOTATION: &str = "hrp.dev/created-at";

/// Selector matching every pod this orchestrator created.
pub const MANAGED_SELECTOR: &str = "hrp.dev/managed=true";

const CONTAINER_NAME: &str = "desktop";
const PORT_NAME: &str = "vnc";
const PASSWORD_KEY: &str = "vnc-password";
const EMPLOYEE_ID_KEY: &str = "employee-id";
const EMPLOYEE_EMAIL_KEY: &str = "employee-email";
const HOME_VOLUME: &str = "workspace-data";
const HOME_MOUNT_PATH: &str = "/home/kasm-user/workspace";
const SHM_VOLUME: &str = "shm";
const SHM_MOUNT_PATH: &str = "/dev/shm";
const SHM_SIZE: &str = "2Gi";
const DESKTOP_UID: i64 = 1000;

/// Names of every object derived from one workspace base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
	pub workspace: String,
	pub secret: String,
	pub pvc: String,
	pub pod: String,
	pub service: String,
}

impl ResourceNames {
	pub fn for_workspace(name: &str) -> Self {
		Self {
			workspace: name.to_string(),
			secret: format!("{name}-secret"),
			pvc: format!("{name}-pvc"),
			pod: name.to_string(),
			service: format!("{name}-svc"),
		}
	}
}

/// Everything needed to render a workspace's cluster objects.
#[derive(Debug, Clone)]
pub struct WorkspaceBlueprint {
	pub id: WorkspaceId,
	pub names: ResourceNames,
	pub employee: Employee,
	pub department: String,
	pub profile: DepartmentProfile,
	pub created_at: DateTime<Utc>,
}

impl WorkspaceBlueprint {
	pub fn new(id: WorkspaceId, name: &str, employee: &Employee, config: &WorkspaceConfig) -> Self {
		let department = employee.department_key();
		let profile =
			DepartmentProfile::for_department(&department).with_image(config.image.as_deref());
		Self {
			id,
			names: ResourceNames::for_workspace(name),
			employee: employee.clone(),
			department,
			profile,
			created_at: Utc::now(),
		}
	}

	fn labels(&self) -> BTreeMap<String, String> {
		BTreeMap::from([
			(MANAGED_LABEL.to_string(), "true".to_string()),
			(WORKSPACE_LABEL.to_string(), self.names.workspace.clone()),
			(WORKSPACE_ID_LABEL.to_string(), self.id.to_string()),
			(
				EMPLOYEE_LABEL.to_string(),
				sanitize_label_value(&self.employee.employee_id),
			),
			(
				DEPARTMENT_LABEL.to_string(),
				sanitize_label_value(&self.department),
			),
		])
	}

	fn metadata(&self, name: &str, config: &WorkspaceConfig) -> ObjectMeta {
		ObjectMeta {
			name: Some(name.to_string()),
			namespace: Some(config.namespace.clone()),
			labels: Some(self.labels()),
			..Default::default()
		}
	}

	pub fn secret(&self, config: &WorkspaceConfig, password: &SecretString) -> Secret {
		let string_data = BTreeMap::from([
			(PASSWORD_KEY.to_string(), password.expose().clone()),
			(
				EMPLOYEE_ID_KEY.to_string(),
				self.employee.employee_id.clone(),
			),
			(EMPLOYEE_EMAIL_KEY.to_string(), self.employee.email.clone()),
		]);

		Secret {
			metadata: self.metadata(&self.names.secret, config),
			type_: Some("Opaque".to_string()),
			string_data: Some(string_data),
			..Default::default()
		}
	}

	pub fn pvc(&self, config: &WorkspaceConfig) -> PersistentVolumeClaim {
		PersistentVolumeClaim {
			metadata: self.metadata(&self.names.pvc, config),
			spec: Some(PersistentVolumeClaimSpec {
				access_modes: Some(vec!["ReadWriteOnce".to_string()]),
				storage_class_name: config.storage_class.clone(),
				resources: Some(VolumeResourceRequirements {
					requests: Some(BTreeMap::from([(
						"storage".to_string(),
						Quantity(self.profile.storage.clone()),
					)])),
					..Default::default()
				}),
				..Default::default()
			}),
			status: None,
		}
	}

	pub fn pod(&self, config: &WorkspaceConfig) -> Pod {
		let mut metadata = self.metadata(&self.names.pod, config);
		metadata.annotations = Some(BTreeMap::from([
			(
				EMPLOYEE_ID_ANNOTATION.to_string(),
				self.employee.employee_id.clone(),
			),
			(
				EMPLOYEE_NAME_ANNOTATION.to_string(),
				self.employee.full_name(),
			),
			(
				CREATED_AT_ANNOTATION.to_string(),
				self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
			),
		]));

		let plain = |name: &str, value: &str| EnvVar {
			name: name.to_string(),
			value: Some(value.to_string()),
			value_from: None,
		};
		let env = vec![
			plain("EMPLOYEE_ID", &self.employee.employee_id),
			plain("EMPLOYEE_EMAIL", &self.employee.email),
			plain("DEPARTMENT", &self.department),
			plain("AD_DOMAIN", config.ad_domain.as_deref().unwrap_or_default()),
			EnvVar {
				name: "VNC_PW".to_string(),
				value: None,
				value_from: Some(EnvVarSource {
					secret_key_ref: Some(SecretKeySelector {
						name: self.names.secret.clone(),
						key: PASSWORD_KEY.to_string(),
						optional: None,
					}),
					..Default::default()
				}),
			},
		];

		let quantities = |cpu: &str, memory: &str| {
			BTreeMap::from([
				("cpu".to_string(), Quantity(cpu.to_string())),
				("memory".to_string(), Quantity(memory.to_string())),
			])
		};
		let resources = ResourceRequirements {
			requests: Some(quantities(
				&self.profile.cpu_request,
				&self.profile.memory_request,
			)),
			limits: Some(quantities(
				&self.profile.cpu_limit,
				&self.profile.memory_limit,
			)),
			..Default::default()
		};

		let tcp_probe = |initial_delay: i32, period: i32, timeout: i32, failures: i32| Probe {
			tcp_socket: Some(TCPSocketAction {
				port: IntOrString::Int(config.container_port),
				host: None,
			}),
			initial_delay_seconds: Some(initial_delay),
			period_seconds: Some(period),
			timeout_seconds: Some(timeout),
			failure_threshold: Some(failures),
			..Default::default()
		};
		let mut readiness_probe = tcp_probe(15, 5, 3, 30);
		readiness_probe.success_threshold = Some(1);

		let container = Container {
			name: CONTAINER_NAME.to_string(),
			image: Some(self.profile.image.clone()),
			image_pull_policy: Some("IfNotPresent".to_string()),
			ports: Some(vec![ContainerPort {
				name: Some(PORT_NAME.to_string()),
				container_port: config.container_port,
				protocol: Some("TCP".to_string()),
				..Default::default()
			}]),
			env: Some(env),
			resources: Some(resources),
			volume_mounts: Some(vec![
				VolumeMount {
					name: HOME_VOLUME.to_string(),
					mount_path: HOME_MOUNT_PATH.to_string(),
					..Default::default()
				},
				VolumeMount {
					name: SHM_VOLUME.to_string(),
					mount_path: SHM_MOUNT_PATH.to_string(),
					..Default::default()
				},
			]),
			liveness_probe: Some(tcp_probe(60, 30, 10, 5)),
			readiness_probe: Some(readiness_probe),
			..Default::default()
		};

		// Without persistent storage the home directory lives as long as the pod.
		let home_volume = if config.persistent_storage {
			Volume {
				name: HOME_VOLUME.to_string(),
				persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
					claim_name: self.names.pvc.clone(),
					read_only: None,
				}),
				..Default::default()
			}
		} else {
			Volume {
				name: HOME_VOLUME.to_string(),
				empty_dir: Some(EmptyDirVolumeSource::default()),
				..Default::default()
			}
		};
		let shm_volume = Volume {
			name: SHM_VOLUME.to_string(),
			empty_dir: Some(EmptyDirVolumeSource {
				medium: Some("Memory".to_string()),
				size_limit: Some(Quantity(SHM_SIZE.to_string())),
			}),
			..Default::default()
		};

		let image_pull_secrets = if config.image_pull_secrets.is_empty() {
			None
		} else {
			Some(
				config
					.image_pull_secrets
					.iter()
					.map(|name| LocalObjectReference { name: name.clone() })
					.collect(),
			)
		};

		Pod {
			metadata,
			spec: Some(PodSpec {
				containers: vec![container],
				volumes: Some(vec![home_volume, shm_volume]),
				service_account_name: config.service_account.clone(),
				security_context: Some(PodSecurityContext {
					run_as_user: Some(DESKTOP_UID),
					run_as_group: Some(DESKTOP_UID),
					fs_group: Some(DESKTOP_UID),
					..Default::default()
				}),
				restart_policy: Some("Always".to_string()),
				termination_grace_period_seconds: Some(30),
				image_pull_secrets,
				..Default::default()
			}),
			status: None,
		}
	}

	pub fn service(&self, config: &WorkspaceConfig) -> Service {
		let port = match config.routing_mode {
			RoutingMode::NodePort => config.container_port,
			RoutingMode::LoadBalancer => config.service_port,
		};

		Service {
			metadata: self.metadata(&self.names.service, config),
			spec: Some(ServiceSpec {
				type_: Some(config.routing_mode.service_type().to_string()),
				selector: Some(BTreeMap::from([(
					WORKSPACE_LABEL.to_string(),
					self.names.workspace.clone(),
				)])),
				ports: Some(vec![ServicePort {
					name: Some(PORT_NAME.to_string()),
					port,
					target_port: Some(IntOrString::Int(config.container_port)),
					protocol: Some("TCP".to_string()),
					..Default::default()
				}]),
				..Default::default()
			}),
			status: None,
		}
	}
}
