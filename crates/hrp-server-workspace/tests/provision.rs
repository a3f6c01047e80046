// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hrp_server_k8s::ResourceKind;
use hrp_server_workspace::resources::ResourceNames;
use hrp_server_workspace::{
	Endpoint, NamingStrategy, NotificationKind, RoutingMode, WorkspaceConfig, WorkspaceError,
	WorkspaceStatus,
};
use support::{
	ada, employee, test_config, Harness, PodBehavior, StaticAccessRecords, LB_HOSTNAME, NODE_IP,
	NODE_PORT,
};

fn named_config() -> WorkspaceConfig {
	WorkspaceConfig {
		naming: NamingStrategy::EmployeeName,
		..test_config()
	}
}

#[tokio::test]
async fn provisions_ada_lovelace_end_to_end() {
	let mut harness = Harness::new(test_config());
	let workspace = harness.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(workspace.status, WorkspaceStatus::Active);
	assert_eq!(workspace.employee_id, "E-1001");
	assert_eq!(workspace.department, "engineering");
	assert!(workspace.name.starts_with("ws-"));
	assert_eq!(
		workspace.url.as_deref(),
		Some(format!("https://{NODE_IP}:{NODE_PORT}").as_str())
	);
	assert_eq!(
		workspace.endpoint,
		Some(Endpoint::NodePort {
			node_ip: NODE_IP.to_string(),
			node_port: NODE_PORT,
		})
	);

	let credentials = workspace.credentials.clone().unwrap();
	let password = credentials.password.unwrap();
	assert_eq!(credentials.username, "ada");
	assert_eq!(password.char_len(), 16);
	assert_eq!(
		harness.secrets.get("E-1001").as_deref(),
		Some(password.expose().as_str())
	);

	let names = ResourceNames::for_workspace(&workspace.name);
	for (kind, name) in [
		(ResourceKind::Secret, &names.secret),
		(ResourceKind::PersistentVolumeClaim, &names.pvc),
		(ResourceKind::Pod, &names.pod),
		(ResourceKind::Service, &names.service),
	] {
		assert!(harness.cluster.has(kind, name), "missing {kind} {name}");
	}
	assert!(harness.cluster.has(ResourceKind::Namespace, "workspaces"));

	let records = harness.store.records();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].status, WorkspaceStatus::Active);

	assert_eq!(
		harness.next_notification().await,
		Some(NotificationKind::Provisioned)
	);
}

#[tokio::test]
async fn creates_objects_in_dependency_order() {
	let harness = Harness::new(named_config());
	harness.provisioner().provision(&ada()).await.unwrap();

	let creates: Vec<String> = harness
		.cluster
		.calls()
		.into_iter()
		.filter(|c| c.starts_with("create "))
		.collect();
	assert_eq!(
		creates,
		vec![
			"create Namespace workspaces",
			"create Secret ws-ada-lovelace-secret",
			"create PersistentVolumeClaim ws-ada-lovelace-pvc",
			"create Pod ws-ada-lovelace",
			"create Service ws-ada-lovelace-svc",
		]
	);
}

#[tokio::test]
async fn skips_volume_claim_without_persistent_storage() {
	let harness = Harness::new(WorkspaceConfig {
		persistent_storage: false,
		..named_config()
	});
	harness.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(harness.cluster.count_calls("create PersistentVolumeClaim"), 0);
	assert_eq!(harness.cluster.resource_count(), 3);
}

#[tokio::test]
async fn second_provision_is_rejected() {
	let harness = Harness::new(test_config());
	let provisioner = harness.provisioner();
	let first = provisioner.provision(&ada()).await.unwrap();

	let err = provisioner.provision(&ada()).await.unwrap_err();
	match err {
		WorkspaceError::AlreadyProvisioned {
			employee_id,
			workspace_id,
		} => {
			assert_eq!(employee_id, "E-1001");
			assert_eq!(workspace_id, first.id);
		}
		other => panic!("expected AlreadyProvisioned, got {other:?}"),
	}
	assert_eq!(harness.cluster.resource_count(), 4);
	assert_eq!(harness.store.records().len(), 1);
}

#[tokio::test]
async fn errored_record_does_not_block_a_new_attempt() {
	let harness = Harness::new(test_config());
	harness.cluster.fail_create(ResourceKind::Service);
	harness.provisioner().provision(&ada()).await.unwrap_err();
	assert_eq!(harness.store.records()[0].status, WorkspaceStatus::Error);

	let fresh = Harness::new(test_config());
	fresh.store.insert(harness.store.records().remove(0));
	let workspace = fresh.provisioner().provision(&ada()).await.unwrap();

	let records = fresh.store.records();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].id, workspace.id);
}

#[tokio::test]
async fn failure_at_each_step_rolls_back_earlier_steps() {
	let steps = [
		ResourceKind::Secret,
		ResourceKind::PersistentVolumeClaim,
		ResourceKind::Pod,
		ResourceKind::Service,
	];

	for (index, failing) in steps.iter().enumerate() {
		let harness = Harness::new(named_config());
		harness.cluster.fail_create(*failing);

		let err = harness.provisioner().provision(&ada()).await.unwrap_err();
		assert!(
			matches!(err, WorkspaceError::DependencyFailure { .. }),
			"step {failing}: unexpected {err:?}"
		);
		assert_eq!(harness.cluster.resource_count(), 0, "step {failing} left objects");

		let deletes: Vec<String> = harness
			.cluster
			.calls()
			.into_iter()
			.filter(|c| c.starts_with("delete "))
			.collect();
		let expected: Vec<String> = steps[..index]
			.iter()
			.rev()
			.map(|kind| {
				let names = ResourceNames::for_workspace("ws-ada-lovelace");
				let name = match kind {
					ResourceKind::Secret => names.secret,
					ResourceKind::PersistentVolumeClaim => names.pvc,
					ResourceKind::Pod => names.pod,
					_ => names.service,
				};
				format!("delete {kind} {name}")
			})
			.collect();
		assert_eq!(deletes, expected, "rollback order for step {failing}");

		let record = &harness.store.records()[0];
		assert_eq!(record.status, WorkspaceStatus::Error);
		assert!(record.error.as_deref().unwrap().contains("injected"));
	}
}

#[tokio::test]
async fn conflict_is_replaced_and_retried_once() {
	let harness = Harness::new(named_config());
	harness.cluster.conflict_on_create(ResourceKind::Pod, 1);

	let workspace = harness.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(workspace.status, WorkspaceStatus::Active);
	assert_eq!(harness.cluster.count_calls("create Pod"), 2);
	assert_eq!(harness.cluster.count_calls("delete Pod"), 1);
}

#[tokio::test]
async fn repeated_conflict_fails_and_rolls_back() {
	let harness = Harness::new(named_config());
	harness.cluster.conflict_on_create(ResourceKind::Service, 2);

	let err = harness.provisioner().provision(&ada()).await.unwrap_err();

	assert!(matches!(
		err,
		WorkspaceError::ResourceConflict {
			kind: ResourceKind::Service,
			..
		}
	));
	assert_eq!(harness.cluster.count_calls("create Service"), 2);
	assert_eq!(harness.cluster.resource_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn never_ready_pod_times_out_and_rolls_back() {
	let harness = Harness::new(test_config());
	harness.cluster.set_pod_behavior(PodBehavior::NeverReady);

	let started = tokio::time::Instant::now();
	let err = harness.provisioner().provision(&ada()).await.unwrap_err();

	assert!(err.is_timeout(), "unexpected {err:?}");
	assert!(matches!(
		err,
		WorkspaceError::ReadinessTimeout {
			timeout_secs: 30,
			..
		}
	));
	assert!(started.elapsed() >= Duration::from_secs(30));
	assert!(started.elapsed() < Duration::from_secs(32));
	assert_eq!(harness.cluster.resource_count(), 0);
	assert_eq!(harness.store.records()[0].status, WorkspaceStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn caller_deadline_bounds_the_wait() {
	let harness = Harness::new(test_config());
	harness.cluster.set_pod_behavior(PodBehavior::NeverReady);

	let started = tokio::time::Instant::now();
	let err = harness
		.provisioner()
		.provision_with_deadline(&ada(), Some(Duration::from_secs(3)))
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		WorkspaceError::ReadinessTimeout {
			timeout_secs: 3,
			..
		}
	));
	assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn failed_pod_is_a_dependency_failure() {
	let harness = Harness::new(test_config());
	harness
		.cluster
		.set_pod_behavior(PodBehavior::Fails("ErrImagePull".to_string()));

	let err = harness.provisioner().provision(&ada()).await.unwrap_err();

	match err {
		WorkspaceError::DependencyFailure { reason, .. } => assert_eq!(reason, "ErrImagePull"),
		other => panic!("expected DependencyFailure, got {other:?}"),
	}
	assert_eq!(harness.cluster.resource_count(), 0);
}

#[tokio::test]
async fn unavailable_cluster_is_reported_distinctly() {
	let harness = Harness::new(test_config());
	harness.cluster.set_unavailable(true);

	let err = harness.provisioner().provision(&ada()).await.unwrap_err();

	assert!(matches!(err, WorkspaceError::ClusterUnavailable { .. }));
	assert_eq!(harness.store.records()[0].status, WorkspaceStatus::Error);
}

#[tokio::test]
async fn load_balancer_mode_uses_ingress_hostname() {
	let harness = Harness::new(WorkspaceConfig {
		routing_mode: RoutingMode::LoadBalancer,
		service_port: 443,
		..test_config()
	});

	let workspace = harness.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(
		workspace.endpoint,
		Some(Endpoint::LoadBalancer {
			hostname: LB_HOSTNAME.to_string(),
			port: 443,
		})
	);
	assert_eq!(
		workspace.url.as_deref(),
		Some(format!("https://{LB_HOSTNAME}:443").as_str())
	);
	assert_eq!(harness.cluster.count_calls("get Node"), 0);
}

#[tokio::test]
async fn access_record_replaces_raw_address() {
	let harness = Harness::new(test_config()).with_access_records(Arc::new(StaticAccessRecords {
		fail: false,
		removed: Mutex::new(Vec::new()),
	}));

	let workspace = harness.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(workspace.dns_name.as_deref(), Some("ada.lovelace.corp.example"));
	assert_eq!(
		workspace.url.as_deref(),
		Some(format!("https://ada.lovelace.corp.example:{NODE_PORT}").as_str())
	);
}

#[tokio::test]
async fn failed_access_record_falls_back_to_raw_address() {
	let harness = Harness::new(test_config()).with_access_records(Arc::new(StaticAccessRecords {
		fail: true,
		removed: Mutex::new(Vec::new()),
	}));

	let workspace = harness.provisioner().provision(&ada()).await.unwrap();

	assert!(workspace.dns_name.is_none());
	assert_eq!(
		workspace.url.as_deref(),
		Some(format!("https://{NODE_IP}:{NODE_PORT}").as_str())
	);
}

#[tokio::test]
async fn secret_store_and_notifier_failures_do_not_fail_provisioning() {
	let mut harness = Harness::with_failing_notifier(test_config());
	harness.secrets.fail(true);

	let workspace = harness.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(workspace.status, WorkspaceStatus::Active);
	assert!(harness.secrets.get("E-1001").is_none());
	assert_eq!(
		harness.next_notification().await,
		Some(NotificationKind::Provisioned)
	);
}

#[tokio::test]
async fn department_profile_sets_pod_resources() {
	let harness = Harness::new(named_config());
	let grace = employee("E-7", "Grace", "Hopper", "infra");

	harness.provisioner().provision(&grace).await.unwrap();

	let pod = harness.cluster.pod("ws-grace-hopper").unwrap();
	let container = &pod.spec.unwrap().containers[0];
	let limits = container
		.resources
		.as_ref()
		.and_then(|r| r.limits.as_ref())
		.unwrap();
	assert!(limits.contains_key("cpu"));
	assert!(limits.contains_key("memory"));
}

#[tokio::test]
async fn restart_recreates_pod_and_keeps_record() {
	let harness = Harness::new(named_config());
	harness.employees.add(ada());
	let provisioner = harness.provisioner();
	let original = provisioner.provision(&ada()).await.unwrap();

	let restarted = provisioner.restart("E-1001").await.unwrap();

	assert_eq!(restarted.id, original.id);
	assert_eq!(restarted.url, original.url);
	assert_eq!(harness.cluster.count_calls("delete Pod ws-ada-lovelace"), 1);
	assert_eq!(harness.cluster.count_calls("create Pod ws-ada-lovelace"), 2);
	assert!(harness.cluster.has(ResourceKind::Secret, "ws-ada-lovelace-secret"));
}

#[tokio::test]
async fn restart_without_workspace_is_not_found() {
	let harness = Harness::new(test_config());
	harness.employees.add(ada());

	let err = harness.provisioner().restart("E-1001").await.unwrap_err();
	assert!(matches!(err, WorkspaceError::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn restart_waits_for_the_old_pod_to_terminate() {
	let harness = Harness::new(named_config());
	harness.employees.add(ada());
	harness.cluster.linger_deleted_pods();
	let provisioner = harness.provisioner();
	let original = provisioner.provision(&ada()).await.unwrap();

	let started = tokio::time::Instant::now();
	let restarted = provisioner.restart("E-1001").await.unwrap();

	assert!(started.elapsed() >= Duration::from_secs(5));
	assert_eq!(restarted.id, original.id);
	assert_eq!(restarted.status, WorkspaceStatus::Active);
	assert_eq!(harness.cluster.count_calls("create Pod ws-ada-lovelace"), 2);
	assert!(harness.cluster.count_calls("get Pod ws-ada-lovelace") > 1);
	let pod = harness.cluster.pod("ws-ada-lovelace").unwrap();
	assert!(pod.metadata.deletion_timestamp.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_restart_marks_the_record_errored() {
	let harness = Harness::new(named_config());
	harness.employees.add(ada());
	let provisioner = harness.provisioner();
	let original = provisioner.provision(&ada()).await.unwrap();
	harness
		.cluster
		.set_pod_behavior(PodBehavior::Fails("ErrImagePull".to_string()));

	let err = provisioner.restart("E-1001").await.unwrap_err();

	assert!(matches!(err, WorkspaceError::DependencyFailure { .. }));
	let record = &harness.store.records()[0];
	assert_eq!(record.id, original.id);
	assert_eq!(record.status, WorkspaceStatus::Error);
	assert!(record.error.as_deref().unwrap().contains("ErrImagePull"));
}

#[tokio::test]
async fn stale_record_resources_are_removed_before_reprovisioning() {
	let harness = Harness::new(named_config());
	harness.cluster.fail_delete(ResourceKind::Secret);
	harness.cluster.fail_create(ResourceKind::Service);
	harness.provisioner().provision(&ada()).await.unwrap_err();
	assert!(harness.cluster.has(ResourceKind::Secret, "ws-ada-lovelace-secret"));
	assert_eq!(harness.store.records()[0].status, WorkspaceStatus::Error);

	let fresh = Harness::new(named_config());
	fresh.store.insert(harness.store.records().remove(0));
	fresh.cluster.insert_live_pod("ws-ada-lovelace", "E-1001", NODE_IP);

	let workspace = fresh.provisioner().provision(&ada()).await.unwrap();

	assert_eq!(workspace.status, WorkspaceStatus::Active);
	let calls = fresh.cluster.calls();
	let stale_delete = calls
		.iter()
		.position(|c| c == "delete Pod ws-ada-lovelace")
		.unwrap();
	let first_create = calls.iter().position(|c| c.starts_with("create ")).unwrap();
	assert!(stale_delete < first_create, "calls: {calls:?}");
	assert_eq!(fresh.cluster.count_calls("create Pod ws-ada-lovelace"), 1);
	assert_eq!(fresh.store.records().len(), 1);
}
