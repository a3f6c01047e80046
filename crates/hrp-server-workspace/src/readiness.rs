// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Waiting for a workspace pod to become reachable and resolving its endpoint.

use std::time::Duration;

use hrp_server_k8s::{K8sClient, K8sError, Pod, Service};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RoutingMode;
use crate::resources::ResourceNames;
use crate::types::Endpoint;

/// Readiness of a single pod observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodReadiness {
	Pending { reason: String },
	Ready { node_name: Option<String> },
	Failed { reason: String },
}

/// Classify a pod: ready means phase `Running` with condition `Ready=True`.
pub fn evaluate_pod(pod: &Pod) -> PodReadiness {
	if pod.metadata.deletion_timestamp.is_some() {
		return PodReadiness::Pending {
			reason: "terminating".to_string(),
		};
	}

	let Some(status) = pod.status.as_ref() else {
		return PodReadiness::Pending {
			reason: "no status reported".to_string(),
		};
	};
	let phase = status.phase.as_deref().unwrap_or("Unknown");

	match phase {
		"Failed" => PodReadiness::Failed {
			reason: status
				.message
				.clone()
				.or_else(|| status.reason.clone())
				.unwrap_or_else(|| "Unknown failure".to_string()),
		},
		"Running" => {
			let ready = status
				.conditions
				.iter()
				.flatten()
				.any(|c| c.type_ == "Ready" && c.status == "True");
			if ready {
				PodReadiness::Ready {
					node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
				}
			} else {
				PodReadiness::Pending {
					reason: "containers not ready".to_string(),
				}
			}
		}
		other => PodReadiness::Pending {
			reason: format!("phase {other}"),
		},
	}
}

/// Why a readiness wait ended without an endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
	#[error("Timed out after {}s waiting for {name}", .waited.as_secs())]
	Timeout { name: String, waited: Duration },

	#[error("Workspace pod {name} failed: {reason}")]
	Failed { name: String, reason: String },

	#[error(transparent)]
	Cluster(K8sError),
}

enum Poll {
	Ready(Endpoint),
	Pending(String),
}

/// Polls a workspace until its pod is ready and its endpoint resolvable.
pub struct ReadinessWaiter<'a> {
	client: &'a dyn K8sClient,
	namespace: &'a str,
	mode: RoutingMode,
	poll_interval: Duration,
}

impl<'a> ReadinessWaiter<'a> {
	pub fn new(
		client: &'a dyn K8sClient,
		namespace: &'a str,
		mode: RoutingMode,
		poll_interval: Duration,
	) -> Self {
		Self {
			client,
			namespace,
			mode,
			poll_interval,
		}
	}

	/// Poll until ready, failed or `timeout` has elapsed. Sleeps between ticks
	/// never extend past the deadline.
	pub async fn wait(
		&self,
		names: &ResourceNames,
		timeout: Duration,
	) -> Result<Endpoint, ReadinessError> {
		let start = Instant::now();
		let deadline = start + timeout;

		loop {
			match self.poll_once(names).await? {
				Poll::Ready(endpoint) => {
					debug!(name = %names.workspace, elapsed_ms = start.elapsed().as_millis() as u64, "Workspace ready");
					return Ok(endpoint);
				}
				Poll::Pending(reason) => {
					debug!(name = %names.workspace, reason = %reason, "Workspace not ready yet");
				}
			}

			let now = Instant::now();
			if now >= deadline {
				return Err(ReadinessError::Timeout {
					name: names.workspace.clone(),
					waited: now - start,
				});
			}
			tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
		}
	}

	async fn poll_once(&self, names: &ResourceNames) -> Result<Poll, ReadinessError> {
		let pod = match self.client.get_pod(&names.pod, self.namespace).await {
			Ok(pod) => pod,
			Err(e) => return self.transient(e),
		};

		let node_name = match evaluate_pod(&pod) {
			PodReadiness::Ready { node_name } => node_name,
			PodReadiness::Pending { reason } => return Ok(Poll::Pending(reason)),
			PodReadiness::Failed { reason } => {
				return Err(ReadinessError::Failed {
					name: names.pod.clone(),
					reason,
				})
			}
		};

		let service = match self.client.get_service(&names.service, self.namespace).await {
			Ok(service) => service,
			Err(e) => return self.transient(e),
		};

		match self.mode {
			RoutingMode::NodePort => self.resolve_node_port(&service, node_name).await,
			RoutingMode::LoadBalancer => Ok(resolve_load_balancer(&service)),
		}
	}

	async fn resolve_node_port(
		&self,
		service: &Service,
		node_name: Option<String>,
	) -> Result<Poll, ReadinessError> {
		let Some(node_port) = first_port(service).and_then(|p| p.node_port) else {
			return Ok(Poll::Pending("node port not allocated".to_string()));
		};
		let Some(node_name) = node_name else {
			return Ok(Poll::Pending("pod not scheduled".to_string()));
		};

		let node = match self.client.get_node(&node_name).await {
			Ok(node) => node,
			Err(e) => return self.transient(e),
		};
		let internal_ip = node
			.status
			.as_ref()
			.and_then(|s| s.addresses.as_ref())
			.and_then(|addresses| addresses.iter().find(|a| a.type_ == "InternalIP"))
			.map(|a| a.address.clone());

		match internal_ip {
			Some(node_ip) => Ok(Poll::Ready(Endpoint::NodePort { node_ip, node_port })),
			None => {
				warn!(node = %node_name, "Node has no InternalIP address");
				Ok(Poll::Pending(format!("node {node_name} has no internal address")))
			}
		}
	}

	/// Cluster hiccups keep the wait going; a missing client ends it.
	fn transient(&self, err: K8sError) -> Result<Poll, ReadinessError> {
		if err.is_unavailable() {
			return Err(ReadinessError::Cluster(err));
		}
		warn!(error = %err, "Readiness check failed, will retry");
		Ok(Poll::Pending(err.to_string()))
	}
}

fn first_port(service: &Service) -> Option<&hrp_server_k8s::ServicePort> {
	service.spec.as_ref()?.ports.as_ref()?.first()
}

fn resolve_load_balancer(service: &Service) -> Poll {
	let ingress = service
		.status
		.as_ref()
		.and_then(|s| s.load_balancer.as_ref())
		.and_then(|lb| lb.ingress.as_ref())
		.and_then(|ingress| ingress.first());
	let host = ingress.and_then(|i| i.hostname.clone().or_else(|| i.ip.clone()));

	match (host, first_port(service)) {
		(Some(hostname), Some(port)) => Poll::Ready(Endpoint::LoadBalancer {
			hostname,
			port: port.port,
		}),
		_ => Poll::Pending("load balancer address not assigned".to_string()),
	}
}
