// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster resource client for employee workspace provisioning.
//!
//! This crate provides:
//! - The [`K8sClient`] trait covering the namespace, secret, volume claim, pod,
//!   service and node calls the orchestrator needs
//! - [`KubeClient`], the kube-rs implementation, built from in-cluster or
//!   kubeconfig credentials
//! - [`LazyKubeClient`], which connects on first use and retries after a failed
//!   connection attempt

mod client;
mod error;
mod kube_client;
mod lazy;
mod types;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult, ResourceKind};
pub use kube_client::KubeClient;
pub use lazy::{Connect, KubeConnector, LazyClient, LazyKubeClient};
pub use types::{
	Capabilities, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource,
	LoadBalancerIngress, Namespace, Node, NodeAddress, PersistentVolumeClaim,
	PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod, PodCondition,
	PodSecurityContext, PodSpec, PodStatus, Probe, ResourceRequirements, Secret, SecretKeySelector,
	SecurityContext, Service, ServicePort, ServiceSpec, TCPSocketAction, Volume,
	VolumeMount, VolumeResourceRequirements,
};
