// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub use k8s_openapi::api::core::v1::{
	Capabilities, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource,
	LoadBalancerIngress, Namespace, Node, NodeAddress, PersistentVolumeClaim,
	PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod, PodCondition,
	PodSecurityContext, PodSpec, PodStatus, Probe, ResourceRequirements, Secret, SecretKeySelector,
	SecurityContext, Service, ServicePort, ServiceSpec, TCPSocketAction, Volume, VolumeMount,
	VolumeResourceRequirements,
};
