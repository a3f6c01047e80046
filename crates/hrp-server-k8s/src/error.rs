// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// The cluster object kinds a workspace is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Namespace,
	Secret,
	PersistentVolumeClaim,
	Pod,
	Service,
	Node,
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ResourceKind::Namespace => "Namespace",
			ResourceKind::Secret => "Secret",
			ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
			ResourceKind::Pod => "Pod",
			ResourceKind::Service => "Service",
			ResourceKind::Node => "Node",
		};
		f.write_str(name)
	}
}

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	/// The API answered 409 for a create.
	#[error("{kind} already exists: {name}")]
	AlreadyExists { kind: ResourceKind, name: String },

	/// The API answered 404.
	#[error("{kind} not found: {name}")]
	NotFound { kind: ResourceKind, name: String },

	/// No client could be built from in-cluster or kubeconfig credentials.
	#[error("K8s cluster unavailable: {message}")]
	Unavailable { message: String },

	#[error("K8s API error: {message}")]
	ApiError { message: String },
}

impl K8sError {
	/// Classify a kube error for an operation on `kind`/`name`.
	pub fn from_kube(kind: ResourceKind, name: &str, err: kube::Error) -> Self {
		match err {
			kube::Error::Api(ref response) if response.code == 404 => K8sError::NotFound {
				kind,
				name: name.to_string(),
			},
			kube::Error::Api(ref response) if response.code == 409 => K8sError::AlreadyExists {
				kind,
				name: name.to_string(),
			},
			other => K8sError::ApiError {
				message: other.to_string(),
			},
		}
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, K8sError::NotFound { .. })
	}

	pub fn is_conflict(&self) -> bool {
		matches!(self, K8sError::AlreadyExists { .. })
	}

	pub fn is_unavailable(&self) -> bool {
		matches!(self, K8sError::Unavailable { .. })
	}
}
