// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes and DNS safe names derived from free-form employee data.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::{Employee, WorkspaceId};

/// Maximum length of a DNS-1123 label.
pub const MAX_NAME_LENGTH: usize = 63;

/// Longest suffix appended to a workspace name (`-secret`).
const LONGEST_SUFFIX: usize = 7;

/// Maximum length of a workspace base name, leaving room for derived suffixes.
pub const MAX_WORKSPACE_NAME_LENGTH: usize = MAX_NAME_LENGTH - LONGEST_SUFFIX;

const FALLBACK_NAME: &str = "workspace";
const FALLBACK_USERNAME: &str = "user";
const WORKSPACE_PREFIX: &str = "ws";

/// How the workspace base name is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
	/// `ws-<workspace id>`: unique, never collides
	#[default]
	WorkspaceId,
	/// `ws-<first>-<last>`: readable, may collide with a stale workspace
	EmployeeName,
}

impl std::str::FromStr for NamingStrategy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"workspace_id" | "workspace-id" | "id" => Ok(NamingStrategy::WorkspaceId),
			"employee_name" | "employee-name" | "name" => Ok(NamingStrategy::EmployeeName),
			other => Err(format!("unknown naming strategy: {other}")),
		}
	}
}

/// Lowercase, decompose and drop combining marks, so `é` becomes `e`.
fn fold_to_ascii_lowercase(input: &str) -> impl Iterator<Item = char> + '_ {
	input
		.chars()
		.flat_map(char::to_lowercase)
		.nfd()
		.filter(|c| !is_combining_mark(*c))
}

fn truncate_name(name: &str, max: usize) -> &str {
	// Only ASCII remains by the time names are truncated.
	let end = name.len().min(max);
	name[..end].trim_end_matches('-')
}

/// Turn arbitrary text into a DNS-1123 label.
///
/// The result matches `^[a-z0-9]([-a-z0-9]*[a-z0-9])?$`, is at most 63
/// characters, and `sanitize_name(sanitize_name(x)) == sanitize_name(x)`.
/// Input with nothing usable maps to `workspace`.
pub fn sanitize_name(input: &str) -> String {
	sanitize_name_with_limit(input, MAX_NAME_LENGTH)
}

fn sanitize_name_with_limit(input: &str, max: usize) -> String {
	let mut out = String::with_capacity(input.len());
	for c in fold_to_ascii_lowercase(input) {
		let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
			c
		} else {
			'-'
		};
		if c == '-' && (out.is_empty() || out.ends_with('-')) {
			continue;
		}
		out.push(c);
	}

	let name = truncate_name(out.trim_end_matches('-'), max);
	if name.is_empty() {
		FALLBACK_NAME.to_string()
	} else {
		name.to_string()
	}
}

/// Reduce text to a bare `[a-z0-9]` DNS label, as used for `first.last.<domain>`.
///
/// Returns an empty string if nothing alphanumeric survives.
pub fn sanitize_dns_label(input: &str) -> String {
	fold_to_ascii_lowercase(input)
		.filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
		.take(MAX_NAME_LENGTH)
		.collect()
}

/// Make a string a valid Kubernetes label value (at most 63 characters of
/// `[A-Za-z0-9._-]`, alphanumeric at both ends).
pub fn sanitize_label_value(value: &str) -> String {
	let sanitized: String = value
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
				c
			} else {
				'_'
			}
		})
		.collect();

	let trimmed = sanitized
		.trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
		.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());

	let end = trimmed.len().min(MAX_NAME_LENGTH);
	trimmed[..end]
		.trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
		.to_string()
}

/// The base name for a new workspace. Bounded so every derived resource name
/// stays a valid label.
pub fn workspace_name(strategy: NamingStrategy, id: &WorkspaceId, employee: &Employee) -> String {
	let raw = match strategy {
		NamingStrategy::WorkspaceId => format!("{WORKSPACE_PREFIX}-{id}"),
		NamingStrategy::EmployeeName => format!(
			"{WORKSPACE_PREFIX}-{}-{}",
			employee.first_name, employee.last_name
		),
	};
	sanitize_name_with_limit(&raw, MAX_WORKSPACE_NAME_LENGTH)
}

/// Desktop login name: the employee's first name, folded to `[a-z0-9]`.
pub fn username_for(employee: &Employee) -> String {
	let username = sanitize_dns_label(&employee.first_name);
	if username.is_empty() {
		FALLBACK_USERNAME.to_string()
	} else {
		username
	}
}

/// `first.last.<domain>`, or `None` when either name has no usable characters.
pub fn access_dns_name(employee: &Employee, domain: &str) -> Option<String> {
	let first = sanitize_dns_label(&employee.first_name);
	let last = sanitize_dns_label(&employee.last_name);
	let domain = domain.trim().trim_matches('.').to_lowercase();
	if first.is_empty() || last.is_empty() || domain.is_empty() {
		return None;
	}
	Some(format!("{first}.{last}.{domain}"))
}
