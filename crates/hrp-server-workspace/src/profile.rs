// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-department container image and resource sizing.

/// Desktop image used when a profile does not override it.
pub const DEFAULT_IMAGE: &str = "kasmweb/desktop:1.14.0";

/// Container image and resource quantities for one department.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentProfile {
	pub image: String,
	pub cpu_request: String,
	pub memory_request: String,
	pub cpu_limit: String,
	pub memory_limit: String,
	/// Size of the persistent home volume
	pub storage: String,
}

impl DepartmentProfile {
	fn sized(cpu: (&str, &str), memory: (&str, &str), storage: &str) -> Self {
		Self {
			image: DEFAULT_IMAGE.to_string(),
			cpu_request: cpu.0.to_string(),
			cpu_limit: cpu.1.to_string(),
			memory_request: memory.0.to_string(),
			memory_limit: memory.1.to_string(),
			storage: storage.to_string(),
		}
	}

	/// Profile for a lowercased department key. Unknown keys get the default
	/// profile.
	pub fn for_department(department: &str) -> Self {
		match department {
			"infra" | "infrastructure" => Self::sized(("1", "2"), ("2Gi", "4Gi"), "20Gi"),
			"dev" | "development" | "developer" => {
				Self::sized(("1500m", "3"), ("3Gi", "6Gi"), "50Gi")
			}
			"hr" | "human_resources" => Self::sized(("500m", "1500m"), ("1Gi", "3Gi"), "10Gi"),
			_ => Self::sized(("500m", "1"), ("1Gi", "2Gi"), "10Gi"),
		}
	}

	pub fn with_image(mut self, image: Option<&str>) -> Self {
		if let Some(image) = image {
			self.image = image.to_string();
		}
		self
	}
}
