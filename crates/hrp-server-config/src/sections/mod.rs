// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod database;
mod dns;
mod http;
mod logging;
mod notifications;
mod secrets;
mod workspace;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use dns::DnsConfigLayer;
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use notifications::{NotificationsConfig, NotificationsConfigLayer, WebhookConfigLayer};
pub use secrets::{SecretsConfig, SecretsConfigLayer};
pub use workspace::WorkspaceConfigLayer;
