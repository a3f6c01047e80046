// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Welcome and termination notifications, delivered off the request path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use hrp_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::types::{Employee, Workspace};

const QUEUE_CAPACITY: usize = 256;

/// Something an employee should be told about.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
	/// Welcome message with the access URL and initial password
	Provisioned {
		employee: Employee,
		workspace: Workspace,
		password: SecretString,
	},
	Terminated {
		employee: Employee,
		date: DateTime<Utc>,
	},
}

impl NotificationEvent {
	pub fn kind(&self) -> NotificationKind {
		match self {
			NotificationEvent::Provisioned { .. } => NotificationKind::Provisioned,
			NotificationEvent::Terminated { .. } => NotificationKind::Terminated,
		}
	}

	pub fn employee(&self) -> &Employee {
		match self {
			NotificationEvent::Provisioned { employee, .. } => employee,
			NotificationEvent::Terminated { employee, .. } => employee,
		}
	}
}

/// Event selector for webhook subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	Provisioned,
	Terminated,
}

impl NotificationKind {
	pub fn event_name(&self) -> &'static str {
		match self {
			NotificationKind::Provisioned => "workspace.provisioned",
			NotificationKind::Terminated => "workspace.terminated",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
	#[error("Failed to build notification payload: {0}")]
	Payload(String),

	#[error("Notification delivery to {url} failed: {message}")]
	Delivery { url: String, message: String },
}

/// Delivers one notification. Implementations may block on network I/O.
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Queues notifications for a background worker.
///
/// Enqueueing never waits and never fails the caller; a full or closed queue
/// drops the notification with a warning.
#[derive(Clone)]
pub struct NotificationDispatcher {
	sender: Option<mpsc::Sender<NotificationEvent>>,
}

impl NotificationDispatcher {
	/// Start a worker on the current tokio runtime delivering through `notifier`.
	pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
		let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
		tokio::spawn(run_worker(notifier, receiver));
		Self {
			sender: Some(sender),
		}
	}

	/// A dispatcher that only logs.
	pub fn disabled() -> Self {
		Self { sender: None }
	}

	pub fn notify_provisioned(
		&self,
		employee: &Employee,
		workspace: &Workspace,
		password: &SecretString,
	) {
		self.enqueue(NotificationEvent::Provisioned {
			employee: employee.clone(),
			workspace: workspace.clone(),
			password: password.clone(),
		});
	}

	pub fn notify_terminated(&self, employee: &Employee, date: DateTime<Utc>) {
		self.enqueue(NotificationEvent::Terminated {
			employee: employee.clone(),
			date,
		});
	}

	fn enqueue(&self, event: NotificationEvent) {
		let kind = event.kind();
		let employee_id = event.employee().employee_id.clone();
		let Some(sender) = &self.sender else {
			debug!(?kind, employee_id = %employee_id, "Notifications disabled, skipping");
			return;
		};
		if let Err(e) = sender.try_send(event) {
			warn!(?kind, employee_id = %employee_id, error = %e, "Dropping notification");
		}
	}
}

async fn run_worker(notifier: Arc<dyn Notifier>, mut receiver: mpsc::Receiver<NotificationEvent>) {
	while let Some(event) = receiver.recv().await {
		let kind = event.kind();
		let employee_id = &event.employee().employee_id;
		match notifier.deliver(&event).await {
			Ok(()) => debug!(?kind, employee_id = %employee_id, "Notification delivered"),
			Err(e) => error!(?kind, employee_id = %employee_id, error = %e, "Notification failed"),
		}
	}
	debug!("Notification worker stopped");
}

/// A subscriber endpoint for notification webhooks.
#[derive(Debug, Clone)]
pub struct WebhookEndpoint {
	pub url: String,
	pub events: Vec<NotificationKind>,
	/// HMAC key for the `X-Webhook-Signature` header
	pub secret: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct EmployeePayload<'a> {
	id: &'a str,
	first_name: &'a str,
	last_name: &'a str,
	email: &'a str,
}

#[derive(Debug, Serialize)]
struct WorkspacePayload<'a> {
	id: String,
	name: &'a str,
	department: &'a str,
	url: Option<&'a str>,
	username: Option<&'a str>,
	password: &'a str,
}

/// JSON body posted to webhook subscribers, typically a mailer that renders
/// the welcome or farewell email.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
	event: &'static str,
	timestamp: DateTime<Utc>,
	employee: EmployeePayload<'a>,
	#[serde(skip_serializing_if = "Option::is_none")]
	workspace: Option<WorkspacePayload<'a>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	terminated_at: Option<DateTime<Utc>>,
}

impl<'a> WebhookPayload<'a> {
	fn from_event(event: &'a NotificationEvent) -> Self {
		let employee = event.employee();
		let employee_payload = EmployeePayload {
			id: &employee.employee_id,
			first_name: &employee.first_name,
			last_name: &employee.last_name,
			email: &employee.email,
		};
		match event {
			NotificationEvent::Provisioned {
				workspace,
				password,
				..
			} => Self {
				event: event.kind().event_name(),
				timestamp: Utc::now(),
				employee: employee_payload,
				workspace: Some(WorkspacePayload {
					id: workspace.id.to_string(),
					name: &workspace.name,
					department: &workspace.department,
					url: workspace.url.as_deref(),
					username: workspace.credentials.as_ref().map(|c| c.username.as_str()),
					password: password.expose(),
				}),
				terminated_at: None,
			},
			NotificationEvent::Terminated { date, .. } => Self {
				event: event.kind().event_name(),
				timestamp: Utc::now(),
				employee: employee_payload,
				workspace: None,
				terminated_at: Some(*date),
			},
		}
	}
}

fn compute_signature(secret: &SecretString, body: &str) -> String {
	// HMAC accepts keys of any length.
	let mut mac = match Hmac::<Sha256>::new_from_slice(secret.expose().as_bytes()) {
		Ok(mac) => mac,
		Err(_) => return String::new(),
	};
	mac.update(body.as_bytes());
	hex::encode(mac.finalize().into_bytes())
}

/// Posts signed JSON payloads to every endpoint subscribed to an event.
pub struct WebhookNotifier {
	endpoints: Vec<WebhookEndpoint>,
	http_client: reqwest::Client,
}

impl WebhookNotifier {
	pub fn new(endpoints: Vec<WebhookEndpoint>) -> Result<Self, NotifyError> {
		let http_client = reqwest::Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.map_err(|e| NotifyError::Payload(format!("HTTP client: {e}")))?;
		Ok(Self {
			endpoints,
			http_client,
		})
	}
}

#[async_trait]
impl Notifier for WebhookNotifier {
	async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
		let kind = event.kind();
		let matching: Vec<&WebhookEndpoint> = self
			.endpoints
			.iter()
			.filter(|endpoint| endpoint.events.contains(&kind))
			.collect();
		if matching.is_empty() {
			debug!(?kind, "No webhooks configured for event");
			return Ok(());
		}

		let body = serde_json::to_string(&WebhookPayload::from_event(event))
			.map_err(|e| NotifyError::Payload(e.to_string()))?;

		let mut first_error = None;
		for endpoint in matching {
			let mut request = self
				.http_client
				.post(&endpoint.url)
				.header("Content-Type", "application/json")
				.body(body.clone());
			if let Some(secret) = &endpoint.secret {
				request = request.header("X-Webhook-Signature", compute_signature(secret, &body));
			}

			let outcome = match request.send().await {
				Ok(response) if response.status().is_success() => {
					debug!(url = %endpoint.url, "Webhook delivered successfully");
					continue;
				}
				Ok(response) => format!("status {}", response.status()),
				Err(e) => e.to_string(),
			};
			warn!(url = %endpoint.url, error = %outcome, "Webhook delivery failed");
			first_error.get_or_insert(NotifyError::Delivery {
				url: endpoint.url.clone(),
				message: outcome,
			});
		}

		match first_error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}
