// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mailprov_provisioning::{
	EmailMessage, NotificationKind, NotificationSender, SendError, TemplateStore,
};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::template::{EmailTemplate, RenderedEmail};
use crate::{SmtpClient, SmtpConfig, SmtpError};

const WELCOME_SUBJECT: &str = "Your new mailbox is ready";
const NOTIFICATION_SUBJECT: &str = "Your mailbox has changed";

impl From<SmtpError> for SendError {
	fn from(e: SmtpError) -> Self {
		match e {
			SmtpError::Address(msg) => SendError::Address(msg),
			SmtpError::Message(msg) => SendError::Message(msg),
			other => SendError::Transport(other.to_string()),
		}
	}
}

/// Sends provisioning emails over SMTP.
///
/// A message's `smtp_server` overrides the default host; port, TLS mode and
/// credentials always come from the default configuration. One client is
/// kept per host for the lifetime of the sender.
pub struct SmtpNotificationSender {
	default: Option<SmtpConfig>,
	templates: Arc<dyn TemplateStore>,
	clients: Mutex<HashMap<String, Arc<SmtpClient>>>,
}

impl SmtpNotificationSender {
	/// `default` may be `None` when every request names its own server.
	pub fn new(default: Option<SmtpConfig>, templates: Arc<dyn TemplateStore>) -> Self {
		Self {
			default,
			templates,
			clients: Mutex::new(HashMap::new()),
		}
	}

	fn config_for(&self, server: Option<&str>) -> Result<SmtpConfig, SendError> {
		match (server, &self.default) {
			(Some(host), Some(default)) => Ok(default.with_host(host)),
			(Some(host), None) => Ok(SmtpConfig::new(host)),
			(None, Some(default)) => Ok(default.clone()),
			(None, None) => Err(SendError::Transport(
				"no SMTP server is configured".to_string(),
			)),
		}
	}

	async fn client_for(&self, server: Option<&str>) -> Result<Arc<SmtpClient>, SendError> {
		let config = self.config_for(server)?;
		let mut clients = self.clients.lock().await;
		if let Some(client) = clients.get(&config.host) {
			return Ok(client.clone());
		}
		let host = config.host.clone();
		let client = Arc::new(SmtpClient::new(config)?);
		clients.insert(host, client.clone());
		Ok(client)
	}

	/// Verify the default SMTP server accepts connections.
	pub async fn check_default_server(&self) -> Result<(), SendError> {
		let client = self.client_for(None).await?;
		client.check_health().await?;
		Ok(())
	}

	/// Load and render the message's template without sending it.
	pub fn render(&self, message: &EmailMessage) -> Result<RenderedEmail, SendError> {
		let source = self
			.templates
			.load(&message.template)
			.map_err(|e| SendError::Template {
				template: message.template.to_string(),
				message: e.to_string(),
			})?;
		if source.trim().is_empty() {
			return Err(SendError::Template {
				template: message.template.to_string(),
				message: "template is empty".to_string(),
			});
		}

		let default_subject = match message.kind {
			NotificationKind::Welcome => WELCOME_SUBJECT,
			NotificationKind::Notification => NOTIFICATION_SUBJECT,
		};
		Ok(EmailTemplate::parse(&source).render(&message.context, default_subject))
	}
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
	#[instrument(
		name = "smtp_notification_send",
		skip(self, message),
		fields(kind = %message.kind, to = %message.to, template = %message.template)
	)]
	async fn send(&self, message: &EmailMessage) -> Result<(), SendError> {
		let rendered = self.render(message)?;
		let client = self.client_for(message.smtp_server.as_deref()).await?;
		debug!(host = client.host(), subject = %rendered.subject, "delivering notification");

		client
			.send_email(
				message.from.as_str(),
				message.to.as_str(),
				&rendered.subject,
				&rendered.html,
				&rendered.text,
			)
			.await?;
		Ok(())
	}
}
