// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP delivery for mailbox provisioning notifications.
//!
//! [`SmtpClient`] wraps a [`lettre`] async transport and sends multipart
//! (plain text + HTML) messages. [`SmtpNotificationSender`] plugs it into the
//! provisioning workflow: it loads and renders the message's template, then
//! delivers it through a client for the requested SMTP server.
//!
//! Passwords are held in [`SecretString`] and never logged.

mod sender;
mod template;

pub use sender::SmtpNotificationSender;
pub use template::{escape_html, EmailTemplate, RenderedEmail};

use lettre::{
	message::{header::ContentType, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use mailprov_common_secret::SecretString;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	#[error("connection failed: {0}")]
	Connection(String),

	#[error("failed to build message: {0}")]
	Message(String),

	#[error("send failed: {0}")]
	Send(String),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("invalid email address: {0}")]
	Address(String),
}

/// Connection settings for one SMTP server.
///
/// The sender address is not part of the connection; it is supplied with each
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
	pub host: String,

	/// Common values: 25 (unencrypted), 465 (TLS), 587 (STARTTLS).
	#[serde(default = "default_port")]
	pub port: u16,

	#[serde(default)]
	pub username: Option<String>,

	#[serde(default)]
	pub password: Option<SecretString>,

	/// Use STARTTLS. Defaults to `true`.
	#[serde(default = "default_use_tls")]
	pub use_tls: bool,
}

fn default_port() -> u16 {
	DEFAULT_SMTP_PORT
}

fn default_use_tls() -> bool {
	true
}

impl SmtpConfig {
	/// Settings for `host` with the default port and STARTTLS, no credentials.
	pub fn new(host: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			port: DEFAULT_SMTP_PORT,
			username: None,
			password: None,
			use_tls: true,
		}
	}

	/// The same port, TLS mode and credentials against a different host.
	pub fn with_host(&self, host: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			..self.clone()
		}
	}
}

/// Async SMTP client. The connection is made lazily on first send.
pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	host: String,
}

impl SmtpClient {
	#[tracing::instrument(
		name = "smtp_client_new",
		skip(config),
		fields(host = %config.host, port = %config.port, use_tls = %config.use_tls)
	)]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let host = config.host.trim().to_string();
		if host.is_empty() {
			return Err(SmtpError::Config("SMTP host must not be empty".into()));
		}

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
		};

		let mut builder = builder.port(config.port);

		match (config.username, config.password) {
			(Some(username), Some(password)) => {
				builder = builder.credentials(Credentials::new(username, password.into_inner()));
			}
			(Some(_), None) => {
				return Err(SmtpError::Config(
					"SMTP username is set but no password was given".into(),
				))
			}
			_ => {}
		}

		let transport = builder.build();

		tracing::debug!("SMTP client initialized");

		Ok(Self { transport, host })
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	/// Open a connection to verify the server is reachable.
	#[tracing::instrument(name = "smtp_check_health", skip(self), fields(host = %self.host))]
	pub async fn check_health(&self) -> Result<(), SmtpError> {
		let reachable = self
			.transport
			.test_connection()
			.await
			.map_err(|e| SmtpError::Connection(format!("{e}")))?;
		if !reachable {
			return Err(SmtpError::Connection(format!("{} did not accept a connection", self.host)));
		}
		tracing::debug!("SMTP server is healthy");
		Ok(())
	}

	/// Send a multipart email with plain text and HTML alternatives.
	#[tracing::instrument(
		name = "smtp_send_email",
		skip(self, body_html, body_text),
		fields(host = %self.host, from = %from, to = %to, subject = %subject)
	)]
	pub async fn send_email(
		&self,
		from: &str,
		to: &str,
		subject: &str,
		body_html: &str,
		body_text: &str,
	) -> Result<(), SmtpError> {
		let from_mailbox: Mailbox = from.parse().map_err(|e| SmtpError::Address(format!("{e}")))?;
		let to_mailbox: Mailbox = to.parse().map_err(|e| SmtpError::Address(format!("{e}")))?;

		let message = Message::builder()
			.from(from_mailbox)
			.to(to_mailbox)
			.subject(subject)
			.multipart(
				MultiPart::alternative()
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_PLAIN)
							.body(body_text.to_string()),
					)
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_HTML)
							.body(body_html.to_string()),
					),
			)
			.map_err(|e| SmtpError::Message(format!("{e}")))?;

		self
			.transport
			.send(message)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::info!("email sent");

		Ok(())
	}
}
