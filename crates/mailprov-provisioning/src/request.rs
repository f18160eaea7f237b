// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning requests and their validation.
//!
//! A [`ProvisioningRequest`] can only be obtained through validation, so a
//! request in hand always names an identity, exactly one mailbox location,
//! and (when notifications are wanted) readable templates for that location.
//! Validation never touches the directory or the mail transport.

use serde::{Deserialize, Serialize};

use crate::address::EmailAddress;
use crate::error::{RequestField, ValidationError};
use crate::recipient::MailboxLocation;
use crate::template::{TemplateRef, TemplateSet, TemplateStore};

/// The requested mailbox, with the remote payload carried only where it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "location", rename_all = "snake_case")]
pub enum MailboxTarget {
	Local,
	Remote { external_address: EmailAddress },
}

impl MailboxTarget {
	pub fn location(&self) -> MailboxLocation {
		match self {
			MailboxTarget::Local => MailboxLocation::Local,
			MailboxTarget::Remote { .. } => MailboxLocation::Remote,
		}
	}

	pub fn external_address(&self) -> Option<&EmailAddress> {
		match self {
			MailboxTarget::Local => None,
			MailboxTarget::Remote { external_address } => Some(external_address),
		}
	}
}

/// Notification settings as supplied by the caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
	pub from_address: Option<String>,
	/// Overrides the sender's default SMTP server when set.
	pub smtp_server: Option<String>,
	pub templates: TemplateSet,
}

/// Validated notification settings for one request's location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
	pub from: EmailAddress,
	pub smtp_server: Option<String>,
	pub welcome_template: TemplateRef,
	pub notification_template: TemplateRef,
}

/// Raw request fields, shaped like the command line that collects them.
#[derive(Debug, Clone, Default)]
pub struct RequestFields {
	pub identity: String,
	pub local: bool,
	pub remote: bool,
	pub external_email_address: Option<String>,
	pub send_notification: bool,
	pub notification: NotificationConfig,
}

/// An immutable, validated provisioning request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningRequest {
	identity: String,
	target: MailboxTarget,
	notification: Option<Notification>,
}

impl ProvisioningRequest {
	/// Validate raw fields.
	///
	/// Rules are checked in order and the first violation is returned:
	/// identity, location, external address, then notification settings.
	pub fn validate(
		fields: RequestFields,
		templates: &dyn TemplateStore,
	) -> Result<Self, ValidationError> {
		let identity = validate_identity(&fields.identity)?;

		let request = match (fields.local, fields.remote) {
			(true, false) => {
				if fields.external_email_address.is_some() {
					return Err(ValidationError::new(
						RequestField::ExternalEmailAddress,
						"only applies to a remote mailbox",
					));
				}
				Self::local(identity)?
			}
			(false, true) => {
				let external = fields.external_email_address.as_deref().ok_or_else(|| {
					ValidationError::new(
						RequestField::ExternalEmailAddress,
						"required for a remote mailbox",
					)
				})?;
				Self::remote(identity, external)?
			}
			(true, true) => {
				return Err(ValidationError::new(
					RequestField::Location,
					"choose either local or remote, not both",
				))
			}
			(false, false) => {
				return Err(ValidationError::new(
					RequestField::Location,
					"one of local or remote is required",
				))
			}
		};

		if fields.send_notification {
			request.with_notification(&fields.notification, templates)
		} else {
			Ok(request)
		}
	}

	pub fn local(identity: impl AsRef<str>) -> Result<Self, ValidationError> {
		Ok(Self {
			identity: validate_identity(identity.as_ref())?,
			target: MailboxTarget::Local,
			notification: None,
		})
	}

	pub fn remote(
		identity: impl AsRef<str>,
		external_address: &str,
	) -> Result<Self, ValidationError> {
		let identity = validate_identity(identity.as_ref())?;
		let external_address = EmailAddress::parse(external_address)
			.map_err(|e| ValidationError::new(RequestField::ExternalEmailAddress, e.to_string()))?;
		Ok(Self {
			identity,
			target: MailboxTarget::Remote { external_address },
			notification: None,
		})
	}

	/// Attach notifications, checking the from address and the two templates
	/// this request's location will use.
	pub fn with_notification(
		mut self,
		config: &NotificationConfig,
		templates: &dyn TemplateStore,
	) -> Result<Self, ValidationError> {
		let from = config
			.from_address
			.as_deref()
			.filter(|s| !s.trim().is_empty())
			.ok_or_else(|| {
				ValidationError::new(RequestField::EmailFrom, "required when sending notifications")
			})?;
		let from = EmailAddress::parse(from)
			.map_err(|e| ValidationError::new(RequestField::EmailFrom, e.to_string()))?;

		let [welcome, notification] = config.templates.for_location(self.target.location());
		let welcome_template = require_template(welcome, templates)?;
		let notification_template = require_template(notification, templates)?;

		self.notification = Some(Notification {
			from,
			smtp_server: config
				.smtp_server
				.as_ref()
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty()),
			welcome_template,
			notification_template,
		});
		Ok(self)
	}

	pub fn identity(&self) -> &str {
		&self.identity
	}

	pub fn target(&self) -> &MailboxTarget {
		&self.target
	}

	pub fn location(&self) -> MailboxLocation {
		self.target.location()
	}

	pub fn notification(&self) -> Option<&Notification> {
		self.notification.as_ref()
	}

	pub fn sends_notification(&self) -> bool {
		self.notification.is_some()
	}
}

fn validate_identity(identity: &str) -> Result<String, ValidationError> {
	let trimmed = identity.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::new(
			RequestField::Identity,
			"must not be empty",
		));
	}
	Ok(trimmed.to_string())
}

fn require_template(
	(field, template): (RequestField, Option<&TemplateRef>),
	store: &dyn TemplateStore,
) -> Result<TemplateRef, ValidationError> {
	let template = template
		.filter(|t| !t.is_empty())
		.ok_or_else(|| ValidationError::new(field, "required when sending notifications"))?;
	if !store.exists(template) {
		return Err(ValidationError::new(
			field,
			format!("template {template} does not exist or is empty"),
		));
	}
	Ok(template.clone())
}
