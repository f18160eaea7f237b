// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::recipient::{MailboxLocation, RecipientTypeDetails};

/// Caller-supplied field named by a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestField {
	Identity,
	Location,
	ExternalEmailAddress,
	EmailFrom,
	LocalWelcomeTemplate,
	RemoteWelcomeTemplate,
	LocalNotificationTemplate,
	RemoteNotificationTemplate,
}

impl RequestField {
	pub fn as_str(&self) -> &'static str {
		match self {
			RequestField::Identity => "identity",
			RequestField::Location => "location",
			RequestField::ExternalEmailAddress => "external_email_address",
			RequestField::EmailFrom => "email_from",
			RequestField::LocalWelcomeTemplate => "local_welcome_template",
			RequestField::RemoteWelcomeTemplate => "remote_welcome_template",
			RequestField::LocalNotificationTemplate => "local_notification_template",
			RequestField::RemoteNotificationTemplate => "remote_notification_template",
		}
	}
}

impl fmt::Display for RequestField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A provisioning request was malformed or incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
	pub field: RequestField,
	pub message: String,
}

impl ValidationError {
	pub fn new(field: RequestField, message: impl Into<String>) -> Self {
		Self {
			field,
			message: message.into(),
		}
	}
}

/// The identity could not be resolved in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
	#[error("identity not found: {0}")]
	NotFound(String),

	#[error("identity {identity} matches {matches} directory objects")]
	Ambiguous { identity: String, matches: usize },

	#[error("directory lookup failed: {0}")]
	Directory(String),
}

/// The directory refused or failed to enable the mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
	#[error("directory rejected mailbox enable: {0}")]
	Rejected(String),

	#[error("directory write failed: {0}")]
	Directory(String),
}

/// A notification email could not be sent. Never fails a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
	#[error("failed to load template {template}: {message}")]
	Template { template: String, message: String },

	#[error("invalid email address: {0}")]
	Address(String),

	#[error("failed to build message: {0}")]
	Message(String),

	#[error("mail transport failed: {0}")]
	Transport(String),

	#[error("no recipient address known for {0}")]
	NoRecipient(String),
}

/// Reason a provisioning run ended in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Lookup(#[from] LookupError),

	#[error("{identity} is a {current} and cannot be given a {requested} mailbox")]
	Conflict {
		identity: String,
		current: RecipientTypeDetails,
		requested: MailboxLocation,
	},

	#[error(transparent)]
	Mutation(#[from] MutationError),

	#[error("provisioning cancelled at {stage}")]
	Cancelled { stage: &'static str },
}

/// Coarse classification of [`ProvisioningError`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Validation,
	Lookup,
	Conflict,
	Mutation,
	Cancelled,
}

impl ProvisioningError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			ProvisioningError::Validation(_) => ErrorKind::Validation,
			ProvisioningError::Lookup(_) => ErrorKind::Lookup,
			ProvisioningError::Conflict { .. } => ErrorKind::Conflict,
			ProvisioningError::Mutation(_) => ErrorKind::Mutation,
			ProvisioningError::Cancelled { .. } => ErrorKind::Cancelled,
		}
	}
}

impl Serialize for ProvisioningError {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		use serde::ser::SerializeStruct;

		let mut state = serializer.serialize_struct("ProvisioningError", 2)?;
		state.serialize_field("kind", &self.kind())?;
		state.serialize_field("message", &self.to_string())?;
		state.end()
	}
}
