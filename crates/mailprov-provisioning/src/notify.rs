// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound notification emails.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::address::EmailAddress;
use crate::error::SendError;
use crate::template::TemplateRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	/// Sent to the new mailbox.
	Welcome,
	/// Sent to the address the user already read mail at.
	Notification,
}

impl fmt::Display for NotificationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NotificationKind::Welcome => f.write_str("welcome"),
			NotificationKind::Notification => f.write_str("notification"),
		}
	}
}

/// A templated email ready to hand to a [`NotificationSender`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
	pub kind: NotificationKind,
	pub template: TemplateRef,
	pub from: EmailAddress,
	pub to: EmailAddress,
	pub smtp_server: Option<String>,
	/// Values substituted for `{name}` placeholders in the template.
	pub context: BTreeMap<String, String>,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
	async fn send(&self, message: &EmailMessage) -> Result<(), SendError>;
}

/// Sender for deployments that never notify. Every send fails, so a request
/// that does ask for notifications reports them as not sent.
#[derive(Debug, Clone, Default)]
pub struct DisabledSender;

#[async_trait]
impl NotificationSender for DisabledSender {
	async fn send(&self, _message: &EmailMessage) -> Result<(), SendError> {
		Err(SendError::Transport(
			"no SMTP server is configured".to_string(),
		))
	}
}
