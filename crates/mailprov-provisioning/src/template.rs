// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Email template references and the stores that resolve them.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RequestField;
use crate::recipient::MailboxLocation;

pub const LOCAL_WELCOME_FILE: &str = "LocalWelcome.txt";
pub const REMOTE_WELCOME_FILE: &str = "RemoteWelcome.txt";
pub const LOCAL_NOTIFICATION_FILE: &str = "LocalNotification.txt";
pub const REMOTE_NOTIFICATION_FILE: &str = "RemoteNotification.txt";

/// Reference to a template resource, by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateRef(PathBuf);

impl TemplateRef {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self(path.into())
	}

	pub fn path(&self) -> &Path {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.as_os_str().is_empty()
	}
}

impl fmt::Display for TemplateRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.display())
	}
}

/// The four templates a deployment may configure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSet {
	pub local_welcome: Option<TemplateRef>,
	pub remote_welcome: Option<TemplateRef>,
	pub local_notification: Option<TemplateRef>,
	pub remote_notification: Option<TemplateRef>,
}

impl TemplateSet {
	/// Fill any unset reference with its conventional file name under `dir`.
	pub fn with_defaults(mut self, dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();
		self
			.local_welcome
			.get_or_insert_with(|| TemplateRef::new(dir.join(LOCAL_WELCOME_FILE)));
		self
			.remote_welcome
			.get_or_insert_with(|| TemplateRef::new(dir.join(REMOTE_WELCOME_FILE)));
		self
			.local_notification
			.get_or_insert_with(|| TemplateRef::new(dir.join(LOCAL_NOTIFICATION_FILE)));
		self
			.remote_notification
			.get_or_insert_with(|| TemplateRef::new(dir.join(REMOTE_NOTIFICATION_FILE)));
		self
	}

	/// Welcome and notification templates for `location`, each paired with the
	/// field that supplies it.
	pub fn for_location(
		&self,
		location: MailboxLocation,
	) -> [(RequestField, Option<&TemplateRef>); 2] {
		match location {
			MailboxLocation::Local => [
				(RequestField::LocalWelcomeTemplate, self.local_welcome.as_ref()),
				(
					RequestField::LocalNotificationTemplate,
					self.local_notification.as_ref(),
				),
			],
			MailboxLocation::Remote => [
				(RequestField::RemoteWelcomeTemplate, self.remote_welcome.as_ref()),
				(
					RequestField::RemoteNotificationTemplate,
					self.remote_notification.as_ref(),
				),
			],
		}
	}
}

/// Resolves template references to content.
pub trait TemplateStore: Send + Sync {
	/// Whether the referenced template exists and has content.
	fn exists(&self, template: &TemplateRef) -> bool;

	fn load(&self, template: &TemplateRef) -> io::Result<String>;
}

/// Templates stored as files on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsTemplateStore;

impl TemplateStore for FsTemplateStore {
	fn exists(&self, template: &TemplateRef) -> bool {
		std::fs::metadata(template.path())
			.map(|m| m.is_file() && m.len() > 0)
			.unwrap_or(false)
	}

	fn load(&self, template: &TemplateRef) -> io::Result<String> {
		std::fs::read_to_string(template.path())
	}
}
