// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification email settings: sender address and template locations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfigLayer {
	pub send: Option<bool>,
	pub from_address: Option<String>,
	/// Directory searched for templates not given explicitly.
	pub template_dir: Option<PathBuf>,
	pub local_welcome_template: Option<PathBuf>,
	pub remote_welcome_template: Option<PathBuf>,
	pub local_notification_template: Option<PathBuf>,
	pub remote_notification_template: Option<PathBuf>,
}

impl NotificationConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.send.is_some() {
			self.send = other.send;
		}
		if other.from_address.is_some() {
			self.from_address = other.from_address;
		}
		if other.template_dir.is_some() {
			self.template_dir = other.template_dir;
		}
		if other.local_welcome_template.is_some() {
			self.local_welcome_template = other.local_welcome_template;
		}
		if other.remote_welcome_template.is_some() {
			self.remote_welcome_template = other.remote_welcome_template;
		}
		if other.local_notification_template.is_some() {
			self.local_notification_template = other.local_notification_template;
		}
		if other.remote_notification_template.is_some() {
			self.remote_notification_template = other.remote_notification_template;
		}
	}

	pub fn finalize(self) -> NotificationConfig {
		NotificationConfig {
			send: self.send.unwrap_or(false),
			from_address: self.from_address.filter(|s| !s.trim().is_empty()),
			template_dir: self.template_dir,
			local_welcome_template: self.local_welcome_template,
			remote_welcome_template: self.remote_welcome_template,
			local_notification_template: self.local_notification_template,
			remote_notification_template: self.remote_notification_template,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
	pub send: bool,
	pub from_address: Option<String>,
	pub template_dir: Option<PathBuf>,
	pub local_welcome_template: Option<PathBuf>,
	pub remote_welcome_template: Option<PathBuf>,
	pub local_notification_template: Option<PathBuf>,
	pub remote_notification_template: Option<PathBuf>,
}
