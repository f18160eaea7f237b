// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory connection settings.

use std::path::PathBuf;

use mailprov_common_secret::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfigLayer {
	/// JSON snapshot backing the file directory.
	pub snapshot_path: Option<PathBuf>,
	pub domain_controller: Option<String>,
	pub use_default_credential: Option<bool>,
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<SecretString>,
	/// Domain for primary addresses of new mailboxes.
	pub mail_domain: Option<String>,
}

impl DirectoryConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.snapshot_path.is_some() {
			self.snapshot_path = other.snapshot_path;
		}
		if other.domain_controller.is_some() {
			self.domain_controller = other.domain_controller;
		}
		if other.use_default_credential.is_some() {
			self.use_default_credential = other.use_default_credential;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.mail_domain.is_some() {
			self.mail_domain = other.mail_domain;
		}
	}

	pub fn finalize(self) -> DirectoryConfig {
		DirectoryConfig {
			snapshot_path: self.snapshot_path,
			domain_controller: self.domain_controller.filter(|s| !s.trim().is_empty()),
			use_default_credential: self.use_default_credential.unwrap_or(false),
			username: self.username.filter(|s| !s.trim().is_empty()),
			password: self.password,
			mail_domain: self.mail_domain.filter(|s| !s.trim().is_empty()),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
	pub snapshot_path: Option<PathBuf>,
	pub domain_controller: Option<String>,
	pub use_default_credential: bool,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub mail_domain: Option<String>,
}

impl DirectoryConfig {
	pub fn has_explicit_credential(&self) -> bool {
		self.username.is_some()
	}
}
