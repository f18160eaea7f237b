// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Default SMTP server used for notification emails.

use mailprov_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 587;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<SecretString>,
	pub use_tls: Option<bool>,
}

impl SmtpConfigLayer {
	/// Merge with another layer, preferring values from `other`.
	pub fn merge(&mut self, other: SmtpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.use_tls.is_some() {
			self.use_tls = other.use_tls;
		}
	}

	/// `None` when no host is configured.
	pub fn build(self) -> Result<Option<SmtpConfig>, ConfigError> {
		let Some(host) = self
			.host
			.map(|h| h.trim().to_string())
			.filter(|h| !h.is_empty())
		else {
			return Ok(None);
		};

		if self.username.is_some() && self.password.is_none() {
			return Err(ConfigError::Validation(
				"SMTP username is set but no password was given".to_string(),
			));
		}

		Ok(Some(SmtpConfig {
			host,
			port: self.port.unwrap_or(DEFAULT_PORT),
			username: self.username,
			password: self.password,
			use_tls: self.use_tls.unwrap_or(true),
		}))
	}
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub use_tls: bool,
}
