// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML file, environment and command line.

use std::path::PathBuf;

use mailprov_common_secret::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::MailprovConfigLayer;
use crate::sections::{
	DirectoryConfigLayer, LogFormat, LoggingConfigLayer, NotificationConfigLayer,
	ProvisioningConfigLayer, SmtpConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/mailprov/config.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	CommandLine = 60,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<MailprovConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<MailprovConfigLayer, ConfigError> {
		Ok(MailprovConfigLayer::default())
	}
}

/// TOML file source. A missing file yields an empty layer unless the path
/// was given explicitly.
pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn system() -> Self {
		Self {
			path: PathBuf::from(SYSTEM_CONFIG_PATH),
			required: false,
		}
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<MailprovConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(MailprovConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: MailprovConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MAILPROV_<SECTION>_<FIELD>. Secrets also accept a `_FILE`
/// variant naming a file that holds the value.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<MailprovConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(MailprovConfigLayer {
			smtp: Some(load_smtp_from_env()?),
			notification: Some(load_notification_from_env()?),
			directory: Some(load_directory_from_env()?),
			provisioning: Some(load_provisioning_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

/// A fixed layer, typically built from command-line flags.
pub struct LayerSource {
	name: &'static str,
	precedence: Precedence,
	layer: MailprovConfigLayer,
}

impl LayerSource {
	pub fn command_line(layer: MailprovConfigLayer) -> Self {
		Self {
			name: "command-line",
			precedence: Precedence::CommandLine,
			layer,
		}
	}
}

impl ConfigSource for LayerSource {
	fn name(&self) -> &'static str {
		self.name
	}

	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<MailprovConfigLayer, ConfigError> {
		Ok(self.layer.clone())
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid usize value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_smtp_from_env() -> Result<SmtpConfigLayer, ConfigError> {
	Ok(SmtpConfigLayer {
		host: env_var("MAILPROV_SMTP_HOST"),
		port: env_u16("MAILPROV_SMTP_PORT")?,
		username: env_var("MAILPROV_SMTP_USERNAME"),
		password: load_secret_env("MAILPROV_SMTP_PASSWORD")?,
		use_tls: env_bool("MAILPROV_SMTP_USE_TLS"),
	})
}

fn load_notification_from_env() -> Result<NotificationConfigLayer, ConfigError> {
	Ok(NotificationConfigLayer {
		send: env_bool("MAILPROV_NOTIFICATION_SEND"),
		from_address: env_var("MAILPROV_NOTIFICATION_FROM_ADDRESS"),
		template_dir: env_var("MAILPROV_NOTIFICATION_TEMPLATE_DIR").map(PathBuf::from),
		local_welcome_template: env_var("MAILPROV_NOTIFICATION_LOCAL_WELCOME_TEMPLATE")
			.map(PathBuf::from),
		remote_welcome_template: env_var("MAILPROV_NOTIFICATION_REMOTE_WELCOME_TEMPLATE")
			.map(PathBuf::from),
		local_notification_template: env_var("MAILPROV_NOTIFICATION_LOCAL_NOTIFICATION_TEMPLATE")
			.map(PathBuf::from),
		remote_notification_template: env_var("MAILPROV_NOTIFICATION_REMOTE_NOTIFICATION_TEMPLATE")
			.map(PathBuf::from),
	})
}

fn load_directory_from_env() -> Result<DirectoryConfigLayer, ConfigError> {
	Ok(DirectoryConfigLayer {
		snapshot_path: env_var("MAILPROV_DIRECTORY_SNAPSHOT_PATH").map(PathBuf::from),
		domain_controller: env_var("MAILPROV_DIRECTORY_DOMAIN_CONTROLLER"),
		use_default_credential: env_bool("MAILPROV_DIRECTORY_USE_DEFAULT_CREDENTIAL"),
		username: env_var("MAILPROV_DIRECTORY_USERNAME"),
		password: load_secret_env("MAILPROV_DIRECTORY_PASSWORD")?,
		mail_domain: env_var("MAILPROV_DIRECTORY_MAIL_DOMAIN"),
	})
}

fn load_provisioning_from_env() -> Result<ProvisioningConfigLayer, ConfigError> {
	Ok(ProvisioningConfigLayer {
		concurrency: env_usize("MAILPROV_PROVISIONING_CONCURRENCY")?,
		dry_run: env_bool("MAILPROV_PROVISIONING_DRY_RUN"),
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = env_var("MAILPROV_LOG_FORMAT")
		.map(|v| LogFormat::from_str_value(&v))
		.transpose()?;
	Ok(LoggingConfigLayer {
		level: env_var("MAILPROV_LOG_LEVEL"),
		format,
	})
}
