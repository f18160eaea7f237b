// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for mailbox provisioning.
//!
//! Precedence (highest to lowest):
//! 1. Command-line flags
//! 2. Environment variables (`MAILPROV_*`)
//! 3. Config file (`/etc/mailprov/config.toml`, or an explicit path)
//! 4. Built-in defaults

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::MailprovConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, LayerSource, Precedence, TomlSource,
	SYSTEM_CONFIG_PATH,
};

use std::path::PathBuf;

use tracing::debug;

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct MailprovConfig {
	pub smtp: Option<SmtpConfig>,
	pub notification: NotificationConfig,
	pub directory: DirectoryConfig,
	pub provisioning: ProvisioningConfig,
	pub logging: LoggingConfig,
}

/// Load configuration with command-line overrides on top of every other source.
pub fn load_config_with_overrides(
	config_path: Option<PathBuf>,
	overrides: MailprovConfigLayer,
) -> Result<MailprovConfig, ConfigError> {
	let file = match config_path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(file),
		Box::new(EnvSource),
		Box::new(LayerSource::command_line(overrides)),
	])
}

/// Merge `sources` in precedence order and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<MailprovConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = MailprovConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize a merged layer into resolved config.
pub fn finalize(layer: MailprovConfigLayer) -> Result<MailprovConfig, ConfigError> {
	let smtp = layer.smtp.unwrap_or_default().build()?;
	let notification = layer.notification.unwrap_or_default().finalize();
	let directory = layer.directory.unwrap_or_default().finalize();
	let provisioning = layer.provisioning.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&directory)?;

	Ok(MailprovConfig {
		smtp,
		notification,
		directory,
		provisioning,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(directory: &DirectoryConfig) -> Result<(), ConfigError> {
	if directory.use_default_credential && directory.has_explicit_credential() {
		return Err(ConfigError::Validation(
			"directory.use_default_credential cannot be combined with an explicit directory \
			 username. Remove one of them."
				.to_string(),
		));
	}

	if directory.password.is_some() && !directory.has_explicit_credential() {
		return Err(ConfigError::Validation(
			"a directory password was given without a directory username".to_string(),
		));
	}

	Ok(())
}
