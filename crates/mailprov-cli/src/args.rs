// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};
use mailprov_config::{
	DirectoryConfigLayer, LogFormat, LoggingConfigLayer, MailprovConfigLayer,
	NotificationConfigLayer, ProvisioningConfigLayer,
};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
	#[default]
	Text,
	Json,
}

/// Provision a local or remote mailbox for existing directory users.
#[derive(Parser, Debug)]
#[command(name = "add-provisioned-mailbox", version, about, long_about = None)]
#[command(group(ArgGroup::new("location").required(true).args(["local", "remote"])))]
pub struct Args {
	/// Users to provision: account name, email address, distinguished name or
	/// GUID. Read one per line from stdin when none are given.
	#[arg(value_name = "IDENTITY")]
	pub identities: Vec<String>,

	/// Additional identity (repeatable)
	#[arg(long = "name", visible_alias = "id", value_name = "IDENTITY")]
	pub names: Vec<String>,

	/// Create the mailbox on the on-premise mail server
	#[arg(long)]
	pub local: bool,

	/// Create the mailbox on the hosted mail service
	#[arg(long, requires = "external_email_address")]
	pub remote: bool,

	/// Routing address of the hosted mailbox (remote only)
	#[arg(long, value_name = "ADDRESS", conflicts_with = "local")]
	pub external_email_address: Option<String>,

	/// Send welcome and notification emails after provisioning
	#[arg(long)]
	pub send_email_notification: bool,

	/// From: address for notification emails
	#[arg(long, value_name = "ADDRESS")]
	pub email_from: Option<String>,

	/// SMTP server for notification emails (overrides config)
	#[arg(long, value_name = "HOST")]
	pub smtp_server: Option<String>,

	/// Directory holding the default template files
	#[arg(long, value_name = "DIR")]
	pub template_dir: Option<PathBuf>,

	#[arg(long, value_name = "FILE")]
	pub local_welcome_template: Option<PathBuf>,

	#[arg(long, value_name = "FILE")]
	pub remote_welcome_template: Option<PathBuf>,

	#[arg(long, value_name = "FILE")]
	pub local_notification_template: Option<PathBuf>,

	#[arg(long, value_name = "FILE")]
	pub remote_notification_template: Option<PathBuf>,

	/// Domain controller to direct directory operations to
	#[arg(long, value_name = "HOST")]
	pub domain_controller: Option<String>,

	/// Authenticate to the directory as the current user
	#[arg(long, conflicts_with = "credential")]
	pub use_default_credential: bool,

	/// Directory username; the password is read from MAILPROV_DIRECTORY_PASSWORD(_FILE)
	#[arg(long, value_name = "USERNAME")]
	pub credential: Option<String>,

	/// JSON directory snapshot to provision against
	#[arg(long, value_name = "SNAPSHOT")]
	pub directory: Option<PathBuf>,

	/// Path to custom configuration file
	#[arg(short, long)]
	pub config: Option<PathBuf>,

	/// Maximum identities provisioned at once
	#[arg(long)]
	pub concurrency: Option<usize>,

	/// Report what would change without modifying the directory
	#[arg(long, visible_alias = "what-if")]
	pub dry_run: bool,

	/// Log level (overrides config)
	#[arg(short, long)]
	pub log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	pub json_logs: bool,

	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	pub output: OutputFormat,
}

impl Args {
	/// Identities given on the command line, positional first.
	pub fn command_line_identities(&self) -> Vec<String> {
		self
			.identities
			.iter()
			.chain(&self.names)
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	}
}

fn flag(set: bool) -> Option<bool> {
	set.then_some(true)
}

impl From<&Args> for MailprovConfigLayer {
	fn from(args: &Args) -> Self {
		MailprovConfigLayer {
			smtp: None,
			notification: Some(NotificationConfigLayer {
				send: flag(args.send_email_notification),
				from_address: args.email_from.clone(),
				template_dir: args.template_dir.clone(),
				local_welcome_template: args.local_welcome_template.clone(),
				remote_welcome_template: args.remote_welcome_template.clone(),
				local_notification_template: args.local_notification_template.clone(),
				remote_notification_template: args.remote_notification_template.clone(),
			}),
			directory: Some(DirectoryConfigLayer {
				snapshot_path: args.directory.clone(),
				domain_controller: args.domain_controller.clone(),
				use_default_credential: flag(args.use_default_credential),
				username: args.credential.clone(),
				password: None,
				mail_domain: None,
			}),
			provisioning: Some(ProvisioningConfigLayer {
				concurrency: args.concurrency,
				dry_run: flag(args.dry_run),
			}),
			logging: Some(LoggingConfigLayer {
				level: args.log_level.clone(),
				format: args.json_logs.then_some(LogFormat::Json),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	fn parse(args: &[&str]) -> Result<Args, clap::Error> {
		Args::try_parse_from(std::iter::once("add-provisioned-mailbox").chain(args.iter().copied()))
	}

	#[test]
	fn command_is_well_formed() {
		Args::command().debug_assert();
	}

	#[test]
	fn location_is_required() {
		assert!(parse(&["jdoe"]).is_err());
		assert!(parse(&["jdoe", "--local", "--remote"]).is_err());
		assert!(parse(&["jdoe", "--local"]).is_ok());
	}

	#[test]
	fn remote_requires_external_address() {
		assert!(parse(&["jdoe", "--remote"]).is_err());
		let args = parse(&["jdoe", "--remote", "--external-email-address", "jdoe@hosted.example"])
			.unwrap();
		assert!(args.remote);
		assert_eq!(
			args.external_email_address.as_deref(),
			Some("jdoe@hosted.example")
		);
	}

	#[test]
	fn external_address_conflicts_with_local() {
		assert!(parse(&["jdoe", "--local", "--external-email-address", "a@b.example"]).is_err());
	}

	#[test]
	fn default_credential_conflicts_with_credential() {
		assert!(parse(&[
			"jdoe",
			"--local",
			"--use-default-credential",
			"--credential",
			"EXAMPLE\\svc"
		])
		.is_err());
	}

	#[test]
	fn identities_merge_positional_and_named() {
		let args = parse(&["alice", "--local", "--name", "bob", "--id", " carol ", "--id", " "])
			.unwrap();
		assert_eq!(args.command_line_identities(), ["alice", "bob", "carol"]);
	}

	#[test]
	fn what_if_is_dry_run() {
		let args = parse(&["jdoe", "--local", "--what-if"]).unwrap();
		assert!(args.dry_run);
	}

	#[test]
	fn flags_become_command_line_layer() {
		let args = parse(&[
			"jdoe",
			"--local",
			"--send-email-notification",
			"--email-from",
			"helpdesk@example.edu",
			"--concurrency",
			"8",
			"--json-logs",
			"--directory",
			"/tmp/directory.json",
		])
		.unwrap();

		let layer = MailprovConfigLayer::from(&args);
		let notification = layer.notification.unwrap();
		assert_eq!(notification.send, Some(true));
		assert_eq!(
			notification.from_address.as_deref(),
			Some("helpdesk@example.edu")
		);
		assert_eq!(layer.provisioning.as_ref().unwrap().concurrency, Some(8));
		assert_eq!(layer.provisioning.unwrap().dry_run, None);
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
		assert_eq!(
			layer.directory.unwrap().snapshot_path,
			Some(PathBuf::from("/tmp/directory.json"))
		);
	}

	#[test]
	fn output_defaults_to_text() {
		let args = parse(&["jdoe", "--local"]).unwrap();
		assert_eq!(args.output, OutputFormat::Text);
		let args = parse(&["jdoe", "--local", "--output", "json"]).unwrap();
		assert_eq!(args.output, OutputFormat::Json);
	}
}
