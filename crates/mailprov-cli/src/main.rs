// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod args;
mod output;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use mailprov_config::{LogFormat, LoggingConfig, MailprovConfig, MailprovConfigLayer};
use mailprov_provisioning::{
	BatchSummary, CancellationToken, DisabledSender, FsTemplateStore, MemoryDirectory,
	NotificationConfig, NotificationSender, Provisioner, ProvisionerOptions, RequestFields,
	TemplateRef, TemplateSet,
};
use mailprov_smtp::SmtpNotificationSender;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::{Args, OutputFormat};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();

	let config = mailprov_config::load_config_with_overrides(
		args.config.clone(),
		MailprovConfigLayer::from(&args),
	)
	.context("failed to load configuration")?;

	init_tracing(&config.logging);
	info!(
		smtp_configured = config.smtp.is_some(),
		send_notifications = config.notification.send,
		snapshot = ?config.directory.snapshot_path,
		domain_controller = ?config.directory.domain_controller,
		concurrency = config.provisioning.concurrency,
		dry_run = config.provisioning.dry_run,
		"configuration loaded"
	);

	let mut identities = args.command_line_identities();
	if identities.is_empty() {
		identities = read_identities(tokio::io::stdin()).await?;
	}

	let cancel = CancellationToken::new();
	let ctrl_c = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("interrupt received, stopping before the next directory change");
			ctrl_c.cancel();
		}
	});

	let succeeded = run(&args, &config, identities, &cancel, &mut std::io::stdout()).await?;
	Ok(if succeeded {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	})
}

fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Json => registry
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Compact => registry
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init(),
		LogFormat::Pretty => registry
			.with(fmt::layer().pretty().with_writer(std::io::stderr))
			.init(),
	}
}

/// One identity per non-blank line.
async fn read_identities<R>(input: R) -> anyhow::Result<Vec<String>>
where
	R: tokio::io::AsyncRead + Unpin,
{
	let mut lines = BufReader::new(input).lines();
	let mut identities = Vec::new();
	while let Some(line) = lines
		.next_line()
		.await
		.context("failed to read identities from stdin")?
	{
		let line = line.trim();
		if !line.is_empty() {
			identities.push(line.to_string());
		}
	}
	Ok(identities)
}

fn template_set(notification: &mailprov_config::NotificationConfig) -> TemplateSet {
	let set = TemplateSet {
		local_welcome: notification
			.local_welcome_template
			.clone()
			.map(TemplateRef::new),
		remote_welcome: notification
			.remote_welcome_template
			.clone()
			.map(TemplateRef::new),
		local_notification: notification
			.local_notification_template
			.clone()
			.map(TemplateRef::new),
		remote_notification: notification
			.remote_notification_template
			.clone()
			.map(TemplateRef::new),
	};
	match &notification.template_dir {
		Some(dir) => set.with_defaults(dir),
		None => set,
	}
}

fn smtp_config(config: &mailprov_config::SmtpConfig) -> mailprov_smtp::SmtpConfig {
	mailprov_smtp::SmtpConfig {
		host: config.host.clone(),
		port: config.port,
		username: config.username.clone(),
		password: config.password.clone(),
		use_tls: config.use_tls,
	}
}

fn request_fields(
	args: &Args,
	config: &MailprovConfig,
	identities: Vec<String>,
) -> Vec<RequestFields> {
	let notification = NotificationConfig {
		from_address: config.notification.from_address.clone(),
		smtp_server: args.smtp_server.clone(),
		templates: template_set(&config.notification),
	};
	identities
		.into_iter()
		.map(|identity| RequestFields {
			identity,
			local: args.local,
			remote: args.remote,
			external_email_address: args.external_email_address.clone(),
			send_notification: config.notification.send,
			notification: notification.clone(),
		})
		.collect()
}

/// Provision every identity and print the results. Returns whether all of
/// them succeeded.
async fn run(
	args: &Args,
	config: &MailprovConfig,
	identities: Vec<String>,
	cancel: &CancellationToken,
	out: &mut impl Write,
) -> anyhow::Result<bool> {
	if identities.is_empty() {
		bail!("no identities given on the command line or stdin");
	}
	if args.remote && identities.len() > 1 {
		bail!(
			"--remote takes a single identity because --external-email-address applies to it alone; got {}",
			identities.len()
		);
	}

	let Some(snapshot_path) = config.directory.snapshot_path.clone() else {
		bail!("no directory snapshot configured; pass --directory or set directory.snapshot_path");
	};

	info!(
		snapshot = %snapshot_path.display(),
		domain_controller = ?config.directory.domain_controller,
		credential = ?config.directory.username,
		use_default_credential = config.directory.use_default_credential,
		"opening directory"
	);
	let directory = Arc::new(
		MemoryDirectory::load(&snapshot_path)
			.await
			.with_context(|| format!("failed to open directory {}", snapshot_path.display()))?,
	);
	if let Some(domain) = &config.directory.mail_domain {
		directory.set_mail_domain(domain.clone()).await;
	}

	let dry_run = config.provisioning.dry_run;
	let templates = Arc::new(FsTemplateStore);
	let sender: Arc<dyn NotificationSender> = if config.notification.send {
		let smtp = SmtpNotificationSender::new(
			config.smtp.as_ref().map(smtp_config),
			templates.clone(),
		);
		if !dry_run && args.smtp_server.is_none() {
			if let Err(e) = smtp.check_default_server().await {
				warn!(error = %e, "SMTP server check failed, notification emails will likely fail");
			}
		}
		Arc::new(smtp)
	} else {
		Arc::new(DisabledSender)
	};

	let provisioner =
		Provisioner::new(directory.clone(), sender).with_options(ProvisionerOptions { dry_run });

	let fields = request_fields(args, config, identities);
	let results = provisioner
		.provision_all_fields_with_cancellation(
			fields,
			templates.as_ref(),
			config.provisioning.concurrency,
			cancel,
		)
		.await;
	let summary = BatchSummary::from_results(&results);

	if dry_run {
		info!("dry run, directory snapshot left unchanged");
	} else if directory.mutation_count() > 0 {
		directory
			.save(&snapshot_path)
			.await
			.with_context(|| format!("failed to save directory {}", snapshot_path.display()))?;
		info!(
			snapshot = %snapshot_path.display(),
			changes = directory.mutation_count(),
			"directory snapshot saved"
		);
	}

	match args.output {
		OutputFormat::Text => write!(out, "{}", output::render_text(&results, summary))?,
		OutputFormat::Json => writeln!(out, "{}", output::render_json(&results, summary)?)?,
	}

	Ok(summary.all_succeeded())
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use mailprov_provisioning::{DirectorySnapshot, DirectoryUser, RecipientTypeDetails};

	use super::*;

	const OU: &str = "OU=People,DC=example,DC=edu";

	async fn write_snapshot(path: &Path) {
		let directory = MemoryDirectory::new();
		directory.set_mail_domain("example.edu").await;
		directory.insert_user(DirectoryUser::new("jdoe", OU)).await;
		directory
			.insert_user(
				DirectoryUser::new("asmith", OU).with_recipient_type(RecipientTypeDetails::UserMailbox),
			)
			.await;
		directory.save(path).await.unwrap();
	}

	fn args(extra: &[&str]) -> Args {
		Args::try_parse_from(std::iter::once("add-provisioned-mailbox").chain(extra.iter().copied()))
			.unwrap()
	}

	fn config_for(args: &Args) -> MailprovConfig {
		mailprov_config::finalize(MailprovConfigLayer::from(args)).unwrap()
	}

	async fn saved(path: &Path) -> DirectorySnapshot {
		MemoryDirectory::load(path).await.unwrap().snapshot().await
	}

	#[tokio::test]
	async fn reads_identities_skipping_blank_lines() {
		let input: &[u8] = b"jdoe\n\n  asmith  \r\n";
		let identities = read_identities(input).await.unwrap();
		assert_eq!(identities, ["jdoe", "asmith"]);
	}

	#[tokio::test]
	async fn local_batch_saves_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("directory.json");
		write_snapshot(&path).await;
		let path_arg = path.to_str().unwrap();

		let args = args(&["jdoe", "asmith", "--local", "--directory", path_arg]);
		let mut out = Vec::new();
		let ok = run(
			&args,
			&config_for(&args),
			args.command_line_identities(),
			&CancellationToken::new(),
			&mut out,
		)
		.await
		.unwrap();

		assert!(ok);
		let text = String::from_utf8(out).unwrap();
		assert!(text.contains("jdoe: provisioned local mailbox (User -> UserMailbox)"));

		let snapshot = saved(&path).await;
		let jdoe = snapshot
			.users
			.iter()
			.find(|u| u.account_name == "jdoe")
			.unwrap();
		assert_eq!(jdoe.recipient_type, RecipientTypeDetails::UserMailbox);
	}

	struct ClosedPipe;

	impl Write for ClosedPipe {
		fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
			Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	#[tokio::test]
	async fn snapshot_is_saved_even_when_output_fails() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("directory.json");
		write_snapshot(&path).await;

		let args = args(&["jdoe", "--local", "--directory", path.to_str().unwrap()]);
		let err = run(
			&args,
			&config_for(&args),
			args.command_line_identities(),
			&CancellationToken::new(),
			&mut ClosedPipe,
		)
		.await
		.unwrap_err();
		assert!(err.to_string().contains("closed"));

		let snapshot = saved(&path).await;
		let jdoe = snapshot
			.users
			.iter()
			.find(|u| u.account_name == "jdoe")
			.unwrap();
		assert_eq!(jdoe.recipient_type, RecipientTypeDetails::UserMailbox);
	}

	#[tokio::test]
	async fn dry_run_leaves_snapshot_alone() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("directory.json");
		write_snapshot(&path).await;
		let before = std::fs::read_to_string(&path).unwrap();

		let args = args(&[
			"jdoe",
			"--local",
			"--what-if",
			"--output",
			"json",
			"--directory",
			path.to_str().unwrap(),
		]);
		let mut out = Vec::new();
		let ok = run(
			&args,
			&config_for(&args),
			args.command_line_identities(),
			&CancellationToken::new(),
			&mut out,
		)
		.await
		.unwrap();

		assert!(ok);
		let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
		assert_eq!(value["results"][0]["dry_run"], true);
		assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
	}

	#[tokio::test]
	async fn failed_identity_reports_failure() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("directory.json");
		write_snapshot(&path).await;

		let args = args(&["ghost", "--local", "--directory", path.to_str().unwrap()]);
		let mut out = Vec::new();
		let ok = run(
			&args,
			&config_for(&args),
			args.command_line_identities(),
			&CancellationToken::new(),
			&mut out,
		)
		.await
		.unwrap();

		assert!(!ok);
		assert!(String::from_utf8(out).unwrap().contains("ghost: FAILED"));
	}

	#[tokio::test]
	async fn remote_takes_one_identity() {
		let args = args(&[
			"jdoe",
			"asmith",
			"--remote",
			"--external-email-address",
			"jdoe@hosted.example",
			"--directory",
			"/nonexistent.json",
		]);
		let err = run(
			&args,
			&config_for(&args),
			args.command_line_identities(),
			&CancellationToken::new(),
			&mut Vec::new(),
		)
		.await
		.unwrap_err();
		assert!(err.to_string().contains("single identity"));
	}

	#[tokio::test]
	async fn missing_snapshot_path_is_an_error() {
		let args = args(&["jdoe", "--local"]);
		let mut config = config_for(&args);
		config.directory.snapshot_path = None;
		let err = run(
			&args,
			&config,
			args.command_line_identities(),
			&CancellationToken::new(),
			&mut Vec::new(),
		)
		.await
		.unwrap_err();
		assert!(err.to_string().contains("no directory snapshot"));
	}

	#[test]
	fn template_dir_fills_unset_templates() {
		let notification = mailprov_config::NotificationConfig {
			template_dir: Some("/etc/mailprov/templates".into()),
			local_welcome_template: Some("/custom/welcome.txt".into()),
			..Default::default()
		};
		let set = template_set(&notification);
		assert_eq!(
			set.local_welcome.unwrap().path(),
			Path::new("/custom/welcome.txt")
		);
		assert!(set
			.remote_notification
			.unwrap()
			.path()
			.starts_with("/etc/mailprov/templates"));
	}
}
