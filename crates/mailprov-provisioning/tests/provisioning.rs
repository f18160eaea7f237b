// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailprov_provisioning::{
	CancellationToken, DirectoryAdapter, DirectoryEntry, DirectoryObjectRef, DirectoryUser,
	EmailAddress, EmailMessage, EnabledMailbox, ErrorKind, FsTemplateStore, LookupError,
	MailboxLocation, MailboxTarget, MemoryDirectory, MutationError, NotificationConfig,
	NotificationKind, NotificationSender, ProvisioningError, ProvisioningRequest,
	ProvisionerOptions, Provisioner, RecipientTypeDetails, RequestField, RequestFields,
	SendError, TemplateSet,
};
use uuid::Uuid;

const OU: &str = "OU=People,DC=example,DC=edu";

/// Directory with one fixed user that counts every call.
struct ScriptedDirectory {
	entry: Result<DirectoryEntry, LookupError>,
	enable: Result<EnabledMailbox, MutationError>,
	lookups: AtomicUsize,
	enables: AtomicUsize,
	cancel_on_lookup: Option<CancellationToken>,
}

impl ScriptedDirectory {
	fn new(recipient_type: RecipientTypeDetails) -> Self {
		Self {
			entry: Ok(DirectoryEntry {
				object: DirectoryObjectRef {
					guid: Uuid::new_v4(),
					distinguished_name: format!("CN=jdoe,{OU}"),
				},
				display_name: Some("Jane Doe".to_string()),
				email_address: Some(addr("jdoe@old.example.edu")),
				recipient_type,
			}),
			enable: Ok(EnabledMailbox {
				recipient_type: RecipientTypeDetails::UserMailbox,
				primary_address: Some(addr("jdoe@example.edu")),
				mail_contact: None,
			}),
			lookups: AtomicUsize::new(0),
			enables: AtomicUsize::new(0),
			cancel_on_lookup: None,
		}
	}

	/// The user has no address before or after the enable.
	fn without_addresses(mut self) -> Self {
		if let Ok(entry) = &mut self.entry {
			entry.email_address = None;
		}
		if let Ok(mailbox) = &mut self.enable {
			mailbox.primary_address = None;
		}
		self
	}

	/// Cancel `token` while the lookup is in flight.
	fn cancelling(mut self, token: &CancellationToken) -> Self {
		self.cancel_on_lookup = Some(token.clone());
		self
	}

	fn with_lookup_error(mut self, error: LookupError) -> Self {
		self.entry = Err(error);
		self
	}

	fn with_enable(mut self, enable: Result<EnabledMailbox, MutationError>) -> Self {
		self.enable = enable;
		self
	}

	fn lookups(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}

	fn enables(&self) -> usize {
		self.enables.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl DirectoryAdapter for ScriptedDirectory {
	async fn lookup(&self, _identity: &str) -> Result<DirectoryEntry, LookupError> {
		self.lookups.fetch_add(1, Ordering::SeqCst);
		if let Some(token) = &self.cancel_on_lookup {
			token.cancel();
		}
		self.entry.clone()
	}

	async fn enable_mailbox(
		&self,
		_object: &DirectoryObjectRef,
		_target: &MailboxTarget,
	) -> Result<EnabledMailbox, MutationError> {
		self.enables.fetch_add(1, Ordering::SeqCst);
		self.enable.clone()
	}
}

/// Records sent messages; fails sends of the listed kinds.
#[derive(Default)]
struct RecordingSender {
	fail: Vec<NotificationKind>,
	sent: Mutex<Vec<EmailMessage>>,
	attempts: AtomicUsize,
}

impl RecordingSender {
	fn failing(kinds: &[NotificationKind]) -> Self {
		Self {
			fail: kinds.to_vec(),
			..Default::default()
		}
	}

	fn sent(&self) -> Vec<EmailMessage> {
		self.sent.lock().unwrap().clone()
	}

	fn attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl NotificationSender for RecordingSender {
	async fn send(&self, message: &EmailMessage) -> Result<(), SendError> {
		self.attempts.fetch_add(1, Ordering::SeqCst);
		if self.fail.contains(&message.kind) {
			return Err(SendError::Transport("connection refused".to_string()));
		}
		self.sent.lock().unwrap().push(message.clone());
		Ok(())
	}
}

fn addr(s: &str) -> EmailAddress {
	EmailAddress::parse(s).unwrap()
}

fn write_templates(dir: &Path) -> NotificationConfig {
	for name in [
		"LocalWelcome.txt",
		"RemoteWelcome.txt",
		"LocalNotification.txt",
		"RemoteNotification.txt",
	] {
		std::fs::write(dir.join(name), "Subject: Hello {display_name}\n\nWelcome.\n").unwrap();
	}
	NotificationConfig {
		from_address: Some("helpdesk@example.edu".to_string()),
		smtp_server: Some("smtp.example.edu".to_string()),
		templates: TemplateSet::default().with_defaults(dir),
	}
}

fn provisioner(
	directory: &Arc<ScriptedDirectory>,
	sender: &Arc<RecordingSender>,
) -> Provisioner {
	Provisioner::new(directory.clone(), sender.clone())
}

#[tokio::test]
async fn local_without_notification_enables_mailbox() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::default());

	let request = ProvisioningRequest::local("jdoe").unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(result.provisioning_successful());
	assert_eq!(result.requested_location(), Some(MailboxLocation::Local));
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::User));
	assert_eq!(result.ending_state(), Some(RecipientTypeDetails::UserMailbox));
	assert_eq!(result.welcome_email_sent(), None);
	assert_eq!(result.notification_email_sent(), None);
	assert!(result.error().is_none());
	assert_eq!(directory.lookups(), 1);
	assert_eq!(directory.enables(), 1);
	assert_eq!(sender.attempts(), 0);
}

#[tokio::test]
async fn already_provisioned_is_idempotent() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::UserMailbox));
	let sender = Arc::new(RecordingSender::default());
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());

	let request = ProvisioningRequest::local("jdoe")
		.unwrap()
		.with_notification(&config, &FsTemplateStore)
		.unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(result.provisioning_successful());
	assert!(result.already_provisioned());
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::UserMailbox));
	assert_eq!(result.ending_state(), Some(RecipientTypeDetails::UserMailbox));
	assert_eq!(result.welcome_email_sent(), None);
	assert_eq!(directory.enables(), 0);
	assert_eq!(sender.attempts(), 0);
}

#[tokio::test]
async fn welcome_failure_does_not_fail_provisioning() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::failing(&[NotificationKind::Welcome]));
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());

	let request = ProvisioningRequest::local("jdoe")
		.unwrap()
		.with_notification(&config, &FsTemplateStore)
		.unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(result.provisioning_successful());
	assert_eq!(result.welcome_email_sent(), Some(false));
	assert_eq!(result.notification_email_sent(), Some(true));
	assert!(result.error().is_none());
	assert!(result.has_email_failure());
	assert_eq!(sender.attempts(), 2);
}

#[tokio::test]
async fn notifications_go_to_new_and_prior_addresses() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::default());
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());

	let request = ProvisioningRequest::local("jdoe")
		.unwrap()
		.with_notification(&config, &FsTemplateStore)
		.unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;
	assert_eq!(result.welcome_email_sent(), Some(true));
	assert_eq!(result.notification_email_sent(), Some(true));

	let sent = sender.sent();
	assert_eq!(sent.len(), 2);
	let welcome = sent.iter().find(|m| m.kind == NotificationKind::Welcome).unwrap();
	assert_eq!(welcome.to, addr("jdoe@example.edu"));
	assert_eq!(welcome.from, addr("helpdesk@example.edu"));
	assert_eq!(welcome.smtp_server.as_deref(), Some("smtp.example.edu"));
	assert_eq!(welcome.template.path(), dir.path().join("LocalWelcome.txt"));
	assert_eq!(welcome.context["display_name"], "Jane Doe");

	let notice = sent
		.iter()
		.find(|m| m.kind == NotificationKind::Notification)
		.unwrap();
	assert_eq!(notice.to, addr("jdoe@old.example.edu"));
	assert_eq!(
		notice.template.path(),
		dir.path().join("LocalNotification.txt")
	);
}

#[tokio::test]
async fn remote_without_external_address_touches_nothing() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::default());

	let result = provisioner(&directory, &sender)
		.provision_fields(
			RequestFields {
				identity: "jdoe".to_string(),
				remote: true,
				..Default::default()
			},
			&FsTemplateStore,
		)
		.await;

	assert!(!result.provisioning_successful());
	match result.error() {
		Some(ProvisioningError::Validation(e)) => {
			assert_eq!(e.field, RequestField::ExternalEmailAddress)
		}
		other => panic!("expected validation error, got {other:?}"),
	}
	assert!(result.identity().is_none());
	assert_eq!(directory.lookups(), 0);
	assert_eq!(directory.enables(), 0);
	assert_eq!(sender.attempts(), 0);
}

#[tokio::test]
async fn missing_template_fails_validation() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::default());
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());
	std::fs::remove_file(dir.path().join("RemoteNotification.txt")).unwrap();

	let result = provisioner(&directory, &sender)
		.provision_fields(
			RequestFields {
				identity: "jdoe".to_string(),
				remote: true,
				external_email_address: Some("jdoe@hosted.example".to_string()),
				send_notification: true,
				notification: config,
				..Default::default()
			},
			&FsTemplateStore,
		)
		.await;

	assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
	match result.error() {
		Some(ProvisioningError::Validation(e)) => {
			assert_eq!(e.field, RequestField::RemoteNotificationTemplate)
		}
		other => panic!("expected validation error, got {other:?}"),
	}
	assert_eq!(directory.lookups(), 0);
}

#[tokio::test]
async fn lookup_failure_stops_before_mutation() {
	let directory = Arc::new(
		ScriptedDirectory::new(RecipientTypeDetails::User)
			.with_lookup_error(LookupError::NotFound("ghost".to_string())),
	);
	let sender = Arc::new(RecordingSender::default());

	let request = ProvisioningRequest::local("ghost").unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(!result.provisioning_successful());
	assert_eq!(result.error_kind(), Some(ErrorKind::Lookup));
	assert!(result.identity().is_none());
	assert_eq!(result.ending_state(), None);
	assert_eq!(directory.enables(), 0);
}

#[tokio::test]
async fn mutation_failure_keeps_resolved_fields() {
	let directory = Arc::new(
		ScriptedDirectory::new(RecipientTypeDetails::User)
			.with_enable(Err(MutationError::Directory("server unavailable".to_string()))),
	);
	let sender = Arc::new(RecordingSender::default());
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());

	let request = ProvisioningRequest::local("jdoe")
		.unwrap()
		.with_notification(&config, &FsTemplateStore)
		.unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(!result.provisioning_successful());
	assert_eq!(result.error_kind(), Some(ErrorKind::Mutation));
	assert!(result.identity().is_some());
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::User));
	assert_eq!(result.ending_state(), None);
	assert_eq!(result.welcome_email_sent(), None);
	assert_eq!(sender.attempts(), 0);
}

#[tokio::test]
async fn mailbox_at_other_location_conflicts() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::RemoteMailbox));
	let sender = Arc::new(RecordingSender::default());

	let request = ProvisioningRequest::local("jdoe").unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(!result.provisioning_successful());
	assert_eq!(result.error_kind(), Some(ErrorKind::Conflict));
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::RemoteMailbox));
	assert_eq!(directory.enables(), 0);
}

#[tokio::test]
async fn dry_run_classifies_without_mutating() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::default());

	let request = ProvisioningRequest::local("jdoe").unwrap();
	let result = provisioner(&directory, &sender)
		.with_options(ProvisionerOptions { dry_run: true })
		.provision(&request)
		.await;

	assert!(result.provisioning_successful());
	assert!(result.dry_run());
	assert!(!result.already_provisioned());
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::User));
	assert_eq!(result.ending_state(), None);
	assert_eq!(directory.enables(), 0);
}

#[tokio::test]
async fn cancellation_before_start_skips_directory() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User));
	let sender = Arc::new(RecordingSender::default());
	let cancel = CancellationToken::new();
	cancel.cancel();

	let request = ProvisioningRequest::local("jdoe").unwrap();
	let result = provisioner(&directory, &sender)
		.provision_with_cancellation(&request, &cancel)
		.await;

	assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
	assert_eq!(directory.lookups(), 0);
	assert_eq!(directory.enables(), 0);
}

#[tokio::test]
async fn cancellation_during_lookup_stops_before_mutation() {
	let cancel = CancellationToken::new();
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User).cancelling(&cancel));
	let sender = Arc::new(RecordingSender::default());

	let request = ProvisioningRequest::local("jdoe").unwrap();
	let result = provisioner(&directory, &sender)
		.provision_with_cancellation(&request, &cancel)
		.await;

	assert!(!result.provisioning_successful());
	assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
	assert!(result.identity().is_some());
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::User));
	assert_eq!(result.ending_state(), None);
	assert_eq!(directory.lookups(), 1);
	assert_eq!(directory.enables(), 0);
}

#[tokio::test]
async fn no_known_address_records_both_sends_as_failed() {
	let directory = Arc::new(ScriptedDirectory::new(RecipientTypeDetails::User).without_addresses());
	let sender = Arc::new(RecordingSender::default());
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());

	let request = ProvisioningRequest::local("jdoe")
		.unwrap()
		.with_notification(&config, &FsTemplateStore)
		.unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(result.provisioning_successful());
	assert!(result.error().is_none());
	assert_eq!(result.ending_state(), Some(RecipientTypeDetails::UserMailbox));
	assert_eq!(result.welcome_email_sent(), Some(false));
	assert_eq!(result.notification_email_sent(), Some(false));
	assert_eq!(sender.attempts(), 0);
}

#[tokio::test]
async fn remote_welcome_falls_back_to_external_address() {
	let directory = Arc::new(
		ScriptedDirectory::new(RecipientTypeDetails::MailUser).with_enable(Ok(EnabledMailbox {
			recipient_type: RecipientTypeDetails::RemoteMailbox,
			primary_address: None,
			mail_contact: None,
		})),
	);
	let sender = Arc::new(RecordingSender::default());
	let dir = tempfile::tempdir().unwrap();
	let config = write_templates(dir.path());

	let request = ProvisioningRequest::remote("jdoe", "jdoe@hosted.example")
		.unwrap()
		.with_notification(&config, &FsTemplateStore)
		.unwrap();
	let result = provisioner(&directory, &sender).provision(&request).await;

	assert!(result.provisioning_successful());
	assert_eq!(result.welcome_email_sent(), Some(true));
	assert_eq!(result.notification_email_sent(), Some(true));

	let sent = sender.sent();
	let welcome = sent.iter().find(|m| m.kind == NotificationKind::Welcome).unwrap();
	assert_eq!(welcome.to, addr("jdoe@hosted.example"));
	assert_eq!(welcome.template.path(), dir.path().join("RemoteWelcome.txt"));
	let notice = sent
		.iter()
		.find(|m| m.kind == NotificationKind::Notification)
		.unwrap();
	assert_eq!(notice.to, addr("jdoe@old.example.edu"));
}

#[tokio::test]
async fn remote_mail_user_becomes_remote_mailbox() {
	let directory = Arc::new(MemoryDirectory::new());
	directory
		.insert_user(
			DirectoryUser::new("jdoe", OU).with_recipient_type(RecipientTypeDetails::MailUser),
		)
		.await;
	let provisioner = Provisioner::new(directory.clone(), Arc::new(RecordingSender::default()));

	let request = ProvisioningRequest::remote("jdoe", "jdoe@hosted.example").unwrap();
	let result = provisioner.provision(&request).await;

	assert!(result.provisioning_successful());
	assert_eq!(result.requested_location(), Some(MailboxLocation::Remote));
	assert_eq!(result.original_state(), Some(RecipientTypeDetails::MailUser));
	assert_eq!(result.ending_state(), Some(RecipientTypeDetails::RemoteMailbox));
	assert!(result.mail_contact().is_some());
	assert_eq!(result.welcome_email_sent(), None);
	assert_eq!(result.notification_email_sent(), None);

	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["original_state"], "MailUser");
	assert_eq!(json["ending_state"], "RemoteMailbox");
	assert!(json["welcome_email_sent"].is_null());
	assert!(json["error"].is_null());

	let again = provisioner.provision(&request).await;
	assert!(again.already_provisioned());
	assert_eq!(directory.mutation_count(), 1);
}
