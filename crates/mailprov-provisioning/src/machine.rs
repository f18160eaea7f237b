// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provisioning state machine.
//!
//! Each call to [`Provisioner::provision`] drives one request from
//! `Created` to `Completed` or `Failed`, calling the directory at most twice
//! (one lookup, at most one mailbox enable) and the notification sender at
//! most twice. Notification failures are recorded on the result but never
//! turn a successful mailbox enable into a failed run.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::address::EmailAddress;
use crate::cancel::CancellationToken;
use crate::directory::{DirectoryAdapter, DirectoryEntry, EnabledMailbox};
use crate::error::{ProvisioningError, SendError};
use crate::notify::{EmailMessage, NotificationKind, NotificationSender};
use crate::request::{Notification, ProvisioningRequest, RequestFields};
use crate::result::{ProvisioningResult, ResultBuilder};
use crate::state::{Disposition, ProvisioningState};
use crate::template::{TemplateRef, TemplateStore};

/// Behaviour switches for a [`Provisioner`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionerOptions {
	/// Resolve and classify, but stop before enabling the mailbox.
	pub dry_run: bool,
}

/// Runs provisioning requests against a directory and a notification sender.
///
/// A `Provisioner` holds no per-run state and may be shared between tasks.
#[derive(Clone)]
pub struct Provisioner {
	directory: Arc<dyn DirectoryAdapter>,
	sender: Arc<dyn NotificationSender>,
	options: ProvisionerOptions,
}

impl Provisioner {
	pub fn new(directory: Arc<dyn DirectoryAdapter>, sender: Arc<dyn NotificationSender>) -> Self {
		Self {
			directory,
			sender,
			options: ProvisionerOptions::default(),
		}
	}

	pub fn with_options(mut self, options: ProvisionerOptions) -> Self {
		self.options = options;
		self
	}

	pub fn options(&self) -> ProvisionerOptions {
		self.options
	}

	/// Provision one validated request.
	pub async fn provision(&self, request: &ProvisioningRequest) -> ProvisioningResult {
		self
			.provision_with_cancellation(request, &CancellationToken::new())
			.await
	}

	/// Validate raw fields and provision them. A validation failure produces a
	/// failed result without contacting the directory or the mail server.
	pub async fn provision_fields(
		&self,
		fields: RequestFields,
		templates: &dyn TemplateStore,
	) -> ProvisioningResult {
		self
			.provision_fields_with_cancellation(fields, templates, &CancellationToken::new())
			.await
	}

	pub(crate) async fn provision_fields_with_cancellation(
		&self,
		fields: RequestFields,
		templates: &dyn TemplateStore,
		cancel: &CancellationToken,
	) -> ProvisioningResult {
		let identity = fields.identity.clone();
		match ProvisioningRequest::validate(fields, templates) {
			Ok(request) => self.provision_with_cancellation(&request, cancel).await,
			Err(e) => {
				warn!(identity = %identity, field = %e.field, error = %e, "request validation failed");
				ResultBuilder::new(identity).seal_failure(e.into())
			}
		}
	}

	/// Provision one request, stopping early if `cancel` fires before the
	/// directory is modified.
	#[instrument(
		name = "provision",
		skip(self, request, cancel),
		fields(identity = %request.identity(), location = %request.location(), dry_run = self.options.dry_run)
	)]
	pub async fn provision_with_cancellation(
		&self,
		request: &ProvisioningRequest,
		cancel: &CancellationToken,
	) -> ProvisioningResult {
		let mut run = Run {
			provisioner: self,
			request,
			cancel,
			result: ResultBuilder::new(request.identity()),
		};

		let mut state = ProvisioningState::Created;
		loop {
			let from = state.name();
			match run.advance(state).await {
				Ok(ProvisioningState::Completed) => {
					info!(from, to = "Completed", "state transition");
					return run.result.seal_success();
				}
				Ok(next) => {
					info!(from, to = next.name(), "state transition");
					state = next;
				}
				Err(e) => {
					warn!(from, to = "Failed", error = %e, kind = ?e.kind(), "state transition");
					return run.result.seal_failure(e);
				}
			}
		}
	}
}

/// Per-run state: the request and the result being built.
struct Run<'a> {
	provisioner: &'a Provisioner,
	request: &'a ProvisioningRequest,
	cancel: &'a CancellationToken,
	result: ResultBuilder,
}

impl Run<'_> {
	/// Perform the work of `state` and return the state that follows it.
	async fn advance(
		&mut self,
		state: ProvisioningState,
	) -> Result<ProvisioningState, ProvisioningError> {
		if state.is_cancellable() && self.cancel.is_cancelled() {
			return Err(ProvisioningError::Cancelled { stage: state.name() });
		}

		let request = self.request;

		match state {
			ProvisioningState::Created => {
				self.result.requested_location(request.location());
				Ok(ProvisioningState::Resolving)
			}

			ProvisioningState::Resolving => self.resolve().await,

			ProvisioningState::Resolved {
				entry,
				disposition: Disposition::AlreadyProvisioned,
			} => {
				info!(
					object = %entry.object,
					recipient_type = %entry.recipient_type,
					"mailbox already provisioned, nothing to do"
				);
				self.result.ending_state(entry.recipient_type);
				Ok(ProvisioningState::Completed)
			}

			ProvisioningState::Resolved {
				entry,
				disposition: Disposition::NotProvisioned,
			} => {
				if self.provisioner.options.dry_run {
					info!(
						object = %entry.object,
						recipient_type = %entry.recipient_type,
						"dry run, mailbox would be enabled"
					);
					self.result.dry_run();
					return Ok(ProvisioningState::Completed);
				}
				Ok(ProvisioningState::Mutating { entry })
			}

			ProvisioningState::Mutating { entry } => {
				let mailbox = self.enable_mailbox(&entry).await?;
				Ok(ProvisioningState::Mutated { entry, mailbox })
			}

			ProvisioningState::Mutated { entry, mailbox } => {
				if request.sends_notification() {
					Ok(ProvisioningState::Notifying { entry, mailbox })
				} else {
					Ok(ProvisioningState::Completed)
				}
			}

			ProvisioningState::Notifying { entry, mailbox } => {
				if let Some(notification) = request.notification() {
					self.notify(notification, &entry, &mailbox).await;
				}
				Ok(ProvisioningState::Completed)
			}

			terminal @ (ProvisioningState::Completed | ProvisioningState::Failed) => Ok(terminal),
		}
	}

	async fn resolve(&mut self) -> Result<ProvisioningState, ProvisioningError> {
		let request = self.request;
		let identity = request.identity();
		let entry = self.provisioner.directory.lookup(identity).await?;

		debug!(
			object = %entry.object,
			recipient_type = %entry.recipient_type,
			"identity resolved"
		);
		self.result.identity(entry.object.clone());
		self.result.original_state(entry.recipient_type);

		let requested = request.location();
		let disposition = match entry.recipient_type.mailbox_location() {
			Some(existing) if existing == requested => Disposition::AlreadyProvisioned,
			_ if entry.recipient_type.is_provisionable() => Disposition::NotProvisioned,
			_ => {
				return Err(ProvisioningError::Conflict {
					identity: identity.to_string(),
					current: entry.recipient_type,
					requested,
				})
			}
		};

		Ok(ProvisioningState::Resolved { entry, disposition })
	}

	async fn enable_mailbox(
		&mut self,
		entry: &DirectoryEntry,
	) -> Result<EnabledMailbox, ProvisioningError> {
		let mailbox = self
			.provisioner
			.directory
			.enable_mailbox(&entry.object, self.request.target())
			.await?;

		info!(
			object = %entry.object,
			recipient_type = %mailbox.recipient_type,
			mail_contact = mailbox.mail_contact.is_some(),
			"mailbox enabled"
		);
		self.result.ending_state(mailbox.recipient_type);
		if let Some(contact) = &mailbox.mail_contact {
			self.result.mail_contact(contact.clone());
		}
		Ok(mailbox)
	}

	/// Send the welcome and notification emails independently.
	async fn notify(
		&mut self,
		notification: &Notification,
		entry: &DirectoryEntry,
		mailbox: &EnabledMailbox,
	) {
		let request = self.request;
		let mailbox_address = mailbox
			.primary_address
			.as_ref()
			.or_else(|| request.target().external_address());
		let prior_address = entry.email_address.as_ref().or(mailbox_address);

		let context = template_context(request, entry, mailbox_address);

		let welcome = self
			.send(
				NotificationKind::Welcome,
				&notification.welcome_template,
				notification,
				mailbox_address,
				&context,
			)
			.await;
		self.result.welcome_email_sent(welcome);

		let notice = self
			.send(
				NotificationKind::Notification,
				&notification.notification_template,
				notification,
				prior_address,
				&context,
			)
			.await;
		self.result.notification_email_sent(notice);
	}

	async fn send(
		&self,
		kind: NotificationKind,
		template: &TemplateRef,
		notification: &Notification,
		to: Option<&EmailAddress>,
		context: &BTreeMap<String, String>,
	) -> bool {
		let outcome = match to {
			Some(to) => {
				let message = EmailMessage {
					kind,
					template: template.clone(),
					from: notification.from.clone(),
					to: to.clone(),
					smtp_server: notification.smtp_server.clone(),
					context: context.clone(),
				};
				self.provisioner.sender.send(&message).await
			}
			None => Err(SendError::NoRecipient(self.request.identity().to_string())),
		};

		match outcome {
			Ok(()) => {
				info!(%kind, %template, "notification email sent");
				true
			}
			Err(e) => {
				warn!(%kind, %template, error = %e, "notification email failed");
				false
			}
		}
	}
}

fn template_context(
	request: &ProvisioningRequest,
	entry: &DirectoryEntry,
	mailbox_address: Option<&EmailAddress>,
) -> BTreeMap<String, String> {
	let mut context = BTreeMap::new();
	context.insert("identity".to_string(), request.identity().to_string());
	context.insert(
		"display_name".to_string(),
		entry
			.display_name
			.clone()
			.unwrap_or_else(|| request.identity().to_string()),
	);
	context.insert(
		"distinguished_name".to_string(),
		entry.object.distinguished_name.clone(),
	);
	context.insert(
		"email_address".to_string(),
		mailbox_address.map(ToString::to_string).unwrap_or_default(),
	);
	context.insert("location".to_string(), request.location().to_string());
	if let Some(external) = request.target().external_address() {
		context.insert("external_address".to_string(), external.to_string());
	}
	context
}
