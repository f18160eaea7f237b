// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The outcome record of one provisioning run.
//!
//! During a run the state machine owns a [`ResultBuilder`]; each field is
//! written at most once as stages complete. Reaching a terminal state
//! consumes the builder and yields a [`ProvisioningResult`], which exposes
//! read-only accessors and cannot be changed afterwards.

use serde::Serialize;
use tracing::warn;

use crate::directory::DirectoryObjectRef;
use crate::error::{ErrorKind, ProvisioningError};
use crate::recipient::{MailboxLocation, RecipientTypeDetails};

/// Sealed outcome of a provisioning run.
///
/// `None` in an optional field means the stage that sets it was never
/// reached. In particular `welcome_email_sent == None` means no send was
/// attempted, while `Some(false)` means the send failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningResult {
	requested_identity: String,
	identity: Option<DirectoryObjectRef>,
	requested_location: Option<MailboxLocation>,
	original_state: Option<RecipientTypeDetails>,
	ending_state: Option<RecipientTypeDetails>,
	mail_contact: Option<DirectoryObjectRef>,
	welcome_email_sent: Option<bool>,
	notification_email_sent: Option<bool>,
	provisioning_successful: bool,
	dry_run: bool,
	error: Option<ProvisioningError>,
}

impl ProvisioningResult {
	/// The identity string the caller asked for.
	pub fn requested_identity(&self) -> &str {
		&self.requested_identity
	}

	/// Directory object the identity resolved to.
	pub fn identity(&self) -> Option<&DirectoryObjectRef> {
		self.identity.as_ref()
	}

	pub fn requested_location(&self) -> Option<MailboxLocation> {
		self.requested_location
	}

	pub fn original_state(&self) -> Option<RecipientTypeDetails> {
		self.original_state
	}

	pub fn ending_state(&self) -> Option<RecipientTypeDetails> {
		self.ending_state
	}

	pub fn mail_contact(&self) -> Option<&DirectoryObjectRef> {
		self.mail_contact.as_ref()
	}

	pub fn welcome_email_sent(&self) -> Option<bool> {
		self.welcome_email_sent
	}

	pub fn notification_email_sent(&self) -> Option<bool> {
		self.notification_email_sent
	}

	/// Whether the mailbox is in place. Notification failures do not affect this.
	pub fn provisioning_successful(&self) -> bool {
		self.provisioning_successful
	}

	pub fn dry_run(&self) -> bool {
		self.dry_run
	}

	pub fn error(&self) -> Option<&ProvisioningError> {
		self.error.as_ref()
	}

	pub fn error_kind(&self) -> Option<ErrorKind> {
		self.error.as_ref().map(ProvisioningError::kind)
	}

	/// Succeeded without changing the directory because the mailbox already existed.
	pub fn already_provisioned(&self) -> bool {
		self.provisioning_successful
			&& !self.dry_run
			&& self.original_state.is_some()
			&& self.original_state == self.ending_state
	}

	/// Some attempted notification email was not sent.
	pub fn has_email_failure(&self) -> bool {
		self.welcome_email_sent == Some(false) || self.notification_email_sent == Some(false)
	}
}

/// Accumulates a [`ProvisioningResult`] during a run.
#[derive(Debug)]
pub(crate) struct ResultBuilder {
	requested_identity: String,
	identity: Option<DirectoryObjectRef>,
	requested_location: Option<MailboxLocation>,
	original_state: Option<RecipientTypeDetails>,
	ending_state: Option<RecipientTypeDetails>,
	mail_contact: Option<DirectoryObjectRef>,
	welcome_email_sent: Option<bool>,
	notification_email_sent: Option<bool>,
	dry_run: bool,
}

/// Fill `slot` unless a previous stage already did.
fn record<T: std::fmt::Debug>(slot: &mut Option<T>, field: &'static str, value: T) {
	if slot.is_some() {
		warn!(field, ?value, "result field already recorded, keeping first value");
		return;
	}
	*slot = Some(value);
}

impl ResultBuilder {
	pub(crate) fn new(requested_identity: impl Into<String>) -> Self {
		Self {
			requested_identity: requested_identity.into(),
			identity: None,
			requested_location: None,
			original_state: None,
			ending_state: None,
			mail_contact: None,
			welcome_email_sent: None,
			notification_email_sent: None,
			dry_run: false,
		}
	}

	pub(crate) fn requested_location(&mut self, location: MailboxLocation) {
		record(&mut self.requested_location, "requested_location", location);
	}

	pub(crate) fn identity(&mut self, object: DirectoryObjectRef) {
		record(&mut self.identity, "identity", object);
	}

	pub(crate) fn original_state(&mut self, state: RecipientTypeDetails) {
		record(&mut self.original_state, "original_state", state);
	}

	pub(crate) fn ending_state(&mut self, state: RecipientTypeDetails) {
		record(&mut self.ending_state, "ending_state", state);
	}

	pub(crate) fn mail_contact(&mut self, contact: DirectoryObjectRef) {
		record(&mut self.mail_contact, "mail_contact", contact);
	}

	pub(crate) fn welcome_email_sent(&mut self, sent: bool) {
		record(&mut self.welcome_email_sent, "welcome_email_sent", sent);
	}

	pub(crate) fn notification_email_sent(&mut self, sent: bool) {
		record(
			&mut self.notification_email_sent,
			"notification_email_sent",
			sent,
		);
	}

	pub(crate) fn dry_run(&mut self) {
		self.dry_run = true;
	}

	pub(crate) fn seal_success(self) -> ProvisioningResult {
		self.seal(true, None)
	}

	pub(crate) fn seal_failure(self, error: ProvisioningError) -> ProvisioningResult {
		self.seal(false, Some(error))
	}

	fn seal(self, provisioning_successful: bool, error: Option<ProvisioningError>) -> ProvisioningResult {
		ProvisioningResult {
			requested_identity: self.requested_identity,
			identity: self.identity,
			requested_location: self.requested_location,
			original_state: self.original_state,
			ending_state: self.ending_state,
			mail_contact: self.mail_contact,
			welcome_email_sent: self.welcome_email_sent,
			notification_email_sent: self.notification_email_sent,
			provisioning_successful,
			dry_run: self.dry_run,
			error,
		}
	}
}
