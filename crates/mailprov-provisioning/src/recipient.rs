// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mailbox locations and recipient type classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a mailbox lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxLocation {
	/// On-premise mail server.
	Local,
	/// Hosted mail service.
	Remote,
}

impl MailboxLocation {
	pub fn as_str(&self) -> &'static str {
		match self {
			MailboxLocation::Local => "local",
			MailboxLocation::Remote => "remote",
		}
	}
}

impl fmt::Display for MailboxLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Mail capability of a directory object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecipientTypeDetails {
	/// Mail-disabled user.
	User,
	/// Mail-disabled user whose account is disabled.
	DisabledUser,
	/// User with an external address but no mailbox.
	MailUser,
	/// Contact object for an external address.
	MailContact,
	UserMailbox,
	LinkedMailbox,
	SharedMailbox,
	RemoteMailbox,
	RemoteSharedMailbox,
}

impl RecipientTypeDetails {
	/// Location of the mailbox this recipient already has, if any.
	pub fn mailbox_location(&self) -> Option<MailboxLocation> {
		match self {
			RecipientTypeDetails::UserMailbox
			| RecipientTypeDetails::LinkedMailbox
			| RecipientTypeDetails::SharedMailbox => Some(MailboxLocation::Local),
			RecipientTypeDetails::RemoteMailbox | RecipientTypeDetails::RemoteSharedMailbox => {
				Some(MailboxLocation::Remote)
			}
			RecipientTypeDetails::User
			| RecipientTypeDetails::DisabledUser
			| RecipientTypeDetails::MailUser
			| RecipientTypeDetails::MailContact => None,
		}
	}

	/// Whether a mailbox may be enabled on this recipient.
	pub fn is_provisionable(&self) -> bool {
		matches!(
			self,
			RecipientTypeDetails::User
				| RecipientTypeDetails::DisabledUser
				| RecipientTypeDetails::MailUser
		)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			RecipientTypeDetails::User => "User",
			RecipientTypeDetails::DisabledUser => "DisabledUser",
			RecipientTypeDetails::MailUser => "MailUser",
			RecipientTypeDetails::MailContact => "MailContact",
			RecipientTypeDetails::UserMailbox => "UserMailbox",
			RecipientTypeDetails::LinkedMailbox => "LinkedMailbox",
			RecipientTypeDetails::SharedMailbox => "SharedMailbox",
			RecipientTypeDetails::RemoteMailbox => "RemoteMailbox",
			RecipientTypeDetails::RemoteSharedMailbox => "RemoteSharedMailbox",
		}
	}
}

impl fmt::Display for RecipientTypeDetails {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
