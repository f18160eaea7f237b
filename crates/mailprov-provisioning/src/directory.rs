// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The directory service seen by the provisioning state machine.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::EmailAddress;
use crate::error::{LookupError, MutationError};
use crate::recipient::RecipientTypeDetails;
use crate::request::MailboxTarget;

/// Stable reference to a directory object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryObjectRef {
	pub guid: Uuid,
	pub distinguished_name: String,
}

impl fmt::Display for DirectoryObjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.distinguished_name)
	}
}

/// A user as returned by [`DirectoryAdapter::lookup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
	pub object: DirectoryObjectRef,
	pub display_name: Option<String>,
	/// Address the user currently receives mail at, if any.
	pub email_address: Option<EmailAddress>,
	pub recipient_type: RecipientTypeDetails,
}

/// Outcome of a successful mailbox enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledMailbox {
	pub recipient_type: RecipientTypeDetails,
	pub primary_address: Option<EmailAddress>,
	/// Mail contact created alongside the mailbox, if the directory made one.
	pub mail_contact: Option<DirectoryObjectRef>,
}

/// Directory operations the provisioning workflow depends on.
///
/// Implementations must be safe to share between concurrent provisioning
/// runs; pooling or serialising access is their concern.
#[async_trait]
pub trait DirectoryAdapter: Send + Sync {
	/// Resolve an identity to a single directory user.
	async fn lookup(&self, identity: &str) -> Result<DirectoryEntry, LookupError>;

	/// Enable a mailbox for `object` at the target location.
	///
	/// Called at most once per provisioning run. Atomicity of the change is
	/// the adapter's responsibility; callers never roll back.
	async fn enable_mailbox(
		&self,
		object: &DirectoryObjectRef,
		target: &MailboxTarget,
	) -> Result<EnabledMailbox, MutationError>;
}
