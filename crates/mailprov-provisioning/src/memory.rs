// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory directory backed by an optional JSON snapshot file.
//!
//! Identities resolve by account name, email address, distinguished name or
//! GUID (case-insensitive). Enabling a remote mailbox also creates a mail
//! contact for the external address.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::address::EmailAddress;
use crate::directory::{DirectoryAdapter, DirectoryEntry, DirectoryObjectRef, EnabledMailbox};
use crate::error::{LookupError, MutationError};
use crate::recipient::RecipientTypeDetails;
use crate::request::MailboxTarget;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
	pub guid: Uuid,
	pub account_name: String,
	pub distinguished_name: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub email_address: Option<EmailAddress>,
	pub recipient_type: RecipientTypeDetails,
	/// Routing address of a remote mailbox.
	#[serde(default)]
	pub external_address: Option<EmailAddress>,
}

impl DirectoryUser {
	/// A mail-disabled user under `ou`, with a fresh GUID.
	pub fn new(account_name: impl Into<String>, ou: &str) -> Self {
		let account_name = account_name.into();
		Self {
			guid: Uuid::new_v4(),
			distinguished_name: format!("CN={account_name},{ou}"),
			account_name,
			display_name: None,
			email_address: None,
			recipient_type: RecipientTypeDetails::User,
			external_address: None,
		}
	}

	pub fn with_recipient_type(mut self, recipient_type: RecipientTypeDetails) -> Self {
		self.recipient_type = recipient_type;
		self
	}

	pub fn with_email_address(mut self, address: EmailAddress) -> Self {
		self.email_address = Some(address);
		self
	}

	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());
		self
	}

	fn object_ref(&self) -> DirectoryObjectRef {
		DirectoryObjectRef {
			guid: self.guid,
			distinguished_name: self.distinguished_name.clone(),
		}
	}

	fn matches(&self, identity: &str) -> bool {
		self.account_name.eq_ignore_ascii_case(identity)
			|| self.distinguished_name.eq_ignore_ascii_case(identity)
			|| self.guid.to_string().eq_ignore_ascii_case(identity)
			|| self
				.email_address
				.as_ref()
				.is_some_and(|a| a.as_str().eq_ignore_ascii_case(identity))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailContact {
	pub guid: Uuid,
	pub distinguished_name: String,
	pub external_address: EmailAddress,
}

/// Serialised form of a [`MemoryDirectory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
	/// Domain used to build primary addresses (`account@domain`) for new mailboxes.
	#[serde(default)]
	pub mail_domain: Option<String>,
	#[serde(default)]
	pub users: Vec<DirectoryUser>,
	#[serde(default)]
	pub contacts: Vec<MailContact>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
	#[error("failed to access directory snapshot {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid directory snapshot {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
	state: RwLock<DirectorySnapshot>,
	mutations: AtomicUsize,
}

impl MemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
		Self {
			state: RwLock::new(snapshot),
			mutations: AtomicUsize::new(0),
		}
	}

	#[instrument(skip_all, fields(path = %path.as_ref().display()))]
	pub async fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path)
			.await
			.map_err(|source| SnapshotError::Io {
				path: path.to_path_buf(),
				source,
			})?;
		let snapshot: DirectorySnapshot =
			serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
				path: path.to_path_buf(),
				source,
			})?;
		debug!(users = snapshot.users.len(), "directory snapshot loaded");
		Ok(Self::from_snapshot(snapshot))
	}

	#[instrument(skip_all, fields(path = %path.as_ref().display()))]
	pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
		let path = path.as_ref();
		let snapshot = self.snapshot().await;
		let content = serde_json::to_string_pretty(&snapshot).map_err(|source| SnapshotError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		tokio::fs::write(path, content)
			.await
			.map_err(|source| SnapshotError::Io {
				path: path.to_path_buf(),
				source,
			})?;
		debug!(users = snapshot.users.len(), "directory snapshot saved");
		Ok(())
	}

	pub async fn snapshot(&self) -> DirectorySnapshot {
		self.state.read().await.clone()
	}

	pub async fn set_mail_domain(&self, domain: impl Into<String>) {
		self.state.write().await.mail_domain = Some(domain.into());
	}

	pub async fn insert_user(&self, user: DirectoryUser) -> DirectoryObjectRef {
		let object = user.object_ref();
		self.state.write().await.users.push(user);
		object
	}

	/// Number of successful mailbox enables performed.
	pub fn mutation_count(&self) -> usize {
		self.mutations.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl DirectoryAdapter for MemoryDirectory {
	#[instrument(name = "memory_directory_lookup", skip(self))]
	async fn lookup(&self, identity: &str) -> Result<DirectoryEntry, LookupError> {
		let state = self.state.read().await;
		let mut matches = state.users.iter().filter(|u| u.matches(identity));

		let user = matches
			.next()
			.ok_or_else(|| LookupError::NotFound(identity.to_string()))?;
		let extra = matches.count();
		if extra > 0 {
			return Err(LookupError::Ambiguous {
				identity: identity.to_string(),
				matches: extra + 1,
			});
		}

		Ok(DirectoryEntry {
			object: user.object_ref(),
			display_name: user.display_name.clone(),
			email_address: user.email_address.clone(),
			recipient_type: user.recipient_type,
		})
	}

	#[instrument(
		name = "memory_directory_enable_mailbox",
		skip(self, target),
		fields(object = %object, location = %target.location())
	)]
	async fn enable_mailbox(
		&self,
		object: &DirectoryObjectRef,
		target: &MailboxTarget,
	) -> Result<EnabledMailbox, MutationError> {
		let mut state = self.state.write().await;
		let mail_domain = state.mail_domain.clone();

		let user = state
			.users
			.iter_mut()
			.find(|u| u.guid == object.guid)
			.ok_or_else(|| MutationError::Directory(format!("{object} no longer exists")))?;

		if !user.recipient_type.is_provisionable() {
			return Err(MutationError::Rejected(format!(
				"{object} is a {} and cannot be mailbox-enabled",
				user.recipient_type
			)));
		}

		let primary_address = match &mail_domain {
			Some(domain) => Some(
				EmailAddress::parse(&format!("{}@{domain}", user.account_name))
					.map_err(|e| MutationError::Rejected(e.to_string()))?,
			),
			None => None,
		};

		let (recipient_type, contact) = match target {
			MailboxTarget::Local => (RecipientTypeDetails::UserMailbox, None),
			MailboxTarget::Remote { external_address } => {
				user.external_address = Some(external_address.clone());
				let parent = user
					.distinguished_name
					.split_once(',')
					.map(|(_, parent)| parent.to_string())
					.unwrap_or_default();
				let contact = MailContact {
					guid: Uuid::new_v4(),
					distinguished_name: format!("CN={} (external),{parent}", user.account_name),
					external_address: external_address.clone(),
				};
				(RecipientTypeDetails::RemoteMailbox, Some(contact))
			}
		};

		user.recipient_type = recipient_type;
		if primary_address.is_some() {
			user.email_address = primary_address.clone();
		}

		let mail_contact = contact.as_ref().map(|c| DirectoryObjectRef {
			guid: c.guid,
			distinguished_name: c.distinguished_name.clone(),
		});
		if let Some(contact) = contact {
			state.contacts.push(contact);
		}

		self.mutations.fetch_add(1, Ordering::SeqCst);
		Ok(EnabledMailbox {
			recipient_type,
			primary_address,
			mail_contact,
		})
	}
}
