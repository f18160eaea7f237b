// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mailbox provisioning for directory users.
//!
//! A [`ProvisioningRequest`] names an existing directory user and asks for
//! either a local (on-premises) mailbox or a remote (hosted) one routed to
//! an external address. A [`Provisioner`] resolves the user, enables the
//! mailbox unless it already exists, optionally sends welcome and
//! notification emails, and reports everything in a [`ProvisioningResult`].

pub mod address;
pub mod batch;
pub mod cancel;
pub mod directory;
pub mod error;
pub mod machine;
pub mod memory;
pub mod notify;
pub mod recipient;
pub mod request;
pub mod result;
pub mod state;
pub mod template;

pub use address::{AddressParseError, EmailAddress};
pub use batch::BatchSummary;
pub use cancel::CancellationToken;
pub use directory::{DirectoryAdapter, DirectoryEntry, DirectoryObjectRef, EnabledMailbox};
pub use error::{
	ErrorKind, LookupError, MutationError, ProvisioningError, RequestField, SendError,
	ValidationError,
};
pub use machine::{Provisioner, ProvisionerOptions};
pub use memory::{DirectorySnapshot, DirectoryUser, MailContact, MemoryDirectory, SnapshotError};
pub use notify::{DisabledSender, EmailMessage, NotificationKind, NotificationSender};
pub use recipient::{MailboxLocation, RecipientTypeDetails};
pub use request::{
	MailboxTarget, Notification, NotificationConfig, ProvisioningRequest, RequestFields,
};
pub use result::ProvisioningResult;
pub use state::{Disposition, ProvisioningState};
pub use template::{FsTemplateStore, TemplateRef, TemplateSet, TemplateStore};
