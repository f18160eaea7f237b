// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! States of a single provisioning run.
//!
//! ```text
//! Created -> Resolving -> Resolved -> Mutating -> Mutated -> Notifying -> Completed
//!                            |                       |
//!                            +--(already provisioned)+--(no notification)--> Completed
//!
//! any non-terminal state --(error)--> Failed
//! ```

use crate::directory::{DirectoryEntry, EnabledMailbox};

/// Whether the resolved user still needs a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
	NotProvisioned,
	AlreadyProvisioned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
	Created,
	Resolving,
	Resolved {
		entry: DirectoryEntry,
		disposition: Disposition,
	},
	Mutating {
		entry: DirectoryEntry,
	},
	Mutated {
		entry: DirectoryEntry,
		mailbox: EnabledMailbox,
	},
	Notifying {
		entry: DirectoryEntry,
		mailbox: EnabledMailbox,
	},
	Completed,
	Failed,
}

impl ProvisioningState {
	pub fn name(&self) -> &'static str {
		match self {
			ProvisioningState::Created => "Created",
			ProvisioningState::Resolving => "Resolving",
			ProvisioningState::Resolved {
				disposition: Disposition::NotProvisioned,
				..
			} => "Resolved(NotProvisioned)",
			ProvisioningState::Resolved {
				disposition: Disposition::AlreadyProvisioned,
				..
			} => "Resolved(AlreadyProvisioned)",
			ProvisioningState::Mutating { .. } => "Mutating",
			ProvisioningState::Mutated { .. } => "Mutated",
			ProvisioningState::Notifying { .. } => "Notifying",
			ProvisioningState::Completed => "Completed",
			ProvisioningState::Failed => "Failed",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			ProvisioningState::Completed | ProvisioningState::Failed
		)
	}

	/// Cancellation is honoured only in states that precede a directory write.
	pub fn is_cancellable(&self) -> bool {
		matches!(
			self,
			ProvisioningState::Created
				| ProvisioningState::Resolving
				| ProvisioningState::Resolved {
					disposition: Disposition::NotProvisioned,
					..
				}
		)
	}
}
