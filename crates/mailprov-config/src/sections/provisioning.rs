// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfigLayer {
	pub concurrency: Option<usize>,
	pub dry_run: Option<bool>,
}

impl ProvisioningConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.concurrency.is_some() {
			self.concurrency = other.concurrency;
		}
		if other.dry_run.is_some() {
			self.dry_run = other.dry_run;
		}
	}

	pub fn finalize(self) -> ProvisioningConfig {
		ProvisioningConfig {
			concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
			dry_run: self.dry_run.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
	/// Maximum identities provisioned at once.
	pub concurrency: usize,
	pub dry_run: bool,
}

impl Default for ProvisioningConfig {
	fn default() -> Self {
		ProvisioningConfigLayer::default().finalize()
	}
}
