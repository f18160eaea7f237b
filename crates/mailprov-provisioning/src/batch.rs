// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning many identities with bounded concurrency.
//!
//! Results are returned in input order regardless of completion order. One
//! failed identity never stops the others.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument};

use crate::cancel::CancellationToken;
use crate::machine::Provisioner;
use crate::request::{ProvisioningRequest, RequestFields};
use crate::result::ProvisioningResult;
use crate::template::TemplateStore;

impl Provisioner {
	/// Provision validated requests, at most `concurrency` at a time.
	pub async fn provision_all(
		&self,
		requests: &[ProvisioningRequest],
		concurrency: usize,
	) -> Vec<ProvisioningResult> {
		self
			.provision_all_with_cancellation(requests, concurrency, &CancellationToken::new())
			.await
	}

	#[instrument(skip(self, requests, cancel), fields(count = requests.len()))]
	pub async fn provision_all_with_cancellation(
		&self,
		requests: &[ProvisioningRequest],
		concurrency: usize,
		cancel: &CancellationToken,
	) -> Vec<ProvisioningResult> {
		let results: Vec<ProvisioningResult> = stream::iter(requests)
			.map(|request| self.provision_with_cancellation(request, cancel))
			.buffered(concurrency.max(1))
			.collect()
			.await;

		let summary = BatchSummary::from_results(&results);
		info!(
			total = summary.total,
			provisioned = summary.provisioned,
			already_provisioned = summary.already_provisioned,
			failed = summary.failed,
			"batch finished"
		);
		results
	}

	/// Validate and provision raw field sets, at most `concurrency` at a time.
	pub async fn provision_all_fields(
		&self,
		fields: Vec<RequestFields>,
		templates: &dyn TemplateStore,
		concurrency: usize,
	) -> Vec<ProvisioningResult> {
		self
			.provision_all_fields_with_cancellation(
				fields,
				templates,
				concurrency,
				&CancellationToken::new(),
			)
			.await
	}

	#[instrument(skip_all, fields(count = fields.len()))]
	pub async fn provision_all_fields_with_cancellation(
		&self,
		fields: Vec<RequestFields>,
		templates: &dyn TemplateStore,
		concurrency: usize,
		cancel: &CancellationToken,
	) -> Vec<ProvisioningResult> {
		let results: Vec<ProvisioningResult> = stream::iter(fields)
			.map(|f| self.provision_fields_with_cancellation(f, templates, cancel))
			.buffered(concurrency.max(1))
			.collect()
			.await;

		let summary = BatchSummary::from_results(&results);
		info!(
			total = summary.total,
			provisioned = summary.provisioned,
			already_provisioned = summary.already_provisioned,
			failed = summary.failed,
			"batch finished"
		);
		results
	}
}

/// Counts over a batch of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
	pub total: usize,
	/// Mailboxes enabled by this batch.
	pub provisioned: usize,
	pub already_provisioned: usize,
	/// Dry-run results that would have enabled a mailbox.
	pub would_provision: usize,
	pub failed: usize,
	/// Results with at least one notification email that was not sent.
	pub email_failures: usize,
}

impl BatchSummary {
	pub fn from_results(results: &[ProvisioningResult]) -> Self {
		let mut summary = BatchSummary {
			total: results.len(),
			..Default::default()
		};
		for result in results {
			if !result.provisioning_successful() {
				summary.failed += 1;
			} else if result.dry_run() {
				summary.would_provision += 1;
			} else if result.already_provisioned() {
				summary.already_provisioned += 1;
			} else {
				summary.provisioned += 1;
			}
			if result.has_email_failure() {
				summary.email_failures += 1;
			}
		}
		summary
	}

	pub fn all_succeeded(&self) -> bool {
		self.failed == 0
	}
}
