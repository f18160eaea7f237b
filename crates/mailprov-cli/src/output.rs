// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rendering batch results for stdout.

use std::fmt::Write as _;

use mailprov_provisioning::{BatchSummary, ProvisioningResult};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
	results: &'a [ProvisioningResult],
	summary: BatchSummary,
}

pub fn render_json(
	results: &[ProvisioningResult],
	summary: BatchSummary,
) -> serde_json::Result<String> {
	serde_json::to_string_pretty(&Report { results, summary })
}

pub fn render_text(results: &[ProvisioningResult], summary: BatchSummary) -> String {
	let mut out = String::new();
	for result in results {
		let _ = writeln!(out, "{}", result_line(result));
	}
	let _ = writeln!(
		out,
		"{} total: {} provisioned, {} already provisioned, {} would provision, {} failed, {} with email failures",
		summary.total,
		summary.provisioned,
		summary.already_provisioned,
		summary.would_provision,
		summary.failed,
		summary.email_failures,
	);
	out
}

fn result_line(result: &ProvisioningResult) -> String {
	let mut line = format!("{}: ", result.requested_identity());

	if let Some(error) = result.error() {
		if !result.provisioning_successful() {
			let _ = write!(line, "FAILED: {error}");
			return line;
		}
	}

	let location = result
		.requested_location()
		.map(|l| l.as_str())
		.unwrap_or("unknown");
	let original = state_name(result.original_state());

	if result.dry_run() {
		let _ = write!(line, "would provision {location} mailbox (currently {original})");
	} else if result.already_provisioned() {
		let _ = write!(line, "already has a {location} mailbox ({original})");
	} else {
		let _ = write!(
			line,
			"provisioned {location} mailbox ({original} -> {})",
			state_name(result.ending_state())
		);
	}

	if let Some(contact) = result.mail_contact() {
		let _ = write!(line, "; contact {}", contact.distinguished_name);
	}
	for (label, sent) in [
		("welcome email", result.welcome_email_sent()),
		("notification email", result.notification_email_sent()),
	] {
		match sent {
			Some(true) => {
				let _ = write!(line, "; {label} sent");
			}
			Some(false) => {
				let _ = write!(line, "; {label} FAILED");
			}
			None => {}
		}
	}
	line
}

fn state_name(state: Option<mailprov_provisioning::RecipientTypeDetails>) -> &'static str {
	state.map(|s| s.as_str()).unwrap_or("unknown")
}
