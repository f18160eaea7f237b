// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain-text email templates.
//!
//! A template file is an optional `Subject:` line, a blank line, and the
//! body. `{name}` placeholders in the subject and body are replaced from the
//! render context; unknown placeholders are left as written.

use std::collections::BTreeMap;

const SUBJECT_PREFIX: &str = "subject:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
	subject: Option<String>,
	body: String,
}

/// A template rendered for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
	pub subject: String,
	pub text: String,
	pub html: String,
}

impl EmailTemplate {
	pub fn parse(source: &str) -> Self {
		let source = source.replace("\r\n", "\n");
		let source = source.strip_prefix('\u{feff}').unwrap_or(&source);

		let (first, rest) = source.split_once('\n').unwrap_or((source, ""));
		let subject = first
			.get(..SUBJECT_PREFIX.len())
			.filter(|prefix| prefix.eq_ignore_ascii_case(SUBJECT_PREFIX))
			.map(|_| first[SUBJECT_PREFIX.len()..].trim().to_string());

		let body = match subject {
			Some(_) => rest.strip_prefix('\n').unwrap_or(rest),
			None => source,
		};

		Self {
			subject: subject.filter(|s| !s.is_empty()),
			body: body.to_string(),
		}
	}

	pub fn subject(&self) -> Option<&str> {
		self.subject.as_deref()
	}

	pub fn body(&self) -> &str {
		&self.body
	}

	/// Substitute `context` into the template. `default_subject` is used when
	/// the template has no `Subject:` line.
	pub fn render(&self, context: &BTreeMap<String, String>, default_subject: &str) -> RenderedEmail {
		let subject = substitute(self.subject.as_deref().unwrap_or(default_subject), context);
		let text = substitute(&self.body, context);
		let html = format!(
			"<html><body><pre style=\"font-family: sans-serif; white-space: pre-wrap;\">{}</pre></body></html>",
			escape_html(&text)
		);
		RenderedEmail {
			subject: subject.lines().next().unwrap_or_default().to_string(),
			text,
			html,
		}
	}
}

/// Replace known `{name}` placeholders in one left-to-right pass. Substituted
/// values are never scanned again.
fn substitute(template: &str, context: &BTreeMap<String, String>) -> String {
	let mut result = String::with_capacity(template.len());
	let mut rest = template;
	while let Some(start) = rest.find('{') {
		result.push_str(&rest[..start]);
		let after = &rest[start + 1..];
		let known = after
			.find('}')
			.and_then(|end| context.get(&after[..end]).map(|value| (value, end)));
		match known {
			Some((value, end)) => {
				result.push_str(value);
				rest = &after[end + 1..];
			}
			None => {
				result.push('{');
				rest = after;
			}
		}
	}
	result.push_str(rest);
	result
}

pub fn escape_html(input: &str) -> String {
	let mut escaped = String::with_capacity(input.len());
	for c in input.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(c),
		}
	}
	escaped
}
