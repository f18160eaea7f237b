// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A syntactically valid bare email address (`local@domain`).
///
/// Display-name forms such as `Jane <jane@example.com>` are rejected; the
/// directory stores bare addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' is not a valid email address: {reason}")]
pub struct AddressParseError {
	pub input: String,
	pub reason: String,
}

impl EmailAddress {
	pub fn parse(input: &str) -> Result<Self, AddressParseError> {
		let trimmed = input.trim();
		trimmed
			.parse::<lettre::Address>()
			.map(|addr| EmailAddress(addr.to_string()))
			.map_err(|e| AddressParseError {
				input: input.to_string(),
				reason: e.to_string(),
			})
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn domain(&self) -> &str {
		self.0.rsplit_once('@').map(|(_, d)| d).unwrap_or_default()
	}
}

impl FromStr for EmailAddress {
	type Err = AddressParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EmailAddress::parse(s)
	}
}

impl fmt::Display for EmailAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Serialize for EmailAddress {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for EmailAddress {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		EmailAddress::parse(&raw).map_err(serde::de::Error::custom)
	}
}
