// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod directory;
pub mod logging;
pub mod notification;
pub mod provisioning;
pub mod smtp;

pub use directory::{DirectoryConfig, DirectoryConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use notification::{NotificationConfig, NotificationConfigLayer};
pub use provisioning::{ProvisioningConfig, ProvisioningConfigLayer, DEFAULT_CONCURRENCY};
pub use smtp::{SmtpConfig, SmtpConfigLayer};
