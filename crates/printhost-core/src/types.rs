// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Printhost printer application framework.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Feature switches chosen by the printer application at system creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SystemOptions: u32 {
        /// Support multiple printers.
        const MULTI_QUEUE = 0x0001;
        /// Include the standard web pages.
        const STANDARD = 0x0002;
        /// Allow remote queue management (vs. localhost only).
        const REMOTE_ADMIN = 0x0004;
        /// Include network settings page.
        const NETWORK = 0x0008;
        /// Include user/password settings page.
        const SECURITY = 0x0010;
        /// Include TLS settings page.
        const TLS = 0x0020;
        /// Include link to log file.
        const LOG = 0x0040;
        /// Use hostname in DNS-SD service names instead of serial number/UUID.
        const DNSSD_HOST = 0x0080;
        /// Accept jobs via raw sockets.
        const RAW_SOCKET = 0x0100;
    }
}

impl Default for SystemOptions {
    fn default() -> Self {
        Self::empty()
    }
}

/// Log verbosity for the system log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Not specified -- use the environment or the built-in default.
    #[default]
    Unspec,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// The `tracing_subscriber::EnvFilter` directive matching this level.
    ///
    /// `Fatal` has no tracing counterpart and maps to `error`; fatal events
    /// carry a `fatal = true` field instead.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Unspec | Self::Info => "info",
            Self::Debug => "debug",
            Self::Warn => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unspec => "unspec",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fatal" => Ok(Self::Fatal),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(format!("bad log-level value '{other}'")),
        }
    }
}

/// The "system-contact" record.
///
/// Always copied as a unit so readers never see a mix of old and new fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub telephone: String,
}

impl Contact {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        telephone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            telephone: telephone.into(),
        }
    }
}

/// One firmware/software component reported through the
/// `xxx-firmware-*` attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// "xxx-firmware-name" value.
    pub name: String,
    /// "xxx-firmware-patches" value (empty when unknown).
    pub patches: String,
    /// "xxx-firmware-string-version" value.
    pub sversion: String,
    /// "xxx-firmware-version" value.
    pub version: [u16; 4],
}

impl FirmwareVersion {
    /// Build a component whose binary version is parsed from `sversion`.
    pub fn new(
        name: impl Into<String>,
        patches: impl Into<String>,
        sversion: impl Into<String>,
    ) -> Self {
        let sversion = sversion.into();
        let version = parse_version_tuple(&sversion);
        Self {
            name: name.into(),
            patches: patches.into(),
            sversion,
            version,
        }
    }
}

/// Parse a "major.minor.patch" string into the 4×16-bit version tuple.
///
/// Parsing stops at the first field that does not start with a digit, or
/// right after a field with trailing text ("1.0 build 42" gives `[1, 0, 0, 0]`).
/// The fourth field is always zero.
pub fn parse_version_tuple(s: &str) -> [u16; 4] {
    let mut version = [0u16; 4];

    for (slot, part) in version.iter_mut().take(3).zip(s.split('.')) {
        let digits: &str = {
            let end = part
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(part.len());
            &part[..end]
        };

        if digits.is_empty() {
            break;
        }

        *slot = digits.parse().unwrap_or(u16::MAX);

        if digits.len() != part.len() {
            break;
        }
    }

    version
}

/// A print driver the application offers ("drivers" sub-command, web UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub description: String,
}

impl DriverInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Which attribute group a version export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeScope {
    Printer,
    System,
}

impl AttributeScope {
    /// Attribute name prefix ("printer" or "system").
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Printer => "printer",
            Self::System => "system",
        }
    }
}
