// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Point-in-time copy of every persisted system attribute.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printhost_core::error::Result;
use printhost_core::types::{Contact, FirmwareVersion, LogLevel, SystemOptions};

/// Serializable copy of the system's configuration, taken under one read
/// lock so it is internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub name: String,
    pub uuid: String,
    pub hostname: Option<String>,
    pub location: Option<String>,
    pub geo_location: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub contact: Contact,
    pub admin_group: Option<String>,
    pub default_print_group: Option<String>,
    pub dns_sd_name: Option<String>,
    pub footer_html: Option<String>,
    pub log_level: LogLevel,
    pub max_log_size: usize,
    pub password_hash: Option<String>,
    pub tls_only: bool,
    pub options: SystemOptions,
    pub next_printer_id: i32,
    pub default_printer_id: i32,
    pub versions: Vec<FirmwareVersion>,
    pub config_changes: u64,
    pub config_time: DateTime<Utc>,
}

impl SystemSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
