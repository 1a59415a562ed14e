// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// System configuration, fixed at system creation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{LogLevel, SystemOptions};

/// Port used when neither the config file nor the command line names one.
pub const DEFAULT_PORT: u16 = 8000;

/// Settings a printer application starts its system with.
///
/// Missing keys in a config file fall back to [`SystemConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Human-readable system name, also used in the "Server:" header.
    pub name: String,
    /// Hostname override; `None` derives one from the environment.
    pub hostname: Option<String>,
    /// TCP port for the IPP/HTTP listeners (0 lets the OS choose).
    pub port: u16,
    /// DNS-SD service subtypes, comma separated.
    pub subtypes: Option<String>,
    /// Directory for spooled job files; `None` uses the temp dir.
    pub spool_dir: Option<PathBuf>,
    /// Log file path; `None` logs to stderr.
    pub log_file: Option<PathBuf>,
    /// Initial log level.
    pub log_level: LogLevel,
    /// PAM-style authentication service name.
    pub auth_service: Option<String>,
    /// Only accept TLS connections.
    pub tls_only: bool,
    /// Feature switches.
    pub options: SystemOptions,
    /// Group whose members may administer the system.
    pub admin_group: Option<String>,
    /// Hostname or address to listen on; `None` listens on all interfaces.
    pub listen_hostname: Option<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "Printhost".into(),
            hostname: None,
            port: DEFAULT_PORT,
            subtypes: Some("_print".into()),
            spool_dir: None,
            log_file: None,
            log_level: LogLevel::Unspec,
            auth_service: None,
            tls_only: false,
            options: SystemOptions::MULTI_QUEUE | SystemOptions::STANDARD,
            admin_group: None,
            listen_hostname: None,
        }
    }
}

impl SystemConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// The spool directory, defaulting to the OS temp dir.
    pub fn effective_spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
