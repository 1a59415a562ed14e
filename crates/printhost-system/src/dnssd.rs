// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DNS-SD advertisement of the system service.
//
// The system only needs "register this description" and "withdraw it"; the
// mDNS responder itself lives behind `DnsSdRegistrar`. With the `dnssd`
// feature the default registrar is `MdnsRegistrar` (mdns-sd).

use printhost_core::error::Result;

/// Service type for IPP System Service advertisements.
pub const SYSTEM_SERVICE_TYPE: &str = "_ipps-system._tcp.local.";

/// What gets advertised for the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSdService {
    /// Service instance name.
    pub instance_name: String,
    /// Host name without trailing dot.
    pub hostname: String,
    pub port: u16,
    /// System UUID ("urn:uuid:..." form).
    pub uuid: String,
    pub location: Option<String>,
    /// Comma-separated service subtypes, e.g. "_print,_universal".
    pub subtypes: Option<String>,
}

impl DnsSdService {
    /// TXT record key/value pairs.
    pub fn txt_records(&self) -> Vec<(&'static str, String)> {
        let mut txt = vec![
            ("txtvers", "1".to_owned()),
            ("UUID", self.uuid.trim_start_matches("urn:uuid:").to_owned()),
            ("adminurl", format!("https://{}:{}/", self.hostname, self.port)),
        ];
        if let Some(location) = &self.location {
            txt.push(("note", location.clone()));
        }
        txt
    }

    /// Subtype labels, trimmed, with empty entries dropped.
    pub fn subtype_list(&self) -> Vec<&str> {
        self.subtypes
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Service type to register under. mdns-sd carries one subtype per
    /// registration, so only the first listed subtype is advertised.
    pub fn service_type(&self) -> String {
        match self.subtype_list().first() {
            Some(sub) => format!("{sub}._sub.{SYSTEM_SERVICE_TYPE}"),
            None => SYSTEM_SERVICE_TYPE.to_owned(),
        }
    }
}

/// Publishes and withdraws the system's DNS-SD record.
pub trait DnsSdRegistrar: Send + Sync {
    /// Publish `service`, replacing any previous registration.
    fn register(&self, service: &DnsSdService) -> Result<()>;
    /// Withdraw the current registration, if any.
    fn unregister(&self);
}

/// Registrar that advertises nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistrar;

impl DnsSdRegistrar for NoopRegistrar {
    fn register(&self, _service: &DnsSdService) -> Result<()> {
        Ok(())
    }

    fn unregister(&self) {}
}

#[cfg(feature = "dnssd")]
pub use mdns::MdnsRegistrar;

#[cfg(feature = "dnssd")]
mod mdns {
    use parking_lot::Mutex;
    use printhost_core::error::{PrinthostError, Result};
    use tracing::{info, warn};

    use super::{DnsSdRegistrar, DnsSdService};

    /// mDNS responder backed by an in-process `mdns_sd::ServiceDaemon`.
    ///
    /// The daemon is started on first registration.
    #[derive(Default)]
    pub struct MdnsRegistrar {
        daemon: Mutex<Option<mdns_sd::ServiceDaemon>>,
        fullname: Mutex<Option<String>>,
    }

    impl MdnsRegistrar {
        pub fn new() -> Self {
            Self::default()
        }

        fn withdraw(&self, daemon: &mdns_sd::ServiceDaemon) {
            if let Some(fullname) = self.fullname.lock().take() {
                match daemon.unregister(&fullname) {
                    Ok(_) => info!(name = %fullname, "mDNS service unregistered"),
                    Err(e) => warn!(error = %e, "failed to unregister mDNS service"),
                }
            }
        }
    }

    impl DnsSdRegistrar for MdnsRegistrar {
        fn register(&self, service: &DnsSdService) -> Result<()> {
            let mut daemon_slot = self.daemon.lock();
            if daemon_slot.is_none() {
                let daemon = mdns_sd::ServiceDaemon::new()
                    .map_err(|e| PrinthostError::DnsSd(format!("daemon start: {e}")))?;
                *daemon_slot = Some(daemon);
            }
            let Some(daemon) = daemon_slot.as_ref() else {
                return Ok(());
            };

            self.withdraw(daemon);

            let txt = service.txt_records();
            let properties: Vec<(&str, &str)> = txt.iter().map(|(k, v)| (*k, v.as_str())).collect();
            let host = format!("{}.", service.hostname.trim_end_matches('.'));
            let service_type = service.service_type();

            let info = mdns_sd::ServiceInfo::new(
                &service_type,
                &service.instance_name,
                &host,
                "", // empty = auto-detect IP
                service.port,
                &properties[..],
            )
            .map_err(|e| PrinthostError::DnsSd(format!("service info: {e}")))?
            .enable_addr_auto();

            let fullname = info.get_fullname().to_owned();
            daemon
                .register(info)
                .map_err(|e| PrinthostError::DnsSd(format!("register: {e}")))?;

            info!(
                service_type = %service_type,
                name = %service.instance_name,
                port = service.port,
                "mDNS service registered"
            );
            *self.fullname.lock() = Some(fullname);
            Ok(())
        }

        fn unregister(&self) {
            if let Some(daemon) = self.daemon.lock().as_ref() {
                self.withdraw(daemon);
            }
        }
    }

    impl Drop for MdnsRegistrar {
        fn drop(&mut self) {
            if let Some(daemon) = self.daemon.get_mut().take() {
                self.withdraw(&daemon);
                if let Err(e) = daemon.shutdown() {
                    warn!(error = %e, "failed to shut down mDNS daemon");
                }
            }
        }
    }
}
