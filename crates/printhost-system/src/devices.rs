// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer device discovery and IEEE 1284 device ID parsing.
//
// A device is anything a driver can be attached to, named by a URI such as
// "socket://host:9100/". Sources report what they can see; `list_devices`
// walks the sources matching a type mask and stops as soon as the caller
// says so. With the `dnssd` feature, `DnsSdDeviceSource` browses
// `_pdl-datastream._tcp` (raw socket printing) on the local network.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use printhost_core::error::{PrinthostError, Result};
use tracing::{debug, warn};

/// Longest key or value kept from a device ID, in bytes.
const MAX_FIELD_BYTES: usize = 255;

bitflags! {
    /// Kinds of device a listing should include.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceTypes: u32 {
        const USB = 0x01;
        const SERIAL = 0x02;
        const DNS_SD = 0x04;
        const SNMP = 0x08;
        const ALL_LOCAL = Self::USB.bits() | Self::SERIAL.bits();
        const ALL_REMOTE = Self::DNS_SD.bits() | Self::SNMP.bits();
        const ALL = Self::ALL_LOCAL.bits() | Self::ALL_REMOTE.bits();
    }
}

// ---------------------------------------------------------------------------
// IEEE 1284 device IDs
// ---------------------------------------------------------------------------

/// Parsed "KEY:value;KEY:value;" device ID.
///
/// Keys compare case-insensitively. A repeated key replaces the earlier
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceId {
    pairs: Vec<(String, String)>,
}

impl DeviceId {
    /// Value for `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// "MFG" or its long form "MANUFACTURER".
    pub fn manufacturer(&self) -> Option<&str> {
        self.get("MFG").or_else(|| self.get("MANUFACTURER"))
    }

    /// "MDL" or its long form "MODEL".
    pub fn model(&self) -> Option<&str> {
        self.get("MDL").or_else(|| self.get("MODEL"))
    }

    /// Page description languages from "CMD" / "COMMAND SET".
    pub fn command_set(&self) -> Vec<&str> {
        self.get("CMD")
            .or_else(|| self.get("COMMAND SET"))
            .map(|cmd| cmd.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Whether the command set lists `language`, ignoring case.
    pub fn supports(&self, language: &str) -> bool {
        self.command_set().iter().any(|c| c.eq_ignore_ascii_case(language))
    }

    fn insert(&mut self, key: String, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.pairs {
            write!(f, "{key}:{value};")?;
        }
        Ok(())
    }
}

/// Parse an IEEE 1284 device ID string.
///
/// Leading whitespace before keys and values is skipped. Parsing stops at
/// a key with no ':'; a missing final ';' is accepted. Empty keys are
/// dropped and over-long fields are cut to 255 bytes.
pub fn parse_1284_id(device_id: &str) -> DeviceId {
    let mut parsed = DeviceId::default();
    let mut rest = device_id;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let Some((key, after_key)) = rest.split_once(':') else {
            break;
        };
        let after_key = after_key.trim_start();
        let (value, after_value) = after_key.split_once(';').unwrap_or((after_key, ""));
        rest = after_value;

        if key.is_empty() {
            continue;
        }
        parsed.insert(clip(key), clip(value));
    }
    parsed
}

fn clip(field: &str) -> String {
    if field.len() <= MAX_FIELD_BYTES {
        return field.to_owned();
    }
    let mut end = MAX_FIELD_BYTES;
    while !field.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].to_owned()
}

// ---------------------------------------------------------------------------
// Sources and listing
// ---------------------------------------------------------------------------

/// One discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub uri: String,
    /// IEEE 1284 device ID, when the device reports one.
    pub device_id: Option<String>,
}

impl DeviceInfo {
    pub fn new(uri: impl Into<String>, device_id: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            device_id,
        }
    }
}

/// Something that can enumerate devices of one kind.
pub trait DeviceSource: Send + Sync {
    /// Which kind of device this source reports.
    fn device_type(&self) -> DeviceTypes;

    /// Every device currently visible.
    fn list(&self) -> Result<Vec<DeviceInfo>>;
}

/// Report devices from every source whose type is in `types`.
///
/// `found` returns `true` to stop the listing; the function then returns
/// `true` as well. A failing source is passed to `error` and the walk moves
/// on to the next one.
pub fn list_devices<F, E>(
    types: DeviceTypes,
    sources: &[Arc<dyn DeviceSource>],
    mut found: F,
    mut error: E,
) -> bool
where
    F: FnMut(&DeviceInfo) -> bool,
    E: FnMut(&PrinthostError),
{
    for source in sources.iter().filter(|s| types.intersects(s.device_type())) {
        let devices = match source.list() {
            Ok(devices) => devices,
            Err(e) => {
                warn!(kind = ?source.device_type(), error = %e, "device listing failed");
                error(&e);
                continue;
            }
        };

        for device in &devices {
            if found(device) {
                debug!(uri = %device.uri, "device listing stopped by caller");
                return true;
            }
        }
    }
    false
}

/// Sources the built-in features provide.
pub fn default_device_sources() -> Vec<Arc<dyn DeviceSource>> {
    #[cfg(feature = "dnssd")]
    {
        vec![Arc::new(DnsSdDeviceSource::new())]
    }
    #[cfg(not(feature = "dnssd"))]
    {
        Vec::new()
    }
}

/// Build a device ID from the "usb_*" keys a Bonjour printer publishes.
///
/// Falls back to the "ty" (make and model) key for MFG/MDL when the USB
/// keys are absent. `None` if nothing usable is present.
pub fn device_id_from_txt<'a>(get: impl Fn(&str) -> Option<&'a str>) -> Option<String> {
    let non_empty = |key: &str| get(key).map(str::trim).filter(|v| !v.is_empty());

    let (make, model) = match (non_empty("usb_MFG"), non_empty("usb_MDL")) {
        (Some(make), Some(model)) => (make.to_owned(), model.to_owned()),
        _ => {
            let ty = non_empty("ty")?;
            match ty.split_once(' ') {
                Some((make, model)) => (make.to_owned(), model.trim().to_owned()),
                None => (ty.to_owned(), ty.to_owned()),
            }
        }
    };

    let mut id = format!("MFG:{make};MDL:{model};");
    if let Some(cmd) = non_empty("usb_CMD").or_else(|| non_empty("pdl")) {
        id.push_str(&format!("CMD:{cmd};"));
    }
    Some(id)
}

#[cfg(feature = "dnssd")]
pub use mdns::{DnsSdDeviceSource, PDL_DATASTREAM_SERVICE};

#[cfg(feature = "dnssd")]
mod mdns {
    use std::collections::BTreeMap;
    use std::time::{Duration, Instant};

    use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
    use printhost_core::error::{PrinthostError, Result};
    use tracing::{debug, info, instrument, warn};

    use super::{DeviceInfo, DeviceSource, DeviceTypes, device_id_from_txt};

    /// Raw socket (port 9100) printing service type.
    pub const PDL_DATASTREAM_SERVICE: &str = "_pdl-datastream._tcp.local.";

    /// How long to keep browsing when new devices keep arriving.
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Polling interval; the browse ends early once a full interval adds
    /// no devices.
    const SETTLE_INTERVAL: Duration = Duration::from_millis(250);

    /// Browses the local network for socket-printing devices.
    #[derive(Debug, Clone)]
    pub struct DnsSdDeviceSource {
        timeout: Duration,
    }

    impl Default for DnsSdDeviceSource {
        fn default() -> Self {
            Self {
                timeout: DEFAULT_TIMEOUT,
            }
        }
    }

    impl DnsSdDeviceSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_timeout(timeout: Duration) -> Self {
            Self { timeout }
        }
    }

    impl DeviceSource for DnsSdDeviceSource {
        fn device_type(&self) -> DeviceTypes {
            DeviceTypes::DNS_SD
        }

        #[instrument(skip(self), fields(timeout_ms = self.timeout.as_millis() as u64))]
        fn list(&self) -> Result<Vec<DeviceInfo>> {
            let daemon = ServiceDaemon::new()
                .map_err(|e| PrinthostError::DnsSd(format!("failed to start mDNS daemon: {e}")))?;
            let receiver = daemon
                .browse(PDL_DATASTREAM_SERVICE)
                .map_err(|e| PrinthostError::DnsSd(format!("browse {PDL_DATASTREAM_SERVICE}: {e}")))?;

            // Keyed by full service name so repeated announcements collapse.
            let mut devices: BTreeMap<String, DeviceInfo> = BTreeMap::new();
            let end = Instant::now() + self.timeout;
            let mut last_count = 0;

            'browse: while Instant::now() < end {
                let tick = (Instant::now() + SETTLE_INTERVAL).min(end);
                while let Ok(event) = receiver.recv_deadline(tick) {
                    match event {
                        ServiceEvent::ServiceResolved(info) => {
                            let device = device_from_service(&info);
                            debug!(name = %info.get_fullname(), uri = %device.uri, "device resolved");
                            devices.insert(info.get_fullname().to_owned(), device);
                        }
                        ServiceEvent::ServiceRemoved(_, fullname) => {
                            devices.remove(&fullname);
                        }
                        ServiceEvent::SearchStopped(_) => break 'browse,
                        _ => {}
                    }
                }
                if devices.len() == last_count {
                    break;
                }
                last_count = devices.len();
            }

            if let Err(e) = daemon.stop_browse(PDL_DATASTREAM_SERVICE) {
                debug!(error = %e, "stop browse failed");
            }
            if let Err(e) = daemon.shutdown() {
                warn!(error = %e, "failed to shut down mDNS daemon");
            }

            info!(count = devices.len(), "DNS-SD device browse finished");
            Ok(devices.into_values().collect())
        }
    }

    /// "socket://host:port/" plus "?uuid=" when the TXT record has one.
    fn device_from_service(info: &ServiceInfo) -> DeviceInfo {
        let host = info.get_hostname().trim_end_matches('.');
        let mut uri = format!("socket://{host}:{}/", info.get_port());
        if let Some(uuid) = info.get_property_val_str("UUID").filter(|u| !u.is_empty()) {
            uri.push_str(&format!("?uuid={uuid}"));
        }
        let device_id = device_id_from_txt(|key| info.get_property_val_str(key));
        DeviceInfo::new(uri, device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        kind: DeviceTypes,
        devices: Vec<DeviceInfo>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(kind: DeviceTypes, uris: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                kind,
                devices: uris.iter().map(|u| DeviceInfo::new(*u, None)).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl DeviceSource for FixedSource {
        fn device_type(&self) -> DeviceTypes {
            self.kind
        }

        fn list(&self) -> Result<Vec<DeviceInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.devices.clone())
        }
    }

    struct FailingSource;

    impl DeviceSource for FailingSource {
        fn device_type(&self) -> DeviceTypes {
            DeviceTypes::SNMP
        }

        fn list(&self) -> Result<Vec<DeviceInfo>> {
            Err(PrinthostError::DnsSd("network unreachable".into()))
        }
    }

    #[test]
    fn parses_a_typical_device_id() {
        let id = parse_1284_id("MFG:Zebra;MDL:ZD420;CMD:ZPL, PWGRaster;CLS:PRINTER;");
        assert_eq!(id.len(), 4);
        assert_eq!(id.manufacturer(), Some("Zebra"));
        assert_eq!(id.model(), Some("ZD420"));
        assert_eq!(id.command_set(), vec!["ZPL", "PWGRaster"]);
        assert!(id.supports("pwgraster"));
        assert!(!id.supports("PDF"));
        assert_eq!(id.get("cls"), Some("PRINTER"));
    }

    #[test]
    fn long_key_names_are_understood() {
        let id = parse_1284_id("MANUFACTURER:HP;MODEL:LaserJet 4;COMMAND SET:PCL,PJL;");
        assert_eq!(id.manufacturer(), Some("HP"));
        assert_eq!(id.model(), Some("LaserJet 4"));
        assert!(id.supports("PJL"));
    }

    #[test]
    fn whitespace_before_keys_and_values_is_skipped() {
        let id = parse_1284_id("  MFG:  Acme ;\n MDL:Jet 9");
        assert_eq!(id.get("MFG"), Some("Acme "));
        assert_eq!(id.get("MDL"), Some("Jet 9"));
    }

    #[test]
    fn repeated_keys_replace_in_place() {
        let id = parse_1284_id("MFG:Old;MDL:X;mfg:New;");
        let pairs: Vec<(&str, &str)> = id.iter().collect();
        assert_eq!(pairs, vec![("MFG", "New"), ("MDL", "X")]);
    }

    #[test]
    fn parsing_stops_at_a_key_without_colon() {
        let id = parse_1284_id("MFG:Acme;MDL:Jet;trailing junk");
        assert_eq!(id.len(), 2);
        assert_eq!(id.get("trailing junk"), None);

        // Keys run to the next ':', so a stray ';' folds into the key.
        let id = parse_1284_id("MFG:Acme;junk;MDL:Jet;");
        assert_eq!(id.get("junk;MDL"), Some("Jet"));
        assert_eq!(id.model(), None);
    }

    #[test]
    fn empty_and_blank_ids_have_no_pairs() {
        assert!(parse_1284_id("").is_empty());
        assert!(parse_1284_id("   ").is_empty());
        assert!(parse_1284_id(":orphan;").is_empty());
    }

    #[test]
    fn over_long_fields_are_clipped() {
        let long = "é".repeat(200);
        let id = parse_1284_id(&format!("MDL:{long};"));
        let model = id.model().unwrap();
        assert!(model.len() <= MAX_FIELD_BYTES);
        assert_eq!(model.len(), 254);
    }

    #[test]
    fn display_reassembles_the_id() {
        let id = parse_1284_id("MFG: Acme;MDL:Jet");
        assert_eq!(id.to_string(), "MFG:Acme;MDL:Jet;");
        assert_eq!(parse_1284_id(&id.to_string()), id);
    }

    #[test]
    fn type_masks_combine() {
        assert_eq!(DeviceTypes::ALL_LOCAL, DeviceTypes::USB | DeviceTypes::SERIAL);
        assert_eq!(DeviceTypes::ALL_REMOTE, DeviceTypes::DNS_SD | DeviceTypes::SNMP);
        assert_eq!(DeviceTypes::ALL.bits(), 0x0f);
    }

    #[test]
    fn listing_skips_sources_outside_the_mask() {
        let usb = FixedSource::new(DeviceTypes::USB, &["usb://Zebra/ZD420"]);
        let net = FixedSource::new(DeviceTypes::DNS_SD, &["socket://a.local:9100/"]);
        let sources: Vec<Arc<dyn DeviceSource>> = vec![usb.clone(), net.clone()];

        let mut seen = Vec::new();
        let stopped = list_devices(
            DeviceTypes::ALL_REMOTE,
            &sources,
            |d| {
                seen.push(d.uri.clone());
                false
            },
            |_| panic!("no source fails"),
        );
        assert!(!stopped);
        assert_eq!(seen, vec!["socket://a.local:9100/"]);
        assert_eq!(usb.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_can_stop_the_listing() {
        let first = FixedSource::new(DeviceTypes::USB, &["usb://a", "usb://b"]);
        let second = FixedSource::new(DeviceTypes::SERIAL, &["serial:/dev/ttyS0"]);
        let sources: Vec<Arc<dyn DeviceSource>> = vec![first, second.clone()];

        let mut seen = 0;
        let stopped = list_devices(
            DeviceTypes::ALL,
            &sources,
            |d| {
                seen += 1;
                d.uri == "usb://a"
            },
            |_| {},
        );
        assert!(stopped);
        assert_eq!(seen, 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_source_is_reported_and_skipped() {
        let net = FixedSource::new(DeviceTypes::DNS_SD, &["socket://b.local:9100/"]);
        let sources: Vec<Arc<dyn DeviceSource>> = vec![Arc::new(FailingSource), net];

        let mut errors = Vec::new();
        let mut seen = Vec::new();
        list_devices(
            DeviceTypes::ALL,
            &sources,
            |d| {
                seen.push(d.uri.clone());
                false
            },
            |e| errors.push(e.to_string()),
        );
        assert_eq!(errors, vec!["DNS-SD error: network unreachable"]);
        assert_eq!(seen, vec!["socket://b.local:9100/"]);
    }

    #[test]
    fn device_id_from_usb_txt_keys() {
        let txt: HashMap<&str, &str> = [
            ("usb_MFG", "Zebra"),
            ("usb_MDL", "ZD420"),
            ("usb_CMD", "ZPL,PWGRaster"),
            ("ty", "Zebra ZD420 (ignored)"),
        ]
        .into();
        let id = device_id_from_txt(|k| txt.get(k).copied()).unwrap();
        assert_eq!(id, "MFG:Zebra;MDL:ZD420;CMD:ZPL,PWGRaster;");
        assert!(parse_1284_id(&id).supports("PWGRaster"));
    }

    #[test]
    fn device_id_falls_back_to_make_and_model() {
        let txt: HashMap<&str, &str> = [("ty", "Brother HL-L2350DW"), ("pdl", "application/pdf")].into();
        let id = device_id_from_txt(|k| txt.get(k).copied()).unwrap();
        assert_eq!(id, "MFG:Brother;MDL:HL-L2350DW;CMD:application/pdf;");

        let empty: HashMap<&str, &str> = [("ty", " ")].into();
        assert_eq!(device_id_from_txt(|k| empty.get(k).copied()), None);
    }
}
