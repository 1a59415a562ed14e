// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The system object: shared configuration and coordination state for every
// printer, job, and client connection in a printer application.
//
// # Locking
//
// One `RwLock` guards everything mutable. Getters take the read lock, clone
// what they need, and release; nothing hands out references into the lock.
// Setters take the write lock, apply the change, bump the change counter,
// and re-advertise DNS-SD where the change is visible on the network.
// Helpers named `*_locked` expect the guard to be held already and never
// lock themselves. Application callbacks are cloned out as `Arc`s and run
// after the lock is released.
//
// # Run state
//
// `mark_running` is one-way. Afterwards new listeners are refused and the
// identity and callback setters become no-ops.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use printhost_core::config::SystemConfig;
use printhost_core::error::{PrinthostError, Result};
use printhost_core::types::{
    AttributeScope, Contact, DriverInfo, FirmwareVersion, LogLevel, SystemOptions,
};
use printhost_security::{SessionKey, hash_password, verify_password};

use crate::callbacks::{
    ClientRequest, DriverData, DriverFactory, DriverLookup, FilterCallback, MimeDetector,
    OperationHandler, SaveHandler,
};
use crate::dnssd::{DnsSdRegistrar, DnsSdService, NoopRegistrar};
use crate::filters::FilterRegistry;
use crate::listeners::{
    AddressResolver, ListenAddress, ListenTarget, ListenerSet, ListenerSocket, SystemResolver,
};
use crate::snapshot::SystemSnapshot;
use crate::versions::{AttributeGroup, MAX_VERSIONS, build_version_group};

/// Default cap on log file size before rotation.
pub const DEFAULT_MAX_LOG_SIZE: usize = 1024 * 1024;

/// String attributes that can be copied into a bounded buffer with
/// [`System::copy_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringField {
    Name,
    Uuid,
    Hostname,
    Location,
    GeoLocation,
    Organization,
    OrganizationalUnit,
    AdminGroup,
    DefaultPrintGroup,
    DnsSdName,
    FooterHtml,
    ServerHeader,
}

/// Everything behind the lock.
struct SystemData {
    name: String,
    uuid: String,
    hostname: Option<String>,
    location: Option<String>,
    geo_location: Option<String>,
    organization: Option<String>,
    organizational_unit: Option<String>,
    contact: Contact,
    admin_group: Option<String>,
    default_print_group: Option<String>,
    dns_sd_name: Option<String>,
    dns_sd_collision: bool,
    footer_html: Option<String>,
    log_level: LogLevel,
    max_log_size: usize,
    password_hash: Option<String>,
    session: Option<SessionKey>,
    tls_only: bool,
    options: SystemOptions,
    next_printer_id: i32,
    default_printer_id: i32,
    versions: Vec<FirmwareVersion>,
    server_header: String,

    running: bool,
    config_changes: u64,
    config_time: DateTime<Utc>,
    saved_changes: u64,

    // Fixed at creation.
    port: u16,
    subtypes: Option<String>,
    spool_dir: PathBuf,
    log_file: Option<PathBuf>,
    auth_service: Option<String>,

    listeners: ListenerSet,
    filters: FilterRegistry,

    drivers: Vec<DriverInfo>,
    driver_lookup: Option<Arc<dyn DriverLookup>>,
    driver_factory: Option<Arc<dyn DriverFactory>>,
    mime_detector: Option<Arc<dyn MimeDetector>>,
    operation_handler: Option<Arc<dyn OperationHandler>>,
    save_handler: Option<Arc<dyn SaveHandler>>,
}

/// Shared system state. Wrap in an `Arc` and hand a clone to every task.
pub struct System {
    inner: RwLock<SystemData>,
    resolver: Arc<dyn AddressResolver>,
    registrar: Arc<dyn DnsSdRegistrar>,
}

impl System {
    /// Create a system using the platform resolver and, with the `dnssd`
    /// feature, the mDNS responder.
    pub fn new(config: SystemConfig) -> Result<Self> {
        Self::with_collaborators(config, Arc::new(SystemResolver), default_registrar())
    }

    /// Create a system with explicit address-resolution and DNS-SD back ends.
    #[instrument(skip_all, fields(name = %config.name))]
    pub fn with_collaborators(
        config: SystemConfig,
        resolver: Arc<dyn AddressResolver>,
        registrar: Arc<dyn DnsSdRegistrar>,
    ) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(PrinthostError::SystemCreate("a system name is required".into()));
        }

        let spool_dir = config.effective_spool_dir();
        std::fs::create_dir_all(&spool_dir).map_err(|e| {
            PrinthostError::SystemCreate(format!(
                "unable to create spool directory '{}': {e}",
                spool_dir.display()
            ))
        })?;

        let hostname = match &config.hostname {
            Some(host) => host.clone(),
            None => default_hostname(std::env::var("HOSTNAME").ok().as_deref()),
        };

        let data = SystemData {
            name: config.name.clone(),
            uuid: new_uuid(),
            hostname: Some(hostname),
            location: None,
            geo_location: None,
            organization: None,
            organizational_unit: None,
            contact: Contact::default(),
            admin_group: config.admin_group.clone(),
            default_print_group: None,
            dns_sd_name: Some(config.name.clone()),
            dns_sd_collision: false,
            footer_html: None,
            log_level: config.log_level,
            max_log_size: DEFAULT_MAX_LOG_SIZE,
            password_hash: None,
            session: None,
            tls_only: config.tls_only,
            options: config.options,
            next_printer_id: 1,
            default_printer_id: 0,
            versions: Vec::new(),
            server_header: server_header(&[]),
            running: false,
            config_changes: 0,
            config_time: Utc::now(),
            saved_changes: 0,
            port: config.port,
            subtypes: config.subtypes.clone(),
            spool_dir,
            log_file: config.log_file.clone(),
            auth_service: config.auth_service.clone(),
            listeners: ListenerSet::new(),
            filters: FilterRegistry::new(),
            drivers: Vec::new(),
            driver_lookup: None,
            driver_factory: None,
            mime_detector: None,
            operation_handler: None,
            save_handler: None,
        };

        info!(port = data.port, spool = %data.spool_dir.display(), "system created");

        Ok(Self {
            inner: RwLock::new(data),
            resolver,
            registrar,
        })
    }

    // -----------------------------------------------------------------------
    // Run state and change tracking
    // -----------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.inner.read().running
    }

    /// Switch to the running state and publish the DNS-SD record.
    pub fn mark_running(&self) {
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        data.running = true;
        info!(name = %data.name, "system running");
        self.register_dnssd_locked(&mut data);
    }

    /// Number of configuration changes since creation.
    pub fn config_changes(&self) -> u64 {
        self.inner.read().config_changes
    }

    /// Time of the most recent configuration change.
    pub fn config_time(&self) -> DateTime<Utc> {
        self.inner.read().config_time
    }

    fn changed_locked(data: &mut SystemData) {
        data.config_changes += 1;
        data.config_time = Utc::now();
    }

    // -----------------------------------------------------------------------
    // Fixed attributes
    // -----------------------------------------------------------------------

    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    pub fn options(&self) -> SystemOptions {
        self.inner.read().options
    }

    pub fn port(&self) -> u16 {
        self.inner.read().port
    }

    pub fn subtypes(&self) -> Option<String> {
        self.inner.read().subtypes.clone()
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.inner.read().spool_dir.clone()
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.inner.read().log_file.clone()
    }

    pub fn auth_service(&self) -> Option<String> {
        self.inner.read().auth_service.clone()
    }

    /// Value for the HTTP "Server:" header.
    pub fn server_header(&self) -> String {
        self.inner.read().server_header.clone()
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    pub fn uuid(&self) -> String {
        self.inner.read().uuid.clone()
    }

    /// Replace the UUID; `None` generates a new one. Ignored once running.
    pub fn set_uuid(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        data.uuid = match value {
            Some(v) => v.to_owned(),
            None => new_uuid(),
        };
        Self::changed_locked(&mut data);
        self.register_dnssd_locked(&mut data);
    }

    pub fn hostname(&self) -> Option<String> {
        self.inner.read().hostname.clone()
    }

    /// Set the hostname; `None` derives one from `$HOSTNAME`.
    pub fn set_hostname(&self, value: Option<&str>) {
        let host = match value {
            Some(v) => v.to_owned(),
            None => default_hostname(std::env::var("HOSTNAME").ok().as_deref()),
        };
        let mut data = self.inner.write();
        data.hostname = Some(host);
        Self::changed_locked(&mut data);
        self.register_dnssd_locked(&mut data);
    }

    // -----------------------------------------------------------------------
    // Descriptive attributes
    // -----------------------------------------------------------------------

    pub fn location(&self) -> Option<String> {
        self.inner.read().location.clone()
    }

    pub fn set_location(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        data.location = value.map(str::to_owned);
        Self::changed_locked(&mut data);
        self.register_dnssd_locked(&mut data);
    }

    pub fn geo_location(&self) -> Option<String> {
        self.inner.read().geo_location.clone()
    }

    /// Set the "geo:" URI; malformed values are ignored.
    pub fn set_geo_location(&self, value: Option<&str>) {
        if let Some(uri) = value {
            if !is_valid_geo_uri(uri) {
                warn!(value = uri, "ignoring bad geo-location");
                return;
            }
        }
        let mut data = self.inner.write();
        data.geo_location = value.map(str::to_owned);
        Self::changed_locked(&mut data);
    }

    pub fn organization(&self) -> Option<String> {
        self.inner.read().organization.clone()
    }

    pub fn set_organization(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        data.organization = value.map(str::to_owned);
        Self::changed_locked(&mut data);
    }

    pub fn organizational_unit(&self) -> Option<String> {
        self.inner.read().organizational_unit.clone()
    }

    pub fn set_organizational_unit(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        data.organizational_unit = value.map(str::to_owned);
        Self::changed_locked(&mut data);
    }

    pub fn contact(&self) -> Contact {
        self.inner.read().contact.clone()
    }

    pub fn set_contact(&self, contact: Contact) {
        let mut data = self.inner.write();
        data.contact = contact;
        Self::changed_locked(&mut data);
    }

    pub fn footer_html(&self) -> Option<String> {
        self.inner.read().footer_html.clone()
    }

    /// Set the web interface footer. `None` is ignored, as is any call once
    /// running.
    pub fn set_footer_html(&self, value: Option<&str>) {
        let Some(html) = value else {
            return;
        };
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        data.footer_html = Some(html.to_owned());
        Self::changed_locked(&mut data);
    }

    // -----------------------------------------------------------------------
    // Access control
    // -----------------------------------------------------------------------

    pub fn admin_group(&self) -> Option<String> {
        self.inner.read().admin_group.clone()
    }

    pub fn set_admin_group(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        data.admin_group = value.map(str::to_owned);
        Self::changed_locked(&mut data);
    }

    pub fn default_print_group(&self) -> Option<String> {
        self.inner.read().default_print_group.clone()
    }

    pub fn set_default_print_group(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        data.default_print_group = value.map(str::to_owned);
        Self::changed_locked(&mut data);
    }

    pub fn tls_only(&self) -> bool {
        self.inner.read().tls_only
    }

    pub fn set_tls_only(&self, value: bool) {
        let mut data = self.inner.write();
        data.tls_only = value;
        Self::changed_locked(&mut data);
    }

    /// The stored "<nonce>~<digest>" password hash.
    pub fn password(&self) -> Option<String> {
        self.inner.read().password_hash.clone()
    }

    /// Store a hash produced by [`System::hash_password`]. `None` is ignored.
    pub fn set_password(&self, hash: Option<&str>) {
        let Some(hash) = hash else {
            return;
        };
        let mut data = self.inner.write();
        data.password_hash = Some(hash.to_owned());
        Self::changed_locked(&mut data);
    }

    /// Hash `password`, reusing the nonce of `prior` when given.
    pub fn hash_password(&self, prior: Option<&str>, password: &str) -> Result<String> {
        hash_password(prior, password)
    }

    /// Whether `password` matches the stored hash. No stored hash never
    /// matches.
    pub fn check_password(&self, password: &str) -> bool {
        match self.password() {
            Some(stored) => verify_password(&stored, password),
            None => false,
        }
    }

    /// The current session key, regenerated first if older than 24 hours.
    pub fn session_key(&self) -> Result<String> {
        self.session_key_at(Utc::now())
    }

    /// [`System::session_key`] against an explicit clock.
    pub fn session_key_at(&self, now: DateTime<Utc>) -> Result<String> {
        let mut data = self.inner.write();
        if let Some(key) = data.session.as_mut() {
            if key.regenerate_at(now)? {
                debug!("session key rotated");
            }
            return Ok(key.as_str().to_owned());
        }

        let key = SessionKey::generate_at(now)?;
        let value = key.as_str().to_owned();
        data.session = Some(key);
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // DNS-SD
    // -----------------------------------------------------------------------

    pub fn dnssd_name(&self) -> Option<String> {
        self.inner.read().dns_sd_name.clone()
    }

    /// Whether the last DNS-SD registration failed.
    pub fn dnssd_collision(&self) -> bool {
        self.inner.read().dns_sd_collision
    }

    /// Set the advertised service name; `None` withdraws the advertisement.
    pub fn set_dnssd_name(&self, value: Option<&str>) {
        let mut data = self.inner.write();
        data.dns_sd_name = value.map(str::to_owned);
        data.dns_sd_collision = false;
        Self::changed_locked(&mut data);
        self.register_dnssd_locked(&mut data);
    }

    /// Re-publish the DNS-SD record from the current attributes. Only acts
    /// while running.
    fn register_dnssd_locked(&self, data: &mut SystemData) {
        if !data.running {
            return;
        }

        let Some(instance_name) = data.dns_sd_name.clone() else {
            self.registrar.unregister();
            return;
        };

        let service = DnsSdService {
            instance_name,
            hostname: data.hostname.clone().unwrap_or_else(|| "localhost".into()),
            port: data.port,
            uuid: data.uuid.clone(),
            location: data.location.clone(),
            subtypes: data.subtypes.clone(),
        };

        if let Err(e) = self.registrar.register(&service) {
            warn!(name = %service.instance_name, error = %e, "DNS-SD registration failed");
            data.dns_sd_collision = true;
        }
    }

    // -----------------------------------------------------------------------
    // Logging
    // -----------------------------------------------------------------------

    pub fn log_level(&self) -> LogLevel {
        self.inner.read().log_level
    }

    pub fn set_log_level(&self, level: LogLevel) {
        let mut data = self.inner.write();
        data.log_level = level;
        Self::changed_locked(&mut data);
    }

    pub fn max_log_size(&self) -> usize {
        self.inner.read().max_log_size
    }

    /// Set the rotation threshold; 0 disables rotation.
    pub fn set_max_log_size(&self, size: usize) {
        let mut data = self.inner.write();
        data.max_log_size = size;
        Self::changed_locked(&mut data);
    }

    // -----------------------------------------------------------------------
    // Printer ids
    // -----------------------------------------------------------------------

    pub fn next_printer_id(&self) -> i32 {
        self.inner.read().next_printer_id
    }

    /// Ignored once running, and for ids below 1; use
    /// [`System::allocate_printer_id`] instead.
    pub fn set_next_printer_id(&self, id: i32) {
        let mut data = self.inner.write();
        if data.running || id < 1 {
            return;
        }
        data.next_printer_id = id;
        Self::changed_locked(&mut data);
    }

    /// Hand out the next printer id. `None` once the id space is used up.
    pub fn allocate_printer_id(&self) -> Option<i32> {
        let mut data = self.inner.write();
        let id = data.next_printer_id;
        let Some(next) = id.checked_add(1) else {
            warn!(id, "printer id space exhausted");
            return None;
        };
        data.next_printer_id = next;
        Self::changed_locked(&mut data);
        Some(id)
    }

    pub fn default_printer_id(&self) -> i32 {
        self.inner.read().default_printer_id
    }

    pub fn set_default_printer_id(&self, id: i32) {
        let mut data = self.inner.write();
        data.default_printer_id = id;
        Self::changed_locked(&mut data);
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    pub fn versions(&self) -> Vec<FirmwareVersion> {
        self.inner.read().versions.clone()
    }

    /// Register the application's components (at most 10 kept). Ignored
    /// once running.
    pub fn set_versions(&self, mut versions: Vec<FirmwareVersion>) {
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        versions.truncate(MAX_VERSIONS);
        data.server_header = server_header(&versions);
        data.versions = versions;
        Self::changed_locked(&mut data);
    }

    /// The `xxx-firmware-*` attribute group for `scope`, limited to the
    /// names in `requested` (`None` for all).
    pub fn export_versions(
        &self,
        scope: AttributeScope,
        requested: Option<&HashSet<String>>,
    ) -> AttributeGroup {
        let versions = self.versions();
        build_version_group(scope, &versions, requested)
    }

    // -----------------------------------------------------------------------
    // Bounded copies
    // -----------------------------------------------------------------------

    /// Copy a string attribute as if into a `capacity`-byte C buffer: at
    /// most `capacity - 1` bytes, cut on a character boundary. Unset
    /// attributes copy as "".
    pub fn copy_string(&self, field: StringField, capacity: usize) -> String {
        let value = {
            let data = self.inner.read();
            match field {
                StringField::Name => Some(data.name.clone()),
                StringField::Uuid => Some(data.uuid.clone()),
                StringField::Hostname => data.hostname.clone(),
                StringField::Location => data.location.clone(),
                StringField::GeoLocation => data.geo_location.clone(),
                StringField::Organization => data.organization.clone(),
                StringField::OrganizationalUnit => data.organizational_unit.clone(),
                StringField::AdminGroup => data.admin_group.clone(),
                StringField::DefaultPrintGroup => data.default_print_group.clone(),
                StringField::DnsSdName => data.dns_sd_name.clone(),
                StringField::FooterHtml => data.footer_html.clone(),
                StringField::ServerHeader => Some(data.server_header.clone()),
            }
        };
        truncate_to_capacity(value.unwrap_or_default(), capacity)
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Bind listeners for `target` (see [`ListenTarget`]) on the system port.
    ///
    /// Returns `true` if at least one socket was added. Refused once running.
    #[instrument(skip(self))]
    pub fn add_listeners(&self, target: Option<&str>) -> bool {
        let mut data = self.inner.write();
        if data.running {
            error!(fatal = true, "tried to add listeners while system is running");
            return false;
        }

        let port = data.port;
        let target = ListenTarget::parse(target);
        data.listeners.add(&target, port, self.resolver.as_ref())
    }

    pub fn listener_count(&self) -> usize {
        self.inner.read().listeners.len()
    }

    pub fn listener_addresses(&self) -> Vec<ListenAddress> {
        self.inner.read().listeners.addresses()
    }

    /// Duplicated handles for every listener, for the accept loop.
    pub fn listener_sockets(&self) -> Result<Vec<(ListenAddress, ListenerSocket)>> {
        let data = self.inner.read();
        data.listeners
            .entries()
            .iter()
            .map(|e| -> Result<_> { Ok((e.address.clone(), e.socket.try_clone()?)) })
            .collect()
    }

    // -----------------------------------------------------------------------
    // MIME filters and detection
    // -----------------------------------------------------------------------

    /// Register a filter for `src` -> `dst`. The first filter registered for
    /// a pair is kept; later ones are ignored.
    pub fn add_filter(
        &self,
        src: &'static str,
        dst: &'static str,
        callback: Arc<dyn FilterCallback>,
    ) {
        self.inner.write().filters.add(src, dst, callback);
    }

    pub fn find_filter(&self, src: &str, dst: &str) -> Option<Arc<dyn FilterCallback>> {
        self.inner.read().filters.find(src, dst)
    }

    /// Registered (source, destination) pairs in lookup order.
    pub fn filters(&self) -> Vec<(&'static str, &'static str)> {
        self.inner.read().filters.pairs()
    }

    pub fn set_mime_detector(&self, detector: Arc<dyn MimeDetector>) {
        let mut data = self.inner.write();
        data.mime_detector = Some(detector);
        Self::changed_locked(&mut data);
    }

    /// Ask the application's detector for the type of a document header.
    pub fn detect_mime(&self, header: &[u8]) -> Option<&'static str> {
        let detector = self.inner.read().mime_detector.clone()?;
        detector.detect(header)
    }

    // -----------------------------------------------------------------------
    // Drivers
    // -----------------------------------------------------------------------

    /// Register the driver table with its lookup and factory callbacks.
    /// Ignored once running.
    pub fn set_driver_callback(
        &self,
        drivers: Vec<DriverInfo>,
        lookup: Option<Arc<dyn DriverLookup>>,
        factory: Arc<dyn DriverFactory>,
    ) {
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        data.drivers = drivers;
        data.driver_lookup = lookup;
        data.driver_factory = Some(factory);
        Self::changed_locked(&mut data);
    }

    pub fn print_drivers(&self) -> Vec<DriverInfo> {
        self.inner.read().drivers.clone()
    }

    /// Run the driver factory for a registered driver.
    pub fn create_driver(&self, name: &str, device_uri: &str) -> Option<DriverData> {
        let (driver, factory) = {
            let data = self.inner.read();
            let driver = data.drivers.iter().find(|d| d.name == name)?.clone();
            (driver, data.driver_factory.clone()?)
        };
        factory.create(&driver, device_uri)
    }

    /// Pick a driver name for an IEEE-1284 device ID.
    pub fn driver_for_device(&self, device_id: &str) -> Option<String> {
        let lookup = self.inner.read().driver_lookup.clone()?;
        lookup.driver_for(device_id)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Install the handler for non-standard operations. Ignored once running.
    pub fn set_operation_callback(&self, handler: Arc<dyn OperationHandler>) {
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        data.operation_handler = Some(handler);
        Self::changed_locked(&mut data);
    }

    /// Offer `request` to the operation handler. `false` if there is none or
    /// it declined.
    pub fn dispatch_operation(&self, request: &ClientRequest) -> bool {
        let handler = self.inner.read().operation_handler.clone();
        match handler {
            Some(handler) => handler.handle(request),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Install the save handler. Ignored once running.
    pub fn set_save_callback(&self, handler: Arc<dyn SaveHandler>) {
        let mut data = self.inner.write();
        if data.running {
            return;
        }
        data.save_handler = Some(handler);
        Self::changed_locked(&mut data);
    }

    /// Whether there are changes the save handler has not seen.
    pub fn needs_save(&self) -> bool {
        let data = self.inner.read();
        data.config_changes > data.saved_changes
    }

    /// Snapshot the configuration and pass it to the save handler.
    ///
    /// Returns `Ok(false)` when no save handler is installed.
    pub fn save(&self) -> Result<bool> {
        let (snapshot, handler) = {
            let data = self.inner.read();
            (Self::snapshot_locked(&data), data.save_handler.clone())
        };
        let Some(handler) = handler else {
            return Ok(false);
        };

        handler.save(&snapshot)?;

        let mut data = self.inner.write();
        data.saved_changes = data.saved_changes.max(snapshot.config_changes);
        debug!(changes = snapshot.config_changes, "system state saved");
        Ok(true)
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        Self::snapshot_locked(&self.inner.read())
    }

    fn snapshot_locked(data: &SystemData) -> SystemSnapshot {
        SystemSnapshot {
            name: data.name.clone(),
            uuid: data.uuid.clone(),
            hostname: data.hostname.clone(),
            location: data.location.clone(),
            geo_location: data.geo_location.clone(),
            organization: data.organization.clone(),
            organizational_unit: data.organizational_unit.clone(),
            contact: data.contact.clone(),
            admin_group: data.admin_group.clone(),
            default_print_group: data.default_print_group.clone(),
            dns_sd_name: data.dns_sd_name.clone(),
            footer_html: data.footer_html.clone(),
            log_level: data.log_level,
            max_log_size: data.max_log_size,
            password_hash: data.password_hash.clone(),
            tls_only: data.tls_only,
            options: data.options,
            next_printer_id: data.next_printer_id,
            default_printer_id: data.default_printer_id,
            versions: data.versions.clone(),
            config_changes: data.config_changes,
            config_time: data.config_time,
        }
    }

    /// Apply a saved snapshot through the regular setters.
    ///
    /// The name and feature options are fixed at creation and are not
    /// restored; setters that are closed once running stay closed.
    pub fn restore(&self, snapshot: &SystemSnapshot) {
        self.set_uuid(Some(&snapshot.uuid));
        if let Some(host) = &snapshot.hostname {
            self.set_hostname(Some(host));
        }
        self.set_location(snapshot.location.as_deref());
        self.set_geo_location(snapshot.geo_location.as_deref());
        self.set_organization(snapshot.organization.as_deref());
        self.set_organizational_unit(snapshot.organizational_unit.as_deref());
        self.set_contact(snapshot.contact.clone());
        self.set_admin_group(snapshot.admin_group.as_deref());
        self.set_default_print_group(snapshot.default_print_group.as_deref());
        self.set_dnssd_name(snapshot.dns_sd_name.as_deref());
        self.set_footer_html(snapshot.footer_html.as_deref());
        self.set_log_level(snapshot.log_level);
        self.set_max_log_size(snapshot.max_log_size);
        self.set_password(snapshot.password_hash.as_deref());
        self.set_tls_only(snapshot.tls_only);
        self.set_next_printer_id(snapshot.next_printer_id);
        self.set_default_printer_id(snapshot.default_printer_id);
        self.set_versions(snapshot.versions.clone());
        info!(uuid = %snapshot.uuid, "system state restored");
    }
}

fn default_registrar() -> Arc<dyn DnsSdRegistrar> {
    #[cfg(feature = "dnssd")]
    {
        Arc::new(crate::dnssd::MdnsRegistrar::new())
    }
    #[cfg(not(feature = "dnssd"))]
    {
        Arc::new(NoopRegistrar)
    }
}

/// A registrar for callers that never advertise.
pub fn noop_registrar() -> Arc<dyn DnsSdRegistrar> {
    Arc::new(NoopRegistrar)
}

fn new_uuid() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn server_header(versions: &[FirmwareVersion]) -> String {
    let own = format!("Printhost/{} IPP/2.0", env!("CARGO_PKG_VERSION"));
    match versions.first() {
        Some(app) => format!("{}/{} {own}", app.name, app.sversion),
        None => own,
    }
}

/// Hostname used when none is configured: `env_hostname` or "localhost",
/// with ".lan" rewritten to ".local" and ".local" added to bare names.
pub fn default_hostname(env_hostname: Option<&str>) -> String {
    let host = env_hostname
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");

    if let Some(stem) = host.strip_suffix(".lan") {
        format!("{stem}.local")
    } else if !host.contains('.') {
        format!("{host}.local")
    } else {
        host.to_owned()
    }
}

/// "geo:LAT,LON[,ALT]" with latitude and longitude in range.
fn is_valid_geo_uri(uri: &str) -> bool {
    let Some(rest) = uri.strip_prefix("geo:") else {
        return false;
    };
    let coords = rest.split(';').next().unwrap_or("");
    let parts: Vec<&str> = coords.split(',').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }
    let parsed: Option<Vec<f64>> = parts.iter().map(|p| p.parse().ok()).collect();
    match parsed.as_deref() {
        Some([lat, lon, ..]) => (-90.0..=90.0).contains(lat) && (-180.0..=180.0).contains(lon),
        _ => false,
    }
}

fn truncate_to_capacity(mut value: String, capacity: usize) -> String {
    let Some(max) = capacity.checked_sub(1) else {
        return String::new();
    };
    if value.len() > max {
        let mut end = max;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}
