// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sub-command operations and their dispatch, plus the local implementation
// shipped with the `printhost` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use printhost_core::config::SystemConfig;
use printhost_core::error::{PrinthostError, Result};
use printhost_core::types::{DriverInfo, LogLevel};
use printhost_system::server::{self, StatusPageHandler};
use printhost_system::{
    DeviceInfo, DeviceSource, DeviceTypes, DnsSdRegistrar, DriverFactory, DriverLookup, System,
    SystemResolver, SystemSnapshot, default_device_sources, list_devices,
};
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use crate::cli::{Invocation, Options, Subcommand, usage_text};
use crate::logging;

fn unsupported(name: &str) -> Result<()> {
    Err(PrinthostError::UnsupportedSubcommand(name.to_owned()))
}

/// One method per sub-command. Anything a printer application does not
/// implement fails with [`PrinthostError::UnsupportedSubcommand`].
pub trait MainloopOps {
    fn add(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("add")
    }
    fn auto_add(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("auto-add")
    }
    fn cancel(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("cancel")
    }
    fn default_printer(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("default")
    }
    fn delete(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("delete")
    }
    fn devices(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("devices")
    }
    fn drivers(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("drivers")
    }
    fn jobs(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("jobs")
    }
    fn modify(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("modify")
    }
    fn options(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("options")
    }
    fn printers(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("printers")
    }
    fn server(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("server")
    }
    fn shutdown(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("shutdown")
    }
    fn status(&self, _base: &str, _options: &Options) -> Result<()> {
        unsupported("status")
    }
    fn submit(&self, _base: &str, _options: &Options, _files: &[String]) -> Result<()> {
        unsupported("submit")
    }

    /// Name and one-line description of the application-defined sub-command.
    fn extension(&self) -> Option<(&str, &str)> {
        None
    }

    fn run_extension(&self, _base: &str, _options: &Options, _files: &[String]) -> Result<()> {
        match self.extension() {
            Some((name, _)) => unsupported(name),
            None => unsupported("extension"),
        }
    }

    fn usage(&self, base: &str) -> String {
        usage_text(base, self.extension())
    }
}

/// Forward an invocation to exactly one operation.
pub fn dispatch(ops: &dyn MainloopOps, base: &str, inv: &Invocation) -> Result<()> {
    let sub = inv.subcommand.clone().unwrap_or(Subcommand::Submit);
    if !sub.accepts_files() && !inv.files.is_empty() {
        return Err(PrinthostError::FilesNotAccepted(sub.name().to_owned()));
    }

    let options = &inv.options;
    match sub {
        Subcommand::Add => ops.add(base, options),
        Subcommand::AutoAdd => ops.auto_add(base, options),
        Subcommand::Cancel => ops.cancel(base, options),
        Subcommand::Default => ops.default_printer(base, options),
        Subcommand::Delete => ops.delete(base, options),
        Subcommand::Devices => ops.devices(base, options),
        Subcommand::Drivers => ops.drivers(base, options),
        Subcommand::Jobs => ops.jobs(base, options),
        Subcommand::Modify => ops.modify(base, options),
        Subcommand::Options => ops.options(base, options),
        Subcommand::Printers => ops.printers(base, options),
        Subcommand::Server => ops.server(base, options),
        Subcommand::Shutdown => ops.shutdown(base, options),
        Subcommand::Status => ops.status(base, options),
        Subcommand::Submit => ops.submit(base, options, &inv.files),
        Subcommand::Extension(_) => ops.run_extension(base, options, &inv.files),
    }
}

// ---------------------------------------------------------------------------
// Local implementation
// ---------------------------------------------------------------------------

/// Extra system setup run after the driver table is installed.
pub type SetupCallback = Arc<dyn Fn(&System) -> Result<()> + Send + Sync>;

/// Runs the server in-process and talks to it over the local domain socket.
pub struct LocalOps {
    drivers: Vec<DriverInfo>,
    lookup: Option<Arc<dyn DriverLookup>>,
    factory: Arc<dyn DriverFactory>,
    setup: Option<SetupCallback>,
    registrar: Option<Arc<dyn DnsSdRegistrar>>,
    device_sources: Vec<Arc<dyn DeviceSource>>,
}

impl LocalOps {
    pub fn new(drivers: Vec<DriverInfo>, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            drivers,
            lookup: None,
            factory,
            setup: None,
            registrar: None,
            device_sources: default_device_sources(),
        }
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn DriverLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_setup(mut self, setup: SetupCallback) -> Self {
        self.setup = Some(setup);
        self
    }

    /// Advertise through `registrar` instead of the default responder.
    pub fn with_registrar(mut self, registrar: Arc<dyn DnsSdRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Replace the device sources `devices` walks.
    pub fn with_device_sources(mut self, sources: Vec<Arc<dyn DeviceSource>>) -> Self {
        self.device_sources = sources;
        self
    }

    /// System settings from an optional config file overridden by options.
    pub fn build_config(&self, base: &str, options: &Options) -> Result<SystemConfig> {
        let mut config = match options.get("config-file") {
            Some(path) => SystemConfig::load(Path::new(path))?,
            None => SystemConfig {
                name: base.to_owned(),
                ..SystemConfig::default()
            },
        };

        if let Some(name) = options.get("system-name") {
            config.name = name.to_owned();
        }
        if let Some(port) = options.get("server-port") {
            config.port = port
                .parse()
                .map_err(|_| PrinthostError::Config(format!("bad server-port value '{port}'")))?;
        }
        // An absolute path names the control socket, not the host.
        if let Some(host) = options.get("server-hostname").filter(|h| !h.starts_with('/')) {
            config.hostname = Some(host.to_owned());
        }
        if let Some(dir) = options.get("spool-directory") {
            config.spool_dir = Some(PathBuf::from(dir));
        }
        if let Some(file) = options.get("log-file") {
            config.log_file = Some(PathBuf::from(file));
        }
        if let Some(level) = options.get("log-level") {
            config.log_level = level.parse::<LogLevel>().map_err(PrinthostError::Config)?;
        }
        if let Some(service) = options.get("auth-service") {
            config.auth_service = Some(service.to_owned());
        }
        if let Some(host) = options.get("listen-hostname") {
            config.listen_hostname = Some(host.to_owned());
        }
        Ok(config)
    }

    /// Create the system and install the driver table and setup callback.
    pub fn build_system(&self, config: SystemConfig) -> Result<System> {
        let system = match &self.registrar {
            Some(registrar) => System::with_collaborators(
                config,
                Arc::new(SystemResolver),
                Arc::clone(registrar),
            )?,
            None => System::new(config)?,
        };
        system.set_driver_callback(
            self.drivers.clone(),
            self.lookup.clone(),
            Arc::clone(&self.factory),
        );
        if let Some(setup) = &self.setup {
            setup(&system)?;
        }
        Ok(system)
    }
}

/// Restore settings saved in `path`, then save back to it on every
/// [`System::save`]. A missing file is not an error.
#[instrument(skip(system))]
pub fn attach_state_file(system: &System, path: &Path) -> Result<()> {
    match std::fs::read_to_string(path) {
        Ok(json) => {
            let snapshot = SystemSnapshot::from_json(&json)?;
            system.restore(&snapshot);
            info!(path = %path.display(), "restored saved state");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no saved state yet");
        }
        Err(e) => return Err(e.into()),
    }

    let target = path.to_path_buf();
    system.set_save_callback(Arc::new(move |snapshot: &SystemSnapshot| -> Result<()> {
        std::fs::write(&target, snapshot.to_json()?)?;
        debug!(path = %target.display(), changes = snapshot.config_changes, "state saved");
        Ok(())
    }));
    Ok(())
}

/// Body of the server's status page, fetched over the control socket.
pub fn fetch_status(base: &str, options: &Options) -> Result<String> {
    request(&socket_path(base, options.get("server-hostname")), "GET", "/")
}

impl MainloopOps for LocalOps {
    #[instrument(skip(self, options))]
    fn server(&self, base: &str, options: &Options) -> Result<()> {
        let config = self.build_config(base, options)?;
        logging::init(config.log_level, config.log_file.as_deref())?;
        let listen = config.listen_hostname.clone();
        let system = Arc::new(self.build_system(config)?);
        if let Some(path) = options.get("state-file") {
            attach_state_file(&system, Path::new(path))?;
        }

        let socket = socket_path(base, options.get("server-hostname"));
        if !system.add_listeners(Some(&socket.to_string_lossy())) {
            warn!(path = %socket.display(), "no local listener");
        }
        if !system.add_listeners(listen.as_deref()) {
            warn!(listen = listen.as_deref().unwrap_or("*"), "no network listeners");
        }

        let runtime = tokio::runtime::Runtime::new()?;
        let result = runtime.block_on(async {
            let shutdown = Arc::new(Notify::new());
            let signal = Arc::clone(&shutdown);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted");
                    signal.notify_one();
                }
            });

            let handler = Arc::new(StatusPageHandler::with_shutdown(Arc::clone(&shutdown)));
            server::run(Arc::clone(&system), handler, shutdown).await
        });

        if socket.exists() {
            let _ = std::fs::remove_file(&socket);
        }
        result?;
        system.save()?;
        Ok(())
    }

    fn devices(&self, base: &str, options: &Options) -> Result<()> {
        let verbose = options.get("verbose").is_some();
        for line in device_lines(DeviceTypes::ALL, &self.device_sources, verbose, |e| {
            eprintln!("{base}: {e}");
        }) {
            println!("{line}");
        }
        Ok(())
    }

    fn drivers(&self, _base: &str, _options: &Options) -> Result<()> {
        for line in driver_lines(&self.drivers) {
            println!("{line}");
        }
        Ok(())
    }

    fn status(&self, base: &str, options: &Options) -> Result<()> {
        print!("{}", fetch_status(base, options)?);
        Ok(())
    }

    fn shutdown(&self, base: &str, options: &Options) -> Result<()> {
        request(
            &socket_path(base, options.get("server-hostname")),
            "POST",
            "/shutdown",
        )?;
        Ok(())
    }
}

/// `drivers` output: name padded to a fixed column, then description.
pub fn driver_lines(drivers: &[DriverInfo]) -> Vec<String> {
    drivers
        .iter()
        .map(|d| format!("{:<39} {}", d.name, d.description))
        .collect()
}

/// `devices` output: one URI per line, each followed by its indented
/// device ID when `verbose` is set.
pub fn device_lines(
    types: DeviceTypes,
    sources: &[Arc<dyn DeviceSource>],
    verbose: bool,
    error: impl FnMut(&PrinthostError),
) -> Vec<String> {
    let mut lines = Vec::new();
    list_devices(
        types,
        sources,
        |device: &DeviceInfo| {
            lines.push(device.uri.clone());
            if verbose {
                if let Some(id) = &device.device_id {
                    lines.push(format!("    {id}"));
                }
            }
            false
        },
        error,
    );
    lines
}

/// Domain socket the server listens on. A `server-hostname` that is an
/// absolute path names the socket directly.
pub fn socket_path(base: &str, server_hostname: Option<&str>) -> PathBuf {
    if let Some(path) = server_hostname.filter(|h| h.starts_with('/')) {
        return PathBuf::from(path);
    }
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    dir.join(format!("{base}.sock"))
}

/// Send one request over the domain socket and return the response body.
#[cfg(unix)]
fn request(path: &Path, method: &str, target: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;
    runtime.block_on(async {
        let mut stream = UnixStream::connect(path)
            .await
            .map_err(|_| PrinthostError::NotRunning)?;
        let head = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(head.as_bytes()).await?;

        let mut response = String::new();
        stream.read_to_string(&mut response).await?;

        let (head, body) = response.split_once("\r\n\r\n").unwrap_or((response.as_str(), ""));
        let status = head.lines().next().unwrap_or_default();
        if !status.contains(" 200 ") {
            return Err(PrinthostError::Server(format!("unexpected response '{status}'")));
        }
        Ok(body.to_owned())
    })
}

#[cfg(not(unix))]
fn request(_path: &Path, _method: &str, _target: &str) -> Result<String> {
    Err(PrinthostError::NotRunning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use printhost_system::{DriverData, noop_registrar};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, usize, usize)>>,
    }

    impl MainloopOps for Recording {
        fn submit(&self, _base: &str, options: &Options, files: &[String]) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(("submit".into(), options.len(), files.len()));
            Ok(())
        }

        fn jobs(&self, _base: &str, options: &Options) -> Result<()> {
            self.calls.lock().unwrap().push(("jobs".into(), options.len(), 0));
            Ok(())
        }
    }

    fn invocation(sub: Option<Subcommand>, files: &[&str]) -> Invocation {
        Invocation {
            subcommand: sub,
            options: Options::new(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn local_ops() -> LocalOps {
        let factory = Arc::new(|driver: &DriverInfo, _uri: &str| {
            Some(DriverData {
                make_and_model: driver.description.clone(),
                format: "image/pwg-raster".into(),
                ppm: 10,
            })
        });
        LocalOps::new(
            vec![
                DriverInfo::new("generic_pwg", "Generic PWG Raster"),
                DriverInfo::new("zebra_zpl", "Zebra ZPL Label Printer"),
            ],
            factory,
        )
    }

    #[test]
    fn missing_subcommand_means_submit() {
        let ops = Recording::default();
        dispatch(&ops, "app", &invocation(None, &["-"])).unwrap();
        assert_eq!(*ops.calls.lock().unwrap(), vec![("submit".to_owned(), 0, 1)]);
    }

    #[test]
    fn files_are_refused_by_other_subcommands() {
        let ops = Recording::default();
        let err = dispatch(&ops, "app", &invocation(Some(Subcommand::Jobs), &["a.pdf"])).unwrap_err();
        assert_eq!(err.to_string(), "sub-command 'jobs' does not accept files");
        assert!(ops.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unimplemented_subcommands_name_themselves() {
        let ops = Recording::default();
        let err = dispatch(&ops, "app", &invocation(Some(Subcommand::AutoAdd), &[])).unwrap_err();
        assert!(matches!(err, PrinthostError::UnsupportedSubcommand(ref s) if s == "auto-add"));
    }

    #[test]
    fn options_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        std::fs::write(&path, r#"{ "name": "From File", "port": 9000, "tls_only": true }"#).unwrap();

        let mut options = Options::new();
        options.set("config-file", path.to_str().unwrap());
        options.set("server-port", "9100");
        options.set("log-level", "debug");
        options.set("spool-directory", dir.path().to_str().unwrap());

        let config = local_ops().build_config("app", &options).unwrap();
        assert_eq!(config.name, "From File");
        assert_eq!(config.port, 9100);
        assert!(config.tls_only);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.spool_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn socket_path_server_hostname_is_not_a_hostname() {
        let mut options = Options::new();
        options.set("server-hostname", "/run/app/ctl.sock");
        let config = local_ops().build_config("app", &options).unwrap();
        assert_eq!(config.hostname, None);

        options.set("server-hostname", "printer.local");
        let config = local_ops().build_config("app", &options).unwrap();
        assert_eq!(config.hostname.as_deref(), Some("printer.local"));
    }

    #[test]
    fn system_name_defaults_to_base() {
        let config = local_ops().build_config("labelapp", &Options::new()).unwrap();
        assert_eq!(config.name, "labelapp");
    }

    #[test]
    fn bad_option_values_are_config_errors() {
        let mut options = Options::new();
        options.set("server-port", "eighty");
        let err = local_ops().build_config("app", &options).unwrap_err();
        assert_eq!(err.to_string(), "configuration error: bad server-port value 'eighty'");

        let mut options = Options::new();
        options.set("log-level", "loud");
        assert!(local_ops().build_config("app", &options).is_err());
    }

    #[test]
    fn built_system_has_drivers_and_runs_setup() {
        let dir = tempfile::tempdir().unwrap();
        let ops = local_ops().with_setup(Arc::new(|system: &System| -> Result<()> {
            system.set_location(Some("Lab 2"));
            Ok(())
        }));
        let config = SystemConfig {
            spool_dir: Some(dir.path().to_path_buf()),
            hostname: Some("app.local".into()),
            ..SystemConfig::default()
        };

        let system = ops.build_system(config).unwrap();
        assert_eq!(system.print_drivers().len(), 2);
        assert_eq!(system.location().as_deref(), Some("Lab 2"));
        let data = system.create_driver("zebra_zpl", "usb://Zebra/ZD420").unwrap();
        assert_eq!(data.make_and_model, "Zebra ZPL Label Printer");
    }

    #[test]
    fn driver_lines_pad_the_name_column() {
        let lines = driver_lines(&[DriverInfo::new("generic_pwg", "Generic PWG Raster")]);
        assert_eq!(lines[0].find("Generic"), Some(40));
        assert!(lines[0].starts_with("generic_pwg "));
    }

    #[test]
    fn absolute_server_hostname_names_the_socket() {
        assert_eq!(
            socket_path("app", Some("/run/app/ctl.sock")),
            PathBuf::from("/run/app/ctl.sock")
        );
        assert!(socket_path("app", Some("printer.local")).ends_with("app.sock"));
    }

    #[cfg(unix)]
    #[test]
    fn client_commands_report_server_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sock");
        let mut options = Options::new();
        options.set("server-hostname", path.to_str().unwrap());

        let ops = local_ops();
        assert!(matches!(ops.status("app", &options), Err(PrinthostError::NotRunning)));
        assert!(matches!(ops.shutdown("app", &options), Err(PrinthostError::NotRunning)));
    }

    #[test]
    fn state_file_round_trips_settings() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let config = || SystemConfig {
            spool_dir: Some(dir.path().to_path_buf()),
            hostname: Some("app.local".into()),
            ..SystemConfig::default()
        };
        let ops = local_ops().with_registrar(noop_registrar());

        let first = ops.build_system(config()).unwrap();
        attach_state_file(&first, &state).unwrap();
        assert!(!state.exists());
        first.set_location(Some("Print Room"));
        first.set_organization(Some("Acme"));
        assert!(first.save().unwrap());
        assert!(!first.needs_save());

        let second = ops.build_system(config()).unwrap();
        assert_ne!(second.uuid(), first.uuid());
        attach_state_file(&second, &state).unwrap();
        assert_eq!(second.uuid(), first.uuid());
        assert_eq!(second.location().as_deref(), Some("Print Room"));
        assert_eq!(second.organization().as_deref(), Some("Acme"));
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        std::fs::write(&state, "{ not json").unwrap();
        let system = local_ops()
            .with_registrar(noop_registrar())
            .build_system(SystemConfig {
                spool_dir: Some(dir.path().to_path_buf()),
                ..SystemConfig::default()
            })
            .unwrap();
        assert!(matches!(
            attach_state_file(&system, &state),
            Err(PrinthostError::Serialization(_))
        ));
    }

    struct ListedDevices(Vec<DeviceInfo>);

    impl DeviceSource for ListedDevices {
        fn device_type(&self) -> DeviceTypes {
            DeviceTypes::DNS_SD
        }

        fn list(&self) -> Result<Vec<DeviceInfo>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn device_lines_show_ids_only_when_verbose() {
        let sources: Vec<Arc<dyn DeviceSource>> = vec![Arc::new(ListedDevices(vec![
            DeviceInfo::new(
                "socket://zd420.local:9100/",
                Some("MFG:Zebra;MDL:ZD420;".into()),
            ),
            DeviceInfo::new("socket://old.local:9100/", None),
        ]))];

        let quiet = device_lines(DeviceTypes::ALL, &sources, false, |_| {});
        assert_eq!(quiet, vec!["socket://zd420.local:9100/", "socket://old.local:9100/"]);

        let verbose = device_lines(DeviceTypes::ALL, &sources, true, |_| {});
        assert_eq!(
            verbose,
            vec![
                "socket://zd420.local:9100/",
                "    MFG:Zebra;MDL:ZD420;",
                "socket://old.local:9100/",
            ]
        );

        assert!(device_lines(DeviceTypes::ALL_LOCAL, &sources, true, |_| {}).is_empty());
    }

    #[test]
    fn devices_subcommand_uses_configured_sources() {
        let ops = local_ops().with_device_sources(vec![Arc::new(ListedDevices(vec![
            DeviceInfo::new("socket://a.local:9100/", None),
        ]))]);
        let inv = invocation(Some(Subcommand::Devices), &[]);
        assert!(dispatch(&ops, "app", &inv).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn server_answers_on_a_custom_control_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("custom.sock");
        let state = dir.path().join("state.json");

        let mut options = Options::new();
        options.set("server-hostname", socket.to_str().unwrap());
        options.set("listen-hostname", "127.0.0.1");
        options.set("server-port", "0");
        options.set("spool-directory", dir.path().to_str().unwrap());
        options.set("system-name", "Socket Test");
        options.set("state-file", state.to_str().unwrap());

        let server = {
            let options = options.clone();
            thread::spawn(move || {
                local_ops()
                    .with_registrar(noop_registrar())
                    .server("sockapp", &options)
            })
        };

        let mut body = None;
        for _ in 0..200 {
            if let Ok(text) = fetch_status("sockapp", &options) {
                body = Some(text);
                break;
            }
            thread::sleep(Duration::from_millis(25));
        }
        let body = body.expect("server never answered on the custom socket");
        assert!(body.starts_with("Socket Test\n"), "{body}");
        assert!(!body.contains("hostname: /"), "{body}");

        local_ops().shutdown("sockapp", &options).unwrap();
        server.join().unwrap().unwrap();

        assert!(!socket.exists());
        let saved = SystemSnapshot::from_json(&std::fs::read_to_string(&state).unwrap()).unwrap();
        assert_eq!(saved.name, "Socket Test");
    }
}
