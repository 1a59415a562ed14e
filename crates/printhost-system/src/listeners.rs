// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Listening sockets: bind-target parsing, address resolution, and the bounded
// listener set the accept loop serves.
//
// A bind target is one of:
//
//   - absent          all interfaces ("::" and "0.0.0.0")
//   - "/path"         Unix domain socket
//   - "192.0.2.1"     IPv4 literal (leading digit)
//   - "[::1]"         bracketed IPv6 literal
//   - anything else   hostname, tried as both IPv4 and IPv6

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use tracing::{debug, error, info};

/// Upper bound on listening sockets per system.
pub const MAX_LISTENERS: usize = 32;

bitflags! {
    /// Poll events the accept loop waits for on a listener.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interest: u8 {
        const READABLE = 0x01;
    }
}

// ---------------------------------------------------------------------------
// Targets and resolution
// ---------------------------------------------------------------------------

/// Address family for resolver queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            Self::Ipv4 => addr.is_ipv4(),
            Self::Ipv6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ipv4 => "IPv4",
            Self::Ipv6 => "IPv6",
        })
    }
}

/// A parsed bind target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenTarget {
    AllInterfaces,
    DomainSocket(PathBuf),
    Ipv4(String),
    /// Bracketed literal with the brackets removed.
    Ipv6(String),
    Hostname(String),
}

impl ListenTarget {
    pub fn parse(target: Option<&str>) -> Self {
        let Some(name) = target.filter(|s| !s.is_empty()) else {
            return Self::AllInterfaces;
        };

        if name.starts_with('/') {
            Self::DomainSocket(PathBuf::from(name))
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            Self::Ipv4(name.to_owned())
        } else if let Some(inner) = name.strip_prefix('[') {
            Self::Ipv6(inner.trim_end_matches(']').to_owned())
        } else {
            Self::Hostname(name.to_owned())
        }
    }
}

/// Turns a host name and port into candidate socket addresses.
pub trait AddressResolver: Send + Sync {
    fn resolve(&self, host: &str, port: u16, family: AddressFamily) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the platform's `getaddrinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve(&self, host: &str, port: u16, family: AddressFamily) -> io::Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()?
            .filter(|a| family.matches(a))
            .collect();

        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no {family} addresses"),
            ));
        }
        Ok(addrs)
    }
}

// ---------------------------------------------------------------------------
// Listener entries
// ---------------------------------------------------------------------------

/// Where a listener is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddress {
    Inet(SocketAddr),
    Local(PathBuf),
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inet(addr) => write!(f, "{addr}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A bound, listening socket.
#[derive(Debug)]
pub enum ListenerSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl ListenerSocket {
    /// Duplicate the underlying descriptor.
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(l) => l.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(l) => l.try_clone().map(Self::Unix),
        }
    }
}

/// One slot in the listener set.
#[derive(Debug)]
pub struct ListenerEntry {
    pub socket: ListenerSocket,
    pub interest: Interest,
    pub address: ListenAddress,
}

// ---------------------------------------------------------------------------
// Listener set
// ---------------------------------------------------------------------------

/// Append-only, capacity-bounded listener list.
#[derive(Debug, Default)]
pub struct ListenerSet {
    entries: Vec<ListenerEntry>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_LISTENERS
    }

    pub fn addresses(&self) -> Vec<ListenAddress> {
        self.entries.iter().map(|e| e.address.clone()).collect()
    }

    pub fn entries(&self) -> &[ListenerEntry] {
        &self.entries
    }

    /// Bind every address `target` names on `port`. Returns `true` if at
    /// least one new socket was added.
    pub fn add(&mut self, target: &ListenTarget, port: u16, resolver: &dyn AddressResolver) -> bool {
        match target {
            ListenTarget::DomainSocket(path) => self.add_domain_socket(path),
            ListenTarget::Ipv4(host) => self.add_inet(host, port, AddressFamily::Ipv4, resolver) > 0,
            ListenTarget::Ipv6(host) => self.add_inet(host, port, AddressFamily::Ipv6, resolver) > 0,
            ListenTarget::Hostname(host) => {
                let v4 = self.add_inet(host, port, AddressFamily::Ipv4, resolver);
                let v6 = self.add_inet(host, port, AddressFamily::Ipv6, resolver);
                v4 + v6 > 0
            }
            ListenTarget::AllInterfaces => {
                // IPv6 first: on dual-stack hosts "::" also accepts IPv4, and
                // the "0.0.0.0" bind then reports the port as taken.
                let v6 = self.add_inet("::", port, AddressFamily::Ipv6, resolver);
                let v4 = self.add_inet("0.0.0.0", port, AddressFamily::Ipv4, resolver);
                v4 + v6 > 0
            }
        }
    }

    fn add_inet(
        &mut self,
        host: &str,
        port: u16,
        family: AddressFamily,
        resolver: &dyn AddressResolver,
    ) -> usize {
        let addrs = match resolver.resolve(host, port, family) {
            Ok(addrs) => addrs,
            Err(e) => {
                info!(host, port, %family, error = %e, "unable to lookup address(es)");
                return 0;
            }
        };

        let mut added = 0;
        for addr in addrs {
            if self.is_full() {
                debug!(max = MAX_LISTENERS, "listener limit reached");
                break;
            }

            match TcpListener::bind(addr) {
                Ok(listener) => {
                    // Port 0 asks the OS to choose; record what it chose.
                    let bound = listener.local_addr().unwrap_or(addr);
                    info!(address = %bound, "listening for connections");
                    self.push(ListenerSocket::Tcp(listener), ListenAddress::Inet(bound));
                    added += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::AddrInUse && self.covered_by_dual_stack(&addr) => {
                    debug!(address = %addr, "already served by the IPv6 wildcard socket");
                }
                Err(e) => {
                    error!(address = %addr, error = %e, "unable to create listener socket");
                }
            }
        }
        added
    }

    #[cfg(unix)]
    fn add_domain_socket(&mut self, path: &Path) -> bool {
        if self.is_full() {
            debug!(path = %path.display(), max = MAX_LISTENERS, "listener limit reached");
            return false;
        }

        if self
            .entries
            .iter()
            .any(|e| e.address == ListenAddress::Local(path.to_path_buf()))
        {
            debug!(path = %path.display(), "domain socket already listening");
            return false;
        }

        remove_stale_socket(path);

        match UnixListener::bind(path) {
            Ok(listener) => {
                info!(path = %path.display(), "listening for local connections");
                self.push(ListenerSocket::Unix(listener), ListenAddress::Local(path.to_path_buf()));
                true
            }
            Err(e) => {
                error!(address = %path.display(), error = %e, "unable to create listener socket");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn add_domain_socket(&mut self, path: &Path) -> bool {
        error!(address = %path.display(), "domain sockets are not supported on this platform");
        false
    }

    fn covered_by_dual_stack(&self, addr: &SocketAddr) -> bool {
        addr.is_ipv4()
            && addr.ip().is_unspecified()
            && self.entries.iter().any(|e| match &e.address {
                ListenAddress::Inet(a) => a.is_ipv6() && a.ip().is_unspecified() && a.port() == addr.port(),
                ListenAddress::Local(_) => false,
            })
    }

    fn push(&mut self, socket: ListenerSocket, address: ListenAddress) {
        self.entries.push(ListenerEntry {
            socket,
            interest: Interest::READABLE,
            address,
        });
    }
}

/// Remove a leftover socket file from a previous run. Regular files are left
/// alone so the bind fails loudly instead of clobbering data.
#[cfg(unix)]
fn remove_stale_socket(path: &Path) {
    use std::os::unix::fs::FileTypeExt;

    if let Ok(meta) = std::fs::symlink_metadata(path) {
        if meta.file_type().is_socket() {
            if let Err(e) = std::fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "could not remove stale socket");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    /// Resolver that answers from a fixed table.
    struct FixedResolver(Vec<SocketAddr>);

    impl AddressResolver for FixedResolver {
        fn resolve(&self, _host: &str, port: u16, family: AddressFamily) -> io::Result<Vec<SocketAddr>> {
            let addrs: Vec<SocketAddr> = self
                .0
                .iter()
                .filter(|a| family.matches(a))
                .map(|a| SocketAddr::new(a.ip(), port))
                .collect();
            if addrs.is_empty() {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such host"))
            } else {
                Ok(addrs)
            }
        }
    }

    fn loopback_v4() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn parse_targets() {
        assert_eq!(ListenTarget::parse(None), ListenTarget::AllInterfaces);
        assert_eq!(ListenTarget::parse(Some("")), ListenTarget::AllInterfaces);
        assert_eq!(
            ListenTarget::parse(Some("/run/app.sock")),
            ListenTarget::DomainSocket(PathBuf::from("/run/app.sock"))
        );
        assert_eq!(ListenTarget::parse(Some("10.0.0.5")), ListenTarget::Ipv4("10.0.0.5".into()));
        assert_eq!(ListenTarget::parse(Some("[::1]")), ListenTarget::Ipv6("::1".into()));
        assert_eq!(
            ListenTarget::parse(Some("printer.local")),
            ListenTarget::Hostname("printer.local".into())
        );
    }

    #[test]
    fn ipv4_literal_binds_loopback() {
        let mut set = ListenerSet::new();
        assert!(set.add(&ListenTarget::Ipv4("127.0.0.1".into()), 0, &SystemResolver));
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].interest, Interest::READABLE);
        match &set.addresses()[0] {
            ListenAddress::Inet(addr) => assert_ne!(addr.port(), 0),
            other => panic!("unexpected address {other}"),
        }
    }

    #[test]
    fn hostname_succeeds_when_only_one_family_resolves() {
        let mut set = ListenerSet::new();
        let resolver = FixedResolver(vec![loopback_v4()]);
        assert!(set.add(&ListenTarget::Hostname("box".into()), 0, &resolver));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unresolvable_host_adds_nothing() {
        let mut set = ListenerSet::new();
        let resolver = FixedResolver(Vec::new());
        assert!(!set.add(&ListenTarget::Hostname("nowhere".into()), 0, &resolver));
        assert!(set.is_empty());
    }

    #[test]
    fn stops_at_capacity() {
        let mut set = ListenerSet::new();
        let resolver = FixedResolver(vec![loopback_v4(); MAX_LISTENERS + 5]);
        assert!(set.add(&ListenTarget::Hostname("many".into()), 0, &resolver));
        assert_eq!(set.len(), MAX_LISTENERS);
        assert!(set.is_full());

        assert!(!set.add(&ListenTarget::Ipv4("127.0.0.1".into()), 0, &SystemResolver));
        assert_eq!(set.len(), MAX_LISTENERS);
    }

    #[cfg(unix)]
    #[test]
    fn domain_socket_at_capacity_is_refused_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.sock");
        let mut set = ListenerSet::new();
        let resolver = FixedResolver(vec![loopback_v4(); MAX_LISTENERS]);
        set.add(&ListenTarget::Hostname("many".into()), 0, &resolver);
        assert!(set.is_full());

        let (added, logged) = crate::test_logs::capture(|| {
            set.add(&ListenTarget::DomainSocket(path.clone()), 0, &SystemResolver)
        });
        assert!(!added);
        assert!(!path.exists());
        assert!(logged.contains("listener limit reached"), "{logged}");
        assert!(!logged.contains("ERROR"), "{logged}");
    }

    #[test]
    fn bracketed_ipv6_literal_binds_loopback() {
        // Hosts without an IPv6 stack cannot bind "::1" at all.
        if TcpListener::bind("[::1]:0").is_err() {
            return;
        }
        let target = ListenTarget::parse(Some("[::1]"));
        assert_eq!(target, ListenTarget::Ipv6("::1".into()));

        let mut set = ListenerSet::new();
        assert!(set.add(&target, 0, &SystemResolver));
        assert_eq!(set.len(), 1);
        match &set.addresses()[0] {
            ListenAddress::Inet(addr) => {
                assert!(addr.is_ipv6());
                assert!(addr.ip().is_loopback());
                assert_ne!(addr.port(), 0);
            }
            other => panic!("unexpected address {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn domain_socket_binds_and_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sock");

        // Leave a stale socket behind.
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let mut set = ListenerSet::new();
        assert!(set.add(&ListenTarget::DomainSocket(path.clone()), 0, &SystemResolver));
        assert_eq!(set.addresses(), vec![ListenAddress::Local(path.clone())]);

        // Same path twice is refused rather than stealing the live socket.
        assert!(!set.add(&ListenTarget::DomainSocket(path), 0, &SystemResolver));
        assert_eq!(set.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn domain_socket_in_missing_directory_fails() {
        let mut set = ListenerSet::new();
        let target = ListenTarget::DomainSocket(PathBuf::from("/nonexistent-dir/printhost/x.sock"));
        assert!(!set.add(&target, 0, &SystemResolver));
        assert!(set.is_empty());
    }

    #[test]
    fn cloned_socket_shares_address() {
        let mut set = ListenerSet::new();
        set.add(&ListenTarget::Ipv4("127.0.0.1".into()), 0, &SystemResolver);
        let clone = set.entries()[0].socket.try_clone().unwrap();
        match (clone, &set.entries()[0].socket) {
            (ListenerSocket::Tcp(a), ListenerSocket::Tcp(b)) => {
                assert_eq!(a.local_addr().unwrap(), b.local_addr().unwrap());
            }
            _ => panic!("expected TCP listeners"),
        }
    }
}
