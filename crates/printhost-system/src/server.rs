// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Accept loop serving the system's listeners.
//
// `run` marks the system running, moves each bound listener onto the tokio
// runtime, and hands every accepted connection to a `ConnectionHandler` on
// its own task. It returns once the shutdown `Notify` fires and every accept
// loop has stopped.
//
// Request parsing belongs to the handler. The bundled `StatusPageHandler`
// answers any request with a plain-text status page, and accepts
// "POST /shutdown" from the local domain socket.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, instrument, warn};

use printhost_core::error::{PrinthostError, Result};

use crate::listeners::ListenerSocket;
use crate::system::System;

/// Most bytes read while looking for the end of a request head.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Where a connection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    Inet(SocketAddr),
    /// Unix domain socket; only reachable by local users.
    Local,
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inet(addr) => write!(f, "{addr}"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Serves one accepted connection.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle<S>(
        &self,
        system: Arc<System>,
        stream: S,
        peer: Peer,
    ) -> impl Future<Output = Result<()>> + Send
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static;
}

/// Run the accept loop until `shutdown` is notified.
///
/// Fails without marking the system running if no listeners were added.
#[instrument(skip_all, fields(system = %system.name()))]
pub async fn run<H: ConnectionHandler>(
    system: Arc<System>,
    handler: Arc<H>,
    shutdown: Arc<Notify>,
) -> Result<()> {
    let sockets = system.listener_sockets()?;
    if sockets.is_empty() {
        return Err(PrinthostError::Server("no listeners to serve".into()));
    }

    system.mark_running();

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut tasks = Vec::with_capacity(sockets.len());

    for (address, socket) in sockets {
        info!(%address, "serving listener");
        match socket {
            ListenerSocket::Tcp(listener) => {
                listener.set_nonblocking(true)?;
                let listener = TcpListener::from_std(listener)?;
                tasks.push(tokio::spawn(accept_tcp(
                    listener,
                    Arc::clone(&system),
                    Arc::clone(&handler),
                    stop_rx.clone(),
                )));
            }
            #[cfg(unix)]
            ListenerSocket::Unix(listener) => {
                listener.set_nonblocking(true)?;
                let listener = UnixListener::from_std(listener)?;
                tasks.push(tokio::spawn(accept_unix(
                    listener,
                    Arc::clone(&system),
                    Arc::clone(&handler),
                    stop_rx.clone(),
                )));
            }
        }
    }

    shutdown.notified().await;
    info!("shutdown requested");
    // `stop_rx` is still alive, so this cannot fail.
    let _ = stop_tx.send(true);

    for task in tasks {
        task.await
            .map_err(|e| PrinthostError::Server(format!("task join: {e}")))?;
    }
    info!("accept loops stopped");
    Ok(())
}

async fn accept_tcp<H: ConnectionHandler>(
    listener: TcpListener,
    system: Arc<System>,
    handler: Arc<H>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => {
                debug!("accept loop received shutdown signal");
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        debug!(peer = %peer_addr, "incoming connection");
                        spawn_connection(stream, Peer::Inet(peer_addr), &system, &handler);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
async fn accept_unix<H: ConnectionHandler>(
    listener: UnixListener,
    system: Arc<System>,
    handler: Arc<H>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => {
                debug!("local accept loop received shutdown signal");
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        debug!("incoming local connection");
                        spawn_connection(stream, Peer::Local, &system, &handler);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept local connection");
                    }
                }
            }
        }
    }
}

fn spawn_connection<H, S>(stream: S, peer: Peer, system: &Arc<System>, handler: &Arc<H>)
where
    H: ConnectionHandler,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let system = Arc::clone(system);
    let handler = Arc::clone(handler);
    tokio::spawn(async move {
        if let Err(e) = handler.handle(system, stream, peer).await {
            warn!(%peer, error = %e, "connection handler error");
        }
    });
}

// ---------------------------------------------------------------------------
// Status page handler
// ---------------------------------------------------------------------------

/// Answers every request with a plain-text summary of the system.
#[derive(Debug, Default, Clone)]
pub struct StatusPageHandler {
    shutdown: Option<Arc<Notify>>,
}

impl StatusPageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let local clients stop the server with "POST /shutdown".
    pub fn with_shutdown(shutdown: Arc<Notify>) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }
}

impl ConnectionHandler for StatusPageHandler {
    fn handle<S>(
        &self,
        system: Arc<System>,
        mut stream: S,
        peer: Peer,
    ) -> impl Future<Output = Result<()>> + Send
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        async move {
            let head = read_request_head(&mut stream).await?;
            let request_line = head.lines().next().unwrap_or_default();
            let header = system.server_header();

            if request_line.starts_with("POST /shutdown ") {
                return match (&shutdown, peer) {
                    (Some(shutdown), Peer::Local) => {
                        info!("shutdown requested by local client");
                        write_response(&mut stream, "200 OK", &header, "shutting down\n").await?;
                        shutdown.notify_one();
                        Ok(())
                    }
                    _ => {
                        warn!(%peer, "refused remote shutdown request");
                        write_response(&mut stream, "403 Forbidden", &header, "forbidden\n").await
                    }
                };
            }

            let body = status_page(&system);
            write_response(&mut stream, "200 OK", &header, &body).await
        }
    }
}

/// Plain-text status page built from the system getters.
pub fn status_page(system: &System) -> String {
    let contact = system.contact();
    let unset = || "(not set)".to_owned();
    let mut page = String::with_capacity(512);

    page.push_str(&format!("{}\n", system.name()));
    page.push_str(&format!("uuid: {}\n", system.uuid()));
    page.push_str(&format!("hostname: {}\n", system.hostname().unwrap_or_else(unset)));
    page.push_str(&format!("location: {}\n", system.location().unwrap_or_else(unset)));
    page.push_str(&format!(
        "organization: {}\n",
        system.organization().unwrap_or_else(unset)
    ));
    if !contact.name.is_empty() {
        page.push_str(&format!("contact: {} <{}> {}\n", contact.name, contact.email, contact.telephone));
    }
    page.push_str(&format!("port: {}\n", system.port()));
    page.push_str(&format!("listeners: {}\n", system.listener_count()));
    page.push_str(&format!("drivers: {}\n", system.print_drivers().len()));
    page.push_str(&format!("log level: {}\n", system.log_level()));
    page.push_str(&format!("tls only: {}\n", system.tls_only()));
    page.push_str(&format!("config changes: {}\n", system.config_changes()));
    page
}

/// Read until the blank line ending the request head, EOF, or the size cap.
async fn read_request_head<S: AsyncRead + Unpin>(stream: &mut S) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    while buf.len() < MAX_HEAD_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn write_response<S: AsyncWrite + Unpin>(
    stream: &mut S,
    status: &str,
    server: &str,
    body: &str,
) -> Result<()> {
    let head = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Server: {server}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );

    stream
        .write_all(head.as_bytes())
        .await
        .map_err(|e| PrinthostError::Server(format!("write HTTP headers: {e}")))?;
    stream
        .write_all(body.as_bytes())
        .await
        .map_err(|e| PrinthostError::Server(format!("write body: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| PrinthostError::Server(format!("flush: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::{ListenAddress, SystemResolver};
    use crate::system::noop_registrar;
    use printhost_core::config::SystemConfig;

    fn test_system() -> Arc<System> {
        let config = SystemConfig {
            name: "Served System".into(),
            hostname: Some("served.local".into()),
            port: 0,
            spool_dir: Some(std::env::temp_dir()),
            ..SystemConfig::default()
        };
        Arc::new(
            System::with_collaborators(config, Arc::new(SystemResolver), noop_registrar())
                .expect("system"),
        )
    }

    #[tokio::test]
    async fn run_without_listeners_fails() {
        let system = test_system();
        let result = run(
            Arc::clone(&system),
            Arc::new(StatusPageHandler::new()),
            Arc::new(Notify::new()),
        )
        .await;
        assert!(matches!(result, Err(PrinthostError::Server(_))));
        assert!(!system.is_running());
    }

    #[tokio::test]
    async fn serves_status_page_until_shutdown() {
        let system = test_system();
        assert!(system.add_listeners(Some("127.0.0.1")));
        let addr = match &system.listener_addresses()[0] {
            ListenAddress::Inet(addr) => *addr,
            other => panic!("unexpected listener {other}"),
        };

        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(run(
            Arc::clone(&system),
            Arc::new(StatusPageHandler::new()),
            Arc::clone(&shutdown),
        ));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: served.local\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Server: Printhost/"));
        assert!(response.contains("Served System"));
        assert!(response.contains("hostname: served.local"));
        assert!(system.is_running());

        // Listeners cannot be added once serving.
        assert!(!system.add_listeners(Some("127.0.0.1")));

        shutdown.notify_one();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn remote_shutdown_is_refused() {
        let system = test_system();
        system.add_listeners(Some("127.0.0.1"));
        let addr = match &system.listener_addresses()[0] {
            ListenAddress::Inet(addr) => *addr,
            other => panic!("unexpected listener {other}"),
        };

        let shutdown = Arc::new(Notify::new());
        let handler = Arc::new(StatusPageHandler::with_shutdown(Arc::clone(&shutdown)));
        let server = tokio::spawn(run(Arc::clone(&system), handler, Arc::clone(&shutdown)));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client.write_all(b"POST /shutdown HTTP/1.1\r\n\r\n").await.unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 403 Forbidden"));

        shutdown.notify_one();
        server.await.unwrap().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn local_client_can_request_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("served.sock");
        let system = test_system();
        assert!(system.add_listeners(path.to_str()));

        let shutdown = Arc::new(Notify::new());
        let handler = Arc::new(StatusPageHandler::with_shutdown(Arc::clone(&shutdown)));
        let server = tokio::spawn(run(Arc::clone(&system), handler, shutdown));

        let mut client = tokio::net::UnixStream::connect(&path).await.unwrap();
        client.write_all(b"POST /shutdown HTTP/1.1\r\n\r\n").await.unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.contains("shutting down"));

        server.await.unwrap().unwrap();
    }

    #[test]
    fn status_page_lists_contact() {
        let system = test_system();
        system.set_contact(printhost_core::types::Contact::new("Ada", "ada@example.com", "555"));
        let page = status_page(&system);
        assert!(page.starts_with("Served System\n"));
        assert!(page.contains("contact: Ada <ada@example.com> 555"));
        assert!(page.contains("location: (not set)"));
    }
}
