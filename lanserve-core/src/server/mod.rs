//! HTTP server lifecycle
//!
//! Owns the listening socket and the background accept/serve task, and
//! coordinates graceful shutdown.

mod handler;

use crate::config::ServeConfig;
use crate::error::{Error, Result};
use lanserve_static::{FileServer, FileServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use handler::ServerContext;

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// The HTTP server instance
///
/// Owned by a single administrative actor; start and stop transitions are
/// not expected to race.
pub struct HttpServer {
    config: ServeConfig,
    state: State,
    running: Arc<AtomicBool>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl HttpServer {
    /// Create a server from configuration; nothing is bound yet
    pub fn new(config: ServeConfig) -> Self {
        Self {
            config,
            state: State::Stopped,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
            task: None,
            local_addr: None,
        }
    }

    /// True while the socket is bound and the accept task is alive
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and launch the accept/serve loop
    ///
    /// Bind or listen failure is fatal for startup: it is logged and
    /// returned without transitioning to Running.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            tracing::warn!("Server already running on {:?}", self.local_addr);
            return Ok(());
        }
        self.state = State::Starting;

        let files = FileServer::new(FileServerConfig {
            root: self.config.root.clone(),
            index: vec![self.config.index_file.clone()],
        });
        let context = match ServerContext::new(self.config.clone(), files) {
            Ok(context) => Arc::new(context),
            Err(e) => {
                self.state = State::Stopped;
                tracing::error!("{}", e);
                return Err(e);
            }
        };

        let addr = match self.config.bind_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.state = State::Stopped;
                tracing::error!("{}", e);
                return Err(e);
            }
        };
        let listener = match bind_reusable(addr) {
            Ok(listener) => listener,
            Err(e) => {
                self.state = State::Stopped;
                let err = Error::Server(format!("Failed to bind {}: {}", addr, e));
                tracing::error!("{}", err);
                return Err(err);
            }
        };
        let bound = listener.local_addr()?;
        self.local_addr = Some(bound);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        self.task = Some(tokio::spawn(accept_loop(
            listener,
            context,
            shutdown_rx,
            running,
        )));

        self.state = State::Running;
        tracing::info!("HTTP server started on {}", bound);
        Ok(())
    }

    /// Stop accepting connections, then wait (bounded) for in-flight work
    ///
    /// Idempotent: stopping a stopped server only logs. In-flight requests
    /// are never aborted, only waited on up to the shutdown grace.
    pub async fn stop(&mut self) {
        if self.state == State::Stopped {
            tracing::info!("Server already stopped");
            return;
        }
        self.state = State::Stopping;
        tracing::info!("Shutting down server...");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }

        if let Some(task) = self.task.take() {
            match tokio::time::timeout(self.config.shutdown_grace(), task).await {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => tracing::error!("Serve loop terminated abnormally: {}", e),
                Err(_) => tracing::warn!(
                    "Timed out after {:?} waiting for in-flight requests",
                    self.config.shutdown_grace()
                ),
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.local_addr = None;
        self.state = State::Stopped;
        tracing::info!("Server shutdown complete");
    }
}

/// Bind a listener with address reuse enabled
fn bind_reusable(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

/// Accept connections until the shutdown signal fires
///
/// Connections are served to completion one at a time; the per-request
/// timeout bounds how long any one client can hold the loop. Accept
/// errors are logged and the loop continues.
async fn accept_loop(
    listener: TcpListener,
    context: Arc<ServerContext>,
    mut shutdown_rx: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    handler::serve_connection(stream, peer, Arc::clone(&context)).await;
                }
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            },
            _ = shutdown_rx.changed() => break,
        }
    }
    running.store(false, Ordering::SeqCst);
}
