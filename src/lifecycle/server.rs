//! Top-level lifecycle owner.
//!
//! # Responsibilities
//! - Bind the acceptor and run the accept loop on its own task
//! - Wrap each accepted connection in a session, register it, spawn it
//! - Stop: flag, sweep the registry, join the accept loop, drain

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::IntercomConfig;
use crate::lifecycle::Shutdown;
use crate::net::{Acceptor, ListenerError, SessionTracker};
use crate::session::{
    CollaboratorFactory, ProcessCollaborators, Session, SessionHandle, SessionRegistry, SessionSettings,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Failed to read listener address: {0}")]
    LocalAddr(#[from] io::Error),

    #[error("Server already started")]
    AlreadyStarted,

    #[error("Server has been stopped")]
    Stopped,
}

/// The intercom server: acceptor plus the registry of live sessions.
pub struct Server {
    config: Arc<IntercomConfig>,
    registry: SessionRegistry,
    tracker: SessionTracker,
    factory: Arc<dyn CollaboratorFactory>,
    running: Arc<AtomicBool>,
    shutdown: Shutdown,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Server whose sessions use the configured external programs.
    pub fn new(config: IntercomConfig) -> Self {
        let config = Arc::new(config);
        let factory = Arc::new(ProcessCollaborators::new(Arc::clone(&config)));
        Self::build(config, factory)
    }

    /// Server whose sessions get their collaborators from `factory`.
    pub fn with_collaborators(config: IntercomConfig, factory: Arc<dyn CollaboratorFactory>) -> Self {
        Self::build(Arc::new(config), factory)
    }

    fn build(config: Arc<IntercomConfig>, factory: Arc<dyn CollaboratorFactory>) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            tracker: SessionTracker::new(),
            factory,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Shutdown::new(),
            accept_task: Mutex::new(None),
        }
    }

    /// Bind and start accepting. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut accept_task = self.accept_task.lock().await;
        if self.shutdown.is_triggered() {
            return Err(ServerError::Stopped);
        }
        if accept_task.is_some() {
            return Err(ServerError::AlreadyStarted);
        }

        let acceptor = Acceptor::bind(&self.config.listener, &self.config.keepalive).await?;
        let local_addr = acceptor.local_addr()?;
        self.running.store(true, Ordering::SeqCst);

        let accept_loop = AcceptLoop {
            acceptor,
            config: Arc::clone(&self.config),
            registry: self.registry.clone(),
            tracker: self.tracker.clone(),
            factory: Arc::clone(&self.factory),
            running: Arc::clone(&self.running),
            shutdown_rx: self.shutdown.subscribe(),
        };
        *accept_task = Some(tokio::spawn(accept_loop.run()));

        tracing::info!(address = %local_addr, "Server started");
        Ok(local_addr)
    }

    /// Stop accepting, stop every session, and wait for the accept loop to
    /// exit and the registry to drain. Safe to call repeatedly and from any
    /// task; a call made while another is in progress returns after it.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if self.shutdown.trigger() {
            tracing::info!(clients = self.registry.len(), "Stopping server");
        }
        self.registry.stop_all();

        // Held until the drain is over so concurrent callers queue behind it.
        let mut accept_task = self.accept_task.lock().await;
        let Some(task) = accept_task.take() else {
            return;
        };
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Accept loop task failed");
        }
        // Anything accepted while the loop was winding down.
        self.registry.stop_all();

        let drain = self.config.timeouts.drain();
        if !self.registry.wait_until_empty(drain).await {
            tracing::warn!(remaining = self.registry.len(), "Sessions still registered after drain deadline");
        }
        if !self.tracker.wait_until_idle(drain).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Session tasks still running after drain deadline"
            );
        }
        tracing::info!("Server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of registered sessions.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

/// State moved onto the accept loop's task.
struct AcceptLoop {
    acceptor: Acceptor,
    config: Arc<IntercomConfig>,
    registry: SessionRegistry,
    tracker: SessionTracker,
    factory: Arc<dyn CollaboratorFactory>,
    running: Arc<AtomicBool>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl AcceptLoop {
    async fn run(mut self) {
        let accept_timeout = self.config.timeouts.accept();

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => break,
                accepted = tokio::time::timeout(accept_timeout, self.acceptor.accept()) => match accepted {
                    // Accept timeout: re-check the running flag.
                    Err(_) => {}
                    Ok(Ok((stream, peer))) => self.spawn_session(stream, peer),
                    Ok(Err(e)) => tracing::warn!(error = %e, "Failed to accept connection"),
                },
            }
        }

        tracing::info!("Accept loop exited");
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let max_clients = self.config.listener.max_clients;
        let live = self.registry.len();
        if live >= max_clients {
            tracing::warn!(peer_addr = %peer, live, max_clients, "Client limit reached, serving anyway");
        }

        let handle = SessionHandle::new(peer, self.registry.clone());
        self.registry.register(Arc::clone(&handle));
        if !self.running.load(Ordering::SeqCst) {
            handle.stop();
        }

        let guard = self.tracker.track(handle.id());
        let span = tracing::info_span!("session", session_id = %handle.id(), peer_addr = %peer);
        tracing::info!(parent: &span, clients = self.registry.len(), "Client connected");

        let settings = SessionSettings::from_config(&self.config);
        let factory = Arc::clone(&self.factory);
        tokio::spawn(
            async move {
                let _guard = guard;
                Session::new(stream, handle, settings).run(factory.as_ref()).await;
            }
            .instrument(span),
        );
    }
}
