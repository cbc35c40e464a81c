//! Process lifecycle: serve until a termination signal, then drain sessions
//! for a bounded grace period.

use anyhow::{Context, Result};
use axum::Router;
use std::{future::Future, net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

pub struct Supervisor {
    bind_address: SocketAddr,
    grace_period: Duration,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl Supervisor {
    pub fn new(bind_address: SocketAddr, grace_period: Duration) -> Self {
        Self {
            bind_address,
            grace_period,
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }

    /// Root token every session token derives from.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn sessions(&self) -> TaskTracker {
        self.sessions.clone()
    }

    /// Binds the configured address and serves until Ctrl-C or SIGTERM.
    pub async fn run(self, app: Router) -> Result<()> {
        let listener = TcpListener::bind(self.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_address))?;
        self.serve(listener, app, shutdown_signal()).await
    }

    /// Serves on `listener` until `signal` resolves, then stops accepting,
    /// cancels every session and waits up to the grace period for them to close.
    pub async fn serve<F>(self, listener: TcpListener, app: Router, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "Listening for voice sessions.");

        let token = self.shutdown.clone();
        let watcher = tokio::spawn(async move {
            signal.await;
            info!("Received shutdown signal. Shutting down gracefully...");
            token.cancel();
        });

        let mut server = tokio::spawn(
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .into_future(),
        );

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {}
            result = &mut server => {
                // The server stopped without a shutdown signal.
                watcher.abort();
                self.shutdown.cancel();
                self.sessions.close();
                result.context("Server task panicked")?.context("Server failed")?;
                return Ok(());
            }
        }

        self.sessions.close();
        let drain = async {
            if let Err(e) = (&mut server).await {
                error!(error = %e, "Server task failed during shutdown.");
            }
            self.sessions.wait().await;
        };
        if tokio::time::timeout(self.grace_period, drain).await.is_err() {
            warn!(
                remaining = self.sessions.len(),
                grace_period = ?self.grace_period,
                "Grace period elapsed; force-closing remaining sessions."
            );
            server.abort();
        }

        info!("Server has shut down.");
        Ok(())
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
