use anyhow::{Context, Result};
use axum::Router;
use colored::Colorize;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;

use crate::session::SessionController;
use crate::web::routes::{self, AppState};
use crate::web::session_manager::SessionManager;

/// Form posts are a username, an email, a password or one question
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
    /// Sessions untouched for this long are dropped
    pub session_idle: Duration,
}

/// Web server instance
pub struct WebServer {
    config: WebServerConfig,
    state: AppState,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: WebServerConfig, controller: SessionController) -> Self {
        let sessions = SessionManager::with_idle_timeout(config.session_idle);
        Self {
            state: AppState::with_sessions(controller, sessions),
            config,
        }
    }

    /// Router with all routes and layers, ready to serve
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
    }

    /// Start the web server; returns after Ctrl-C
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        println!("🌐 Web server starting on http://{}", self.config.bind_addr);
        println!("   History API: http://{}/api/history", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;
        let sweeper = spawn_session_sweeper(&self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        sweeper.abort();

        println!("{}", "Shutting down web server".bright_black());
        self.state.controller.lock().await.shutdown().await;
        Ok(())
    }
}

/// Periodically forget idle browser sessions
fn spawn_session_sweeper(state: &AppState) -> tokio::task::JoinHandle<()> {
    let sessions = state.sessions.clone();
    let period = (sessions.idle_timeout() / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let dropped = sessions.sweep_idle().await;
            if dropped > 0 {
                println!(
                    "{}",
                    format!("Dropped {} idle session(s)", dropped).bright_black()
                );
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("{} Failed to listen for Ctrl-C: {}", "⚠️".yellow(), e);
        std::future::pending::<()>().await;
    }
}
