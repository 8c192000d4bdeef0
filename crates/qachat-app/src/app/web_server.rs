use anyhow::Result;

use crate::app::setup::{build_controller, AppConfig};
use crate::web::server::{WebServer, WebServerConfig};

/// Run the web server
pub async fn run_web_server(config: &AppConfig) -> Result<()> {
    let addr = config.web_socket_addr()?;

    println!("🌐 Starting qachat web server...");
    println!("   Address: {}", addr);
    println!("   Data directory: {}", config.paths.data_dir.display());
    println!(
        "   Model: {} ({})",
        config.client_options.model,
        config.backend.display_name()
    );

    let controller = build_controller(config).await?;
    let server = WebServer::new(WebServerConfig {
            bind_addr: addr,
            session_idle: config.session_idle,
        }, controller);
    server.start().await
}
