use checkout_bridge::api::health::ENDPOINTS;
use checkout_bridge::config::{AppConfig, LoggingConfig};
use checkout_bridge::logging::init_tracing;
use checkout_bridge::server::{build_router, AppState};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown");
}

fn print_banner(addr: &SocketAddr, public_base_url: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                                                              ║");
    println!("║          🚀 CHECKOUT BRIDGE IS RUNNING 🚀                    ║");
    println!("║                                                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  🌐 Listening:   http://{}", addr);
    println!("║  🔗 Public URL:  {}", public_base_url);
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  📡 AVAILABLE ENDPOINTS:                                     ║");
    for endpoint in ENDPOINTS {
        println!("║     {}", endpoint);
    }
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  💡 Try it out:                                              ║");
    println!("║     curl http://{}/health", addr);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::from_env().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "❌ Invalid configuration");
            return Err(e.into());
        }
    };

    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting checkout bridge service"
    );
    info!(
        host = %config.server.host,
        port = config.server.port,
        payments = ?config.payments,
        "Server configuration loaded"
    );

    let state = AppState::from_config(&config).map_err(|e| {
        error!(error = %e, "❌ Failed to initialise application state");
        e
    })?;
    let app = build_router(state);

    info!("✅ Routes configured");

    let addr: SocketAddr = config.server.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    print_banner(&addr, &config.server.public_base_url);

    info!(address = %addr, "🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}
