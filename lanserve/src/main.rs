//! Lanserve - share a static site on the local network
//!
//! This is the main entry point for the Lanserve CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use lanserve_core::config::{ConfigLoader, ServeConfig};
use lanserve_core::net::{self, HostAddresses};
use lanserve_core::server::HttpServer;

/// Lanserve - serve a directory of website files to everyone on your network
#[derive(Parser)]
#[command(name = "lanserve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server; the config file's directory becomes the serving root
    Run {
        /// Path to the configuration file
        #[arg(default_value = "lanserve.toml")]
        config: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "lanserve.toml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = match ConfigLoader::load(&config) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };

            if let Err(e) = lanserve_core::logging::init(&config.log_path(), cli.verbose) {
                eprintln!("❌ Failed to set up logging: {}", e);
                std::process::exit(1);
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(serve(config))
        }

        Commands::Validate { config } => {
            match ConfigLoader::load(&config) {
                Ok(loaded) => {
                    println!(
                        "✅ Configuration '{}' is valid! Serving root: {}",
                        config.display(),
                        loaded.root.display()
                    );
                }
                Err(e) => {
                    eprintln!("❌ Configuration Error: {}", e);
                    std::process::exit(1);
                }
            }
            Ok(())
        }

        Commands::Version => {
            println!("Lanserve v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Start the server, show how to reach it, then idle until a signal
async fn serve(config: ServeConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Lanserve network server...");

    let mut server = HttpServer::new(config.clone());
    if server.start().await.is_err() {
        tracing::error!("Server startup failed. Exiting.");
        std::process::exit(1);
    }
    let port = server.local_addr().map(|a| a.port()).unwrap_or(config.port);

    let addresses = net::discover();
    display_banner(&config, port, &addresses);
    tracing::info!("Site is now accessible on the local network");

    if config.open_browser {
        let url = format!("http://localhost:{}", port);
        match open::that(&url) {
            Ok(()) => tracing::info!("Opened site in browser"),
            Err(e) => tracing::warn!("Could not open browser: {}", e),
        }
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                println!("\nShutdown signal received. Closing server...");
                server.stop().await;
                std::process::exit(0);
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if !server.is_running() {
                    tracing::error!("Serve loop exited unexpectedly");
                    server.stop().await;
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Print the startup summary with every URL the site answers on
fn display_banner(config: &ServeConfig, port: u16, addresses: &HostAddresses) {
    println!("\n=================================================================");
    println!("  🌐 Lanserve v{}", env!("CARGO_PKG_VERSION"));
    println!("=================================================================");
    println!("  📂 Serving files from: {}", config.root.display());
    println!("  🖥️  Local access:       http://localhost:{}", port);
    println!("  🖥️  Computer access:    http://{}:{}", addresses.local, port);

    if !addresses.lan.is_empty() {
        println!("\n  📱 Access from other devices on your network:");
        for ip in &addresses.lan {
            println!("     http://{}:{}", ip, port);
        }
    }

    println!("\n  📋 INSTRUCTIONS:");
    println!("  - Share any of the above URLs with people on your network");
    println!("  - All requests are logged to {}", config.log_file);
    println!("  - Press Ctrl+C to stop the server");
    println!("=================================================================\n");
}

/// Resolve when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
