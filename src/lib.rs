pub mod api;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
pub use config::Config;
use db::Store;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = config.general.log_level.clone();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "permitr")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "daemon" | "-d" | "--daemon" => run_daemon(config, prometheus_handle).await,

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "account" => {
            if args.len() < 3 {
                println!("Usage: permitr account <subcommand>");
                println!("Subcommands: create-admin");
                return Ok(());
            }
            match args[2].as_str() {
                "create-admin" => {
                    if args.len() < 5 {
                        println!("Usage: permitr account create-admin <email> <display name>");
                        println!("Example: permitr account create-admin ops@site.example \"Site Ops\"");
                        return Ok(());
                    }
                    let email = &args[3];
                    let display_name = args[4..].join(" ");
                    cmd_create_admin(&config, email, &display_name).await
                }
                _ => {
                    println!("Unknown account subcommand: {}", args[2]);
                    println!("Use: create-admin");
                    Ok(())
                }
            }
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Permitr - Permit-to-Work Tracking Service");
    println!();
    println!("USAGE:");
    println!("  permitr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  daemon            Run the API server");
    println!("  account <subcmd>  Manage accounts (create-admin)");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  permitr init                                      # Write config.toml");
    println!("  permitr daemon                                    # Start the server");
    println!("  permitr account create-admin ops@site.example Ops # Bootstrap an admin");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the server, sessions, and security.");
}

async fn cmd_create_admin(config: &Config, email: &str, display_name: &str) -> anyhow::Result<()> {
    use db::repositories::account::{generate_token, hash_password};
    use models::account::Role;

    let store = Store::new(&config.general.database_path).await?;

    if store.account_email_in_use(email).await? {
        println!("An account with email {} already exists.", email);
        return Ok(());
    }

    // Random initial password, printed once; rotate it after first login.
    let password: String = generate_token().chars().take(16).collect();

    let security = config.security.clone();
    let password_for_hash = password.clone();
    let password_hash = tokio::task::spawn_blocking(move || {
        hash_password(&password_for_hash, Some(&security))
    })
    .await
    .context("Password hashing task panicked")??;

    let account = store
        .create_account(Role::Admin, email, display_name, &password_hash)
        .await?;

    println!("✓ Admin account created");
    println!("  Email:    {}", account.email);
    println!("  Password: {}", password);
    println!();
    println!("Change this password after the first login.");

    Ok(())
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Permitr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let api_state = api::create_app_state(shared, prometheus_handle);

    let port = config.server.port;
    let app = api::router(api_state).await;
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("🌐 API server running at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Daemon stopped");

    Ok(())
}
