mod api;
mod config;
mod db;
mod models;
mod schema;
mod seeding;
mod services;

use anyhow::Result;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::DbPool;
use crate::services::capture::CaptureService;
use crate::services::regen_service::RegenService;
use crate::services::storage::{SlideStore, SpacesStore};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub regen: Arc<RegenService>,
}

use clap::Parser;

#[derive(Parser)]
#[command(version, author = "MENUCAST AUTHORS", about = "Menucast Server\nLicensed under AGPLv3\nCreated by MENUCAST AUTHORS", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

fn run_onboarding() -> Result<()> {
    use dialoguer::{theme::ColorfulTheme, Input};

    println!("Welcome to Menucast Server!");
    println!("It looks like you don't have a configuration file yet.");
    println!("Let's get you set up.\n");

    let host: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Host")
        .default("0.0.0.0".to_string())
        .interact_text()?;

    let port: u16 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Port")
        .default(8080)
        .interact_text()?;

    let db_url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Database Path")
        .default("menucast.db".to_string())
        .interact_text()?;

    let base_url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Display page base URL")
        .default("https://menucast.example".to_string())
        .interact_text()?;

    let config_content = format!(
        r#"[server]
host = "{}"
port = {}

[database]
url = "{}"

[logging]
level = "info"

[render]
base_url = "{}"
viewport_width = 1920
viewport_height = 1080
quality = 90
max_wait_secs = 30
ready_poll_secs = 10
settle_ms = 500
live_settle_ms = 2500
snapshot_capture = true
max_concurrent_screens = 2

[capture.local]
enabled = true

# Add [capture.batch] / [capture.single] and [storage.spaces] to enable
# remote capture and slide publishing. See --generate-config for the shape.
"#,
        host, port, db_url, base_url
    );

    println!("\nGenerating configuration file: server-config.toml");
    std::fs::write("server-config.toml", &config_content)?;
    println!("Configuration saved successfully!");
    println!("----------------------------------------\n");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::default_template());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "menucast_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| "server-config.toml".to_string());

    // First run without an explicit config in an interactive terminal:
    // offer onboarding instead of bailing.
    if std::fs::metadata(&config_path).is_err()
        && cli.config.is_none()
        && console::user_attended()
    {
        if let Err(e) = run_onboarding() {
            eprintln!("Onboarding failed: {}", e);
            std::process::exit(1);
        }
    }

    let effective_config_path = if std::fs::metadata(&config_path).is_ok() {
        config_path
    } else if std::fs::metadata("server-config.toml").is_ok() {
        "server-config.toml".to_string()
    } else {
        eprintln!("Error: Configuration file '{}' not found.", config_path);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    };

    // Load configuration
    let config = Config::load(&effective_config_path)?;
    tracing::info!("Loaded configuration from {}", effective_config_path);

    // Setup database
    let db_pool = db::create_pool(&config.database.url)?;
    db::run_migrations(&mut *db_pool.get()?)?;
    // Seed demo content
    seeding::seed_defaults(&db_pool)?;
    tracing::info!("Database initialized and seeded");

    // Capture backends and object storage; either may be absent, the
    // pipeline then answers with explanatory results instead of working.
    let capture = Arc::new(CaptureService::from_config(&config.capture));
    let store: Option<Arc<dyn SlideStore>> =
        match SpacesStore::from_config(config.storage.spaces.as_ref()).await {
            Some(store) => Some(Arc::new(store)),
            None => {
                tracing::warn!("Object storage not configured; slide publishing disabled");
                None
            }
        };

    let regen = Arc::new(RegenService::new(
        db_pool.clone(),
        store,
        capture,
        config.render.clone(),
    ));

    let state = AppState {
        db: db_pool,
        config: Arc::new(config),
        regen,
    };

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );

    // Build router
    let app = axum::Router::new()
        .nest("/api", api::routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {} (HTTP)", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
