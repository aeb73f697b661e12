//! Catalog Kernel
//!
//! HTTP server and data seeder for the catalog benchmark.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use clap::{Args, Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use catalog_kernel::seed::{self, SeedOptions};
use catalog_kernel::{AppState, Config, db};

#[derive(Parser, Debug)]
#[command(name = "catalog", version, about = "Catalog benchmark server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Generate and load benchmark data.
    Seed(SeedArgs),
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Number of categories
    #[arg(long, default_value_t = 2000)]
    categories: u32,

    /// Number of items, spread evenly over the categories
    #[arg(long, default_value_t = 100_000)]
    items: u32,

    /// Rows per insert statement
    #[arg(long, default_value_t = 5000)]
    batch_size: usize,

    /// RNG seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,

    /// Empty both tables before loading
    #[arg(long)]
    truncate: bool,
}

impl From<SeedArgs> for SeedOptions {
    fn from(args: SeedArgs) -> Self {
        Self {
            categories: args.categories,
            items: args.items,
            batch_size: args.batch_size,
            seed: args.seed,
            truncate: args.truncate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed(args) => {
            let pool = db::create_pool(&config).await?;
            seed::cmd_seed(&pool, &args.into()).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!(
        port = config.port,
        fetch = %config.fetch_mode,
        "Starting catalog server"
    );

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    // Build CORS layer from config
    let cors = build_cors_layer(&config);

    // Middleware layers (last added = first executed in request flow):
    // TraceLayer → CORS → request metrics → routes
    let app = catalog_kernel::app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
