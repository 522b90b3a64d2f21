//! REST API server for the NexGen cost dashboard
//!
//! Usage:
//!   ./target/release/nexgen_cost_intel [options]
//!
//! Options:
//!   --port PORT        Port to listen on (default: 8080, env NEXGEN_PORT)
//!   --view-cache N     Filter selections kept in memory (default: 32)
//!   --data-dir DIR     Directory with the seven CSV files (default: data)
//!   --model MODEL      random-forest | linear
//!
//! REST endpoints (all accept ?carrier=&product_category=&warehouse_id=&from=&to=):
//!   GET /api/v1/health           - Health check
//!   GET /api/v1/dashboard        - Full dashboard view
//!   GET /api/v1/overview         - Key metrics and data quality
//!   GET /api/v1/orders?limit=N   - Joined orders
//!   GET /api/v1/aggregates       - Cost aggregates
//!   GET /api/v1/forecast         - Cost forecast
//!   GET /api/v1/recommendations  - Optimization strategies

use anyhow::Result;
use clap::Parser;
use nexgen_cost_intel::api::service::DEFAULT_VIEW_CAPACITY;
use nexgen_cost_intel::api::{create_router, DashboardService};
use nexgen_cost_intel::config::Config;
use nexgen_cost_intel::dashboard::Dashboard;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "nexgen_cost_intel")]
#[command(about = "Serve the logistics cost dashboard over REST")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "NEXGEN_PORT", default_value_t = 8080)]
    port: u16,

    /// Number of filter selections whose views are kept in memory
    #[arg(long, env = "NEXGEN_VIEW_CACHE", default_value_t = DEFAULT_VIEW_CAPACITY)]
    view_cache: usize,

    #[command(flatten)]
    config: Config,
}

fn print_banner(port: u16, config: &Config) {
    println!("============================================================");
    println!("         NEXGEN COST INTELLIGENCE API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!("  Data:     {}", config.data.data_dir.display());
    println!("  Model:    {:?}", config.forecast.model);
    println!();
    println!("REST Endpoints:");
    println!("  GET /api/v1/health              Health check");
    println!("  GET /api/v1/dashboard           Full dashboard view");
    println!("  GET /api/v1/overview            Key metrics");
    println!("  GET /api/v1/orders              Joined orders");
    println!("  GET /api/v1/aggregates          Cost aggregates");
    println!("  GET /api/v1/forecast            Cost forecast");
    println!("  GET /api/v1/recommendations     Strategies");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    print_banner(args.port, &args.config);

    let config = args.config;
    let dashboard = tokio::task::spawn_blocking(move || Dashboard::load(config)).await??;
    let service = Arc::new(DashboardService::with_view_capacity(dashboard, args.view_cache));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let app = create_router(service);
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
