//! minikernel server CLI
//!
//! A thin wrapper around the minikernel-server library.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

#[derive(Parser)]
#[command(name = "minikernel-server")]
#[command(about = "Remote Python-subset workspace with syntax-tree encoding")]
#[command(after_help = "\
EXAMPLES:
    # Empty workspace on the default port
    minikernel-server

    # Preload files as DataFrames named by file stem
    minikernel-server ./data/people.csv ./data/orders.parquet
    #   → people, orders
")]
struct Args {
    /// csv/parquet/ipc files to load into the workspace
    preload: Vec<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "7101")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let core = Arc::new(minikernel_server::KernelCore::new());
    for path in &args.preload {
        if let Err(e) = core.preload(path).await {
            log::error!("Failed to load {}: {}", path.display(), e);
        }
    }

    let router = minikernel_server::build_router_with_docs(core);

    let addr = format!("{}:{}", args.host, args.port);
    println!("Starting server on {}", addr);
    println!("  GET  / - Liveness");
    println!("  POST /exec - Run a program");
    println!("  POST /eval - Evaluate an expression");
    println!("  GET  /locals - List workspace names");
    println!("  GET  /getcols/<df> - Column types of a DataFrame");
    println!("  GET  /parse?code=<code>, POST /parse - Syntax tree as JSON");
    println!("  GET  /swagger-ui - API documentation");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
