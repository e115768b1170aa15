//! Veritas server CLI
//!
//! Starts the HTTP server for claim verification.

use std::env;
use std::process;
use tracing_subscriber::EnvFilter;
use veritas_router::{config::ServerConfig, start_server, RouterError};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), RouterError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using defaults");
        eprintln!("Usage: veritas --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default()
    };

    start_server(config).await
}

fn print_help() {
    println!("Veritas - Claim verification server");
    println!();
    println!("USAGE:");
    println!("    veritas --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                  Log filter (default: info)");
    println!("    GROQ_API_KEY              Generation API key");
    println!("    TAVILY_API_KEY            Search API key");
    println!("    NEWSGUARD_CLIENT_ID       Rating client id");
    println!("    NEWSGUARD_CLIENT_SECRET   Rating client secret");
    println!("    NEO4J_PASSWORD            Graph password (neo4j backend)");
    println!();
    println!("    Each variable name can be changed in the config file.");
    println!();
}
