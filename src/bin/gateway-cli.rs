use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use token_gateway::client::{GatewayClient, RouteCache, RouteSource};
use token_gateway::routing::EndpointKind;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client for the token gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:80")]
    url: String,

    /// HTTP method of the gateway's handshake signal
    #[arg(long, default_value = "PATCH")]
    handshake_method: Method,

    /// Path of the gateway's handshake signal
    #[arg(long, default_value = "/")]
    handshake_path: String,

    /// Directory holding issued route maps between runs
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a route map and print it
    Handshake,
    /// Handshake, then call the endpoint of the given kind (API_ROOT, PUBLIC, ADMIN)
    Call { kind: EndpointKind },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client =
        GatewayClient::new(&cli.url)?.with_handshake(cli.handshake_method, &cli.handshake_path);
    let cache_dir = cli.cache_dir.unwrap_or_else(std::env::temp_dir);
    let cache = RouteCache::for_gateway(&cache_dir, client.base_url());

    match cli.command {
        Commands::Handshake => {
            let source = client.connect(&cache).await?;
            if source == RouteSource::Missing {
                println!("Session still active; no new routes issued");
            } else {
                let routes = cache.load()?.unwrap_or_default();
                println!("{}", serde_json::to_string_pretty(&routes)?);
            }
        }
        Commands::Call { kind } => {
            if client.connect(&cache).await? == RouteSource::Missing {
                eprintln!(
                    "Error: session is active but no route map is cached in {}",
                    cache_dir.display()
                );
                return Ok(());
            }
            let res = client.call(kind).await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
