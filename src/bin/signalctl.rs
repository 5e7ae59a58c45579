use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use signalman::control::{SignalRequest, SignalResponse};
use signalman::Manager;

#[derive(Parser)]
#[command(name = "signalctl")]
#[command(about = "Send signals to a signalman control endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver a signal through the HTTP control endpoint
    Send {
        /// Signal name (SIGHUP, HUP, hangup, ...)
        signal: String,

        #[arg(short, long, default_value = "http://127.0.0.1:8089/admin/signal")]
        url: String,

        /// Bearer token
        #[arg(short, long, env = "SIGNALMAN_TOKEN")]
        token: Option<String>,

        #[arg(long)]
        reason: Option<String>,

        /// Grace period in whole seconds
        #[arg(long)]
        grace: Option<u64>,

        #[arg(long)]
        requester: Option<String>,
    },
    /// Show which signals this host can deliver natively
    Signals,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            signal,
            url,
            token,
            reason,
            grace,
            requester,
        } => {
            let mut headers = HeaderMap::new();
            if let Some(token) = token {
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
            }
            let request = SignalRequest {
                signal,
                reason,
                grace_period_seconds: grace,
                requester: requester.or_else(|| std::env::var("USER").ok()),
            };

            let res = reqwest::Client::new()
                .post(&url)
                .headers(headers)
                .json(&request)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Signals => {
            let manager = Manager::builder().quiet(true).build();
            let caps = manager.capabilities();
            println!("platform: {}  catalog: {}", caps.platform(), caps.catalog_version());
            for cap in caps.iter() {
                let timeout = cap
                    .default_timeout
                    .map(|t| format!("{}s", t.as_secs()))
                    .unwrap_or_else(|| "-".to_string());
                if cap.supported {
                    println!("{:<8} native   {:>4}", cap.signal.id(), timeout);
                } else {
                    println!("{:<8} fallback {:>4}  {}", cap.signal.id(), timeout, cap.operation_hint);
                }
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<SignalResponse>(&text) {
        Ok(body) if body.success => {
            println!("{}", body.message.unwrap_or_else(|| status.to_string()));
        }
        Ok(body) => {
            eprintln!("Error: control endpoint returned status {}", status);
            eprintln!("{}", body.error.unwrap_or_default());
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Error: control endpoint returned status {}", status);
            eprintln!("Response: {}", text);
            std::process::exit(1);
        }
    }
    Ok(())
}
