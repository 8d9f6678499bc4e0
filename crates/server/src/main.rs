//! All-Pass Server
//!
//! Axum server exposing the petition orchestrator over SSE, plus a CLI mode
//! that runs a single petition in the terminal.

use std::net::SocketAddr;
use std::sync::Arc;

use allpass_core::skills::ScenarioId;
use allpass_core::state::RunView;
use allpass_core::swarm::{EventChannel, EventKind, Orchestrator, RunRequest};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod api;
mod config;

use api::AppState;
use config::PersistedConfig;

#[derive(Parser, Clone)]
#[command(author, version, about = "All-Pass - One-stop civil petitions by an agent swarm")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the All-Pass server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Run one petition in the terminal (no server)
    Run {
        /// The petition text
        message: String,
        /// Force a demo scenario (restaurant, relocation, welfare)
        #[arg(short, long)]
        scenario: Option<String>,
    },
}

pub async fn run_server(port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        config_path: config::default_path(),
    });
    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("🚀 All-Pass Server running at http://{}", addr);
    println!("   API v1 Routes:");
    println!("   Chat:      /api/v1/chat (POST, SSE)");
    println!("   Catalog:   /api/v1/scenarios, /api/v1/agents");
    println!("   Mock:      /api/v1/mock/gov (POST)");
    println!("   Config:    /api/v1/config (GET, PATCH)");
    println!("   OpenAPI:   /api/v1/openapi.json");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run one petition and print its progress as it streams
async fn run_once(message: String, scenario: Option<String>) -> anyhow::Result<()> {
    let scenario = match scenario {
        Some(id) => Some(
            ScenarioId::parse(&id)
                .ok_or_else(|| anyhow::anyhow!("unknown scenario: {}", id))?,
        ),
        None => None,
    };
    let config = PersistedConfig::load(&config::default_path())
        .await
        .to_orchestrator_config();
    println!(
        "🚀 Running petition ({} mode)",
        if config.model.is_live() { "live" } else { "simulation" }
    );

    let (channel, mut events) = EventChannel::new();
    let run = tokio::spawn(
        Orchestrator::new(config, channel).run(RunRequest::new(message).with_scenario(scenario)),
    );

    let mut view = RunView::default();
    while let Some(event) = events.recv().await {
        match event.kind() {
            EventKind::WorkflowState | EventKind::AgentStart | EventKind::AgentError => {
                println!("   {}", event.to_json()?)
            }
            _ => {}
        }
        view = view.apply(&event);
    }
    let report = run.await?;

    println!();
    println!("{}", report.response);
    if let Some(metrics) = view.metrics {
        println!(
            "\n✅ {:?} after {} retries | {} agent calls, {} API calls, {} citations, {:.1}s",
            report.state,
            report.retries,
            metrics.agent_calls,
            metrics.api_calls,
            metrics.legal_citations,
            metrics.total_time as f64 / 1000.0
        );
    } else {
        println!("\n⚠️ {:?} after {} retries", report.state, report.retries);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("╔══════════════════════════════════════╗");
    println!("║          ALL-PASS SERVER             ║");
    println!("╚══════════════════════════════════════╝");

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Run { message, scenario }) => run_once(message, scenario).await,
        Some(CliCommand::Serve { port }) => run_server(port).await,
        None => run_server(8080).await,
    }
}
