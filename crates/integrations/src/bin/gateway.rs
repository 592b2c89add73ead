//! Gateway service binary.
//!
//! Standalone HTTP service that receives Jira webhooks and direct task
//! requests and dispatches the resulting tasks to the DevOps agents.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use integrations::{config::Config, server, JiraClient, OpenAiTaskParser};
use orchestrator::{AgentDispatcher, AgentEndpoints, ExecutionMode, TaskOrchestrator};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Gateway between Jira and the CI, Helm and deploy agents.
#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Jira webhook gateway for DevOps automation agents")]
#[command(version)]
struct Cli {
    /// Port to listen on (overrides GATEWAY_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Dispatch tasks one at a time instead of concurrently
    #[arg(long)]
    sequential: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("gateway={level}").parse()?)
        .add_directive(format!("integrations={level}").parse()?)
        .add_directive(format!("orchestrator={level}").parse()?);

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    info!("Starting gateway...");

    // Load configuration
    let mut config = Config::default();
    if let Some(port) = cli.port {
        config.port = port;
    }

    let mode = if cli.sequential {
        ExecutionMode::Sequential
    } else {
        ExecutionMode::from_env()
    };

    let endpoints = AgentEndpoints::default();
    info!(
        ci = %endpoints.ci,
        helm = %endpoints.helm,
        deploy = %endpoints.deploy,
        timeout_secs = endpoints.timeout.as_secs(),
        mode = mode.as_str(),
        "Agent endpoints configured"
    );

    let dispatcher =
        AgentDispatcher::new(endpoints.clone()).context("Failed to create agent dispatcher")?;
    let orchestrator = TaskOrchestrator::new(Arc::new(dispatcher)).with_mode(mode);

    let mut state = server::AppState::new(config.clone(), endpoints, orchestrator);

    // Initialize description parser
    match OpenAiTaskParser::from_config(&config.parser) {
        Ok(parser) => {
            info!(model = %parser.model(), "Description parser configured");
            state = state.with_parser(Arc::new(parser));
        }
        Err(e) => {
            warn!(error = %e, "Description parser disabled");
        }
    }

    // Initialize Jira client
    if config.jira.enabled {
        match JiraClient::from_config(&config.jira) {
            Ok(client) => {
                info!(url = %config.jira.url, "Jira client configured");
                state = state.with_tracker(Arc::new(client));
            }
            Err(e) => {
                error!(error = %e, "Failed to create Jira client");
            }
        }
    } else {
        info!("ENABLE_JIRA_INTEGRATION is not set - Jira webhooks will be ignored");
    }

    if config.disable_task_validation {
        warn!("Task validation is disabled - incomplete tasks will be dispatched");
    }

    // Build router
    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Gateway listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
