//! CLI entry point for the graphgate namespace gateway.
//!
//! One operation per invocation: the request is read as JSON (from `--json`
//! or stdin), the response is printed as pretty JSON on stdout, and logs go
//! to stderr.

use std::future::Future;
use std::io::Read;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::{timeout, Duration};
use tracing_subscriber::{fmt, EnvFilter};

use graphgate_core::error::Result;
use graphgate_core::{GatewayConfig, GatewayError};
use graphgate_graph::GraphConfig;

use graphgate_gateway::{render, Gateway};

#[derive(Parser)]
#[command(name = "graphgate")]
#[command(about = "Namespace-scoped gateway for the knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: graphgate).
    #[arg(short, long, default_value = "graphgate", global = true)]
    config: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    /// Override the default namespace.
    #[arg(long, global = true)]
    default_namespace: Option<String>,

    /// Accept namespaces that were never created.
    #[arg(long, global = true)]
    no_strict: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List every namespace with its description and counters.
    ListNamespaces,
    /// Register a new namespace: {"id", "description"}.
    CreateNamespace(RequestInput),
    /// Add an episode: {"name", "episode_body", "source"?, "source_description"?, "reference_time"?, "namespace"?}.
    AddEpisode(RequestInput),
    /// Search one namespace: {"query", "namespace"?, "limit"?}.
    Search(RequestInput),
    /// Most recent episodes: {"namespace"?, "last_n"?}.
    GetEpisodes(RequestInput),
    /// Delete an entity edge: {"uuid", "namespace"?}.
    DeleteEntityEdge(RequestInput),
}

#[derive(Args)]
struct RequestInput {
    /// Request JSON; read from stdin when omitted.
    #[arg(long)]
    json: Option<String>,
}

impl RequestInput {
    fn read<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = match &self.json {
            Some(raw) => raw.clone(),
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| GatewayError::InvalidArgument {
                        namespace: None,
                        field: "request",
                        message: e.to_string(),
                    })?;
                buf
            }
        };
        let raw = if raw.trim().is_empty() { "{}" } else { raw.as_str() };

        serde_json::from_str(raw).map_err(|e| GatewayError::InvalidArgument {
            namespace: None,
            field: "request",
            message: e.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = GatewayConfig::load(&cli.config)?;
    if let Some(ns) = &cli.default_namespace {
        config.default_namespace = ns.clone();
    }
    if cli.no_strict {
        config.strict_mode = false;
    }
    let config = config.validate()?;
    tracing::debug!(?config, "Configuration loaded");

    let limit = Duration::from_secs(config.request_timeout_secs);
    let graph_config = GraphConfig::from(&config.neo4j);
    let gateway = Gateway::new(config, graph_config)?;

    let response = match timeout(limit, run(&gateway, &cli.command)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs(), "Operation timed out");
            render::<()>(&Err(GatewayError::BackendUnavailable {
                namespace: None,
                message: format!("operation timed out after {}s", limit.as_secs()),
            }))
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response["status"] == "error" {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(gateway: &Gateway<GraphConfig>, command: &Command) -> Value {
    match command {
        Command::ListNamespaces => render(&gateway.list_namespaces().await),
        Command::CreateNamespace(input) => {
            respond(input.read(), |req| gateway.create_namespace(req)).await
        }
        Command::AddEpisode(input) => respond(input.read(), |req| gateway.add_episode(req)).await,
        Command::Search(input) => respond(input.read(), |req| gateway.search(req)).await,
        Command::GetEpisodes(input) => {
            respond(input.read(), |req| gateway.get_episodes(req)).await
        }
        Command::DeleteEntityEdge(input) => {
            respond(input.read(), |req| gateway.delete_entity_edge(req)).await
        }
    }
}

/// Run `op` on a parsed request, or render the parse failure.
async fn respond<R, T, F, Fut>(request: Result<R>, op: F) -> Value
where
    F: FnOnce(R) -> Fut,
    Fut: Future<Output = Result<T>>,
    T: Serialize,
{
    match request {
        Ok(req) => render(&op(req).await),
        Err(e) => render::<T>(&Err(e)),
    }
}
