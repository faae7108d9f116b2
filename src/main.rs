//! todo-api-pipeline
//!
//! Issues a single call against the todo API through the retrying,
//! logging, mock-aware pipeline and prints the result.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    PIPELINE                          │
//!                 │                                                      │
//!   execute_with  │  ┌──────────┐   ┌────────────┐   ┌────────────┐     │
//!   _retry ───────┼─▶│  retry   │──▶│  traffic   │──▶│   mock     │──┐  │
//!                 │  │  loop    │   │  logger    │   │  router    │  │  │
//!                 │  └────┬─────┘   └────────────┘   └─────┬──────┘  │  │
//!                 │       │ policy + backoff               │ mock?   ▼  │
//!                 │       ▼                                ▼   ┌────────┴┐│
//!                 │  ┌──────────┐                     canned   │  hyper  ││──▶ API
//!                 │  │resilience│                     JSON     │transport││
//!                 │  └──────────┘                              └─────────┘│
//!                 │                                                      │
//!                 │  config (ArcSwap + notify)   observability (tracing, │
//!                 │  lifecycle (shutdown)        metrics, Prometheus)    │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use clap::Parser;
use std::path::PathBuf;

use todo_api_pipeline::config::{load_config, watcher::ConfigWatcher, Environment};
use todo_api_pipeline::observability::{logging, metrics};
use todo_api_pipeline::{ApiRequest, ConfigHandle, Pipeline, PipelineConfig, Shutdown};

#[derive(Parser)]
#[command(name = "todo-api-pipeline")]
#[command(about = "Call the todo API through the retry pipeline", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured environment (mock, development, staging, production)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Force mock responses on
    #[arg(long)]
    mock: bool,

    /// Reload the configuration file when it changes
    #[arg(long, requires = "config")]
    watch: bool,

    /// Extra request header, as `name:value`
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,

    /// HTTP method
    method: Method,

    /// Path relative to the configured base URL, or an absolute URL
    path: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(env) = cli.env {
        config.environment = env;
    }
    if cli.mock {
        config.mock_override = Some(true);
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        environment = %config.environment,
        mock_enabled = config.mock_enabled(),
        base_url = %config.transport.base_url,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let handle = ConfigHandle::new(config);

    // Keep the watcher alive for the duration of the call.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => Some(ConfigWatcher::new(path, handle.clone()).run()?),
        _ => None,
    };

    let shutdown = Shutdown::new();
    let transport =
        todo_api_pipeline::transport::HyperTransport::new(&handle.snapshot().transport)?;
    let pipeline = Pipeline::builder(handle)
        .shutdown(shutdown.subscribe())
        .build(transport);

    let mut request = ApiRequest::new(cli.method, &cli.path)?;
    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("invalid header {header:?}, expected name:value"))?;
        request = request.with_header(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    if let Some(data) = &cli.data {
        let body: serde_json::Value = serde_json::from_str(data)?;
        request = request.with_json(&body)?;
    }

    let call = tokio::spawn(pipeline.execute_with_retry(request));
    tokio::pin!(call);

    let result = tokio::select! {
        result = &mut call => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, cancelling pending retries");
            shutdown.trigger();
            call.await?
        }
    };

    let response = result?;
    println!("{}", response.status());
    match response.text() {
        Ok(text) => println!("{text}"),
        Err(_) => println!("[{} bytes of binary data]", response.body().len()),
    }

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
