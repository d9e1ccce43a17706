//! Interactive todo client.
//!
//! Reads commands from stdin and prints every snapshot the store publishes.
//! Configuration comes from the environment (`TODO_MODE`, `TODO_API_URL`,
//! `TODO_STORAGE_DIR`, ...); logs go to stderr and follow `RUST_LOG`.
//!
//! ```text
//! $ TODO_MODE=local cargo run -p todo-sync-demo
//! add buy milk
//! toggle 1
//! sort completed
//! quit
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Duration;
use todo_sync_demo::{Command, HELP, build_store, execute, render};
use todo_sync_runtime::TodoConfig;
use todo_sync_runtime::metrics::describe_metrics;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,todo_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 2. Load configuration
    let config = TodoConfig::from_env()?;
    tracing::info!(mode = ?config.mode, "Starting todo client");

    // 3. Install Prometheus exporter if requested
    if let Some(port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()?;
        describe_metrics();
        tracing::info!("Prometheus metrics available at http://localhost:{port}/metrics");
    }

    // 4. Build the store and print every snapshot it publishes
    let store = build_store(&config).await?;
    let mut changes = store.changes().await;
    println!("{}", render(changes.current()));
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = changes.recv().await {
            println!("{}\n", render(&snapshot));
        }
    });

    println!("{HELP}");

    // 5. Feed commands until quit or end of input
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => execute(&store, command).await?,
            Err(error) => eprintln!("{error}"),
        }
    }

    // 6. Let in-flight writes reconcile before exiting
    store.shutdown(Duration::from_secs(5)).await?;
    printer.abort();
    tracing::info!("Goodbye");

    Ok(())
}
