//! Stdio MCP server for ctxsurf checkpoints.
//!
//! Reads one JSON-RPC request per line from stdin and writes one response
//! per line to stdout. Logs go to stderr.
//!
//! ```sh
//! echo '{"jsonrpc":"2.0","id":1,"method":"tools/list"}' | ctxsurf-mcp --project .
//! ```

use std::path::PathBuf;

use clap::Parser;
use ctxsurf::config::SurfConfig;
use ctxsurf_mcp::McpServer;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stdio MCP server for ctxsurf checkpoints.
#[derive(Parser)]
#[command(name = "ctxsurf-mcp", version)]
struct Cli {
    /// Project directory holding ctxsurf.config.json
    #[arg(long, default_value = ".")]
    project: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ctxsurf=info,ctxsurf_mcp=info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    let config = SurfConfig::load(&cli.project);
    let server = match McpServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = serve(&server).await {
        error!("stdio loop ended: {e}");
        std::process::exit(1);
    }
}

async fn serve(server: &McpServer) -> Result<(), String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("MCP server ready on stdio");

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("failed to read stdin: {e}"))?
    {
        let Some(response) = server.handle_line(&line).await else {
            continue;
        };
        let mut out = serde_json::to_string(&response)
            .map_err(|e| format!("failed to serialize response: {e}"))?;
        out.push('\n');
        stdout
            .write_all(out.as_bytes())
            .await
            .map_err(|e| format!("failed to write stdout: {e}"))?;
        stdout
            .flush()
            .await
            .map_err(|e| format!("failed to flush stdout: {e}"))?;
    }
    Ok(())
}
