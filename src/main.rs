//! conduit-mcp: MCP server speaking JSON-RPC 2.0 over standard input/output
//!
//! This binary serves the bundled demonstration tools and an in-memory
//! resource store over stdio. The interesting machinery lives in the
//! library; embed it to serve your own tools and resources.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use conduit_mcp::config;
use conduit_mcp::protocol::ProtocolEngine;
use conduit_mcp::resources::{
    InMemoryResourceProvider, ResourceContent, ResourceItem, ResourceTemplate,
};
use conduit_mcp::server::{McpServer, ServerCapabilities, ServerInfo};
use conduit_mcp::tools::demo::{ClockTool, HelloTool};
use conduit_mcp::tools::ToolRegistry;
use conduit_mcp::transport::StreamTransport;

/// MCP server speaking JSON-RPC 2.0 over standard input and output.
///
/// Ships a pair of demonstration tools and an in-memory resource store.
/// Logs go to stderr; stdout belongs to the protocol.
#[derive(Parser, Debug)]
#[command(name = "conduit-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Seeds the demonstration resource store.
async fn demo_resources() -> Arc<InMemoryResourceProvider> {
    let provider = InMemoryResourceProvider::new();
    provider
        .add_resource(
            ResourceItem::new("memo://welcome", "Welcome")
                .with_description("A short introduction to this server"),
            ResourceContent::text(
                "memo://welcome",
                "Welcome to conduit-mcp. List tools with tools/list and \
                 resources with resources/list.",
            ),
        )
        .await;
    provider
        .add_template(
            ResourceTemplate::new("memo://{slug}", "Memo by slug")
                .with_description("Any memo, addressed by its slug"),
        )
        .await;
    Arc::new(provider)
}

/// Entry point for the conduit-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        framing = ?cfg.framing,
        "Starting conduit-mcp server"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(async {
        let transport = Arc::new(StreamTransport::stdio(cfg.framing));
        let engine = ProtocolEngine::new(transport).await;

        let info = ServerInfo::new(cfg.server.name.clone(), cfg.server.version.clone());
        let capabilities = ServerCapabilities::new()
            .with_resources(true, true)
            .with_tools();
        let server = McpServer::new(engine, info, capabilities).await;

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(HelloTool));
        tools.register(Arc::new(ClockTool));
        server.setup_tool_feature(Arc::new(tools)).await;

        server
            .setup_resource_feature(demo_resources().await, cfg.resources.page_size)
            .await;

        info!("MCP server ready, waiting for client connection...");
        server.run_with_shutdown().await
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_prefers_flags_over_config() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(1, false, "error"), Level::INFO);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
        assert_eq!(get_log_level(3, false, "warn"), Level::TRACE);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
    }
}
