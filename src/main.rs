use std::path::PathBuf;

use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use umple_language_server::config::ToolOverrides;
use umple_language_server::logging::init_logger;
use umple_language_server::lsp::backend::UmpleBackend;

/// Language server for the Umple modeling language, speaking LSP over stdio
#[derive(Debug, Parser)]
#[command(name = "umple-language-server", version, about)]
struct Args {
    /// Path to umplesync.jar (overrides UMPLESYNC_JAR and umpleSyncJarPath)
    #[arg(long, value_name = "PATH")]
    umplesync_jar: Option<PathBuf>,

    /// Java executable used to run umplesync.jar (overrides UMPLE_JAVA and javaPath)
    #[arg(long, value_name = "PATH")]
    java: Option<PathBuf>,

    /// Log filter for stderr, e.g. "debug" or "umple_language_server=trace"
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr logs
    #[arg(long)]
    no_color: bool,

    /// Do not write a session log file
    #[arg(long)]
    no_file_logging: bool,

    /// Accepted for editor compatibility; stdio is the only transport
    #[arg(long, hide = true)]
    stdio: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_logging)?;
    info!("Starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let overrides = ToolOverrides {
        umplesync_jar: args.umplesync_jar,
        java: args.java,
    };

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(|client| UmpleBackend::new(client, overrides));
    Server::new(stdin, stdout, socket).serve(service).await;

    info!("Server stopped");
    Ok(())
}
