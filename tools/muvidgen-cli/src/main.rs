//! MuvidGen CLI: render a project file into a single video.
//!
//! Usage:
//!   muvidgen [--verbose] <PROJECT>
//!
//! Exit codes: 0 on success, 2 for usage and validation problems, the
//! ffmpeg exit code when a render stage fails, 1 for anything else.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use muvidgen_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "muvidgen",
    about = "Render clips, a soundtrack, and overlay layers into one video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the project JSON file
    project: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let mut logging = AppConfig::load().logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    muvidgen_common::logging::init_logging(&logging);

    match commands::render::run(cli.project).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Render aborted");
            eprintln!("[renderer] {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
