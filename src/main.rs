//! wflens CLI entry point
//!
//! Parses arguments, runs the selected command and renders failures with
//! suggestions before exiting with status 1.
//!
//! - `resolve` - Resolve `uses:` references
//! - `inspect` - Summarize a workflow file
//! - `cache` - Show or clean the content cache

use anyhow::Result;
use clap::Parser;
use wflens::cli;
use wflens::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
