//! hurai - bilingual alt text for images

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hurai::cli::Cli;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean for captions and JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
