//! Trackset CLI Tool
//!
//! Command-line interface for collecting, transcoding, and curating mammal
//! track photo datasets with the trackset library.

#[cfg(feature = "cli")]
use trackset::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
