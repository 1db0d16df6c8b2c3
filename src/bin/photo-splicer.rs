//! Photo Splicer binary
//!
//! Serves the upload UI and background removal endpoint, or processes a single
//! file from the command line.

#[cfg(feature = "cli")]
use photo_splicer::cli;

#[cfg(feature = "cli")]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
