//! Region Fence Server CLI
//!
//! Run with: `cargo run -p region-fence-server -- --dbpath fences.json`

use region_fence_server::{Settings, logging, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_cli();
    logging::init_logging(settings.debug);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dbpath = %settings.dbpath.display(),
        http_port = settings.http_port,
        rpc_port = settings.rpc_port,
        debug = settings.debug,
        "Starting region fence server"
    );

    if let Err(e) = run(settings).await {
        tracing::error!(error = %e, "Server failed");
        return Err(e.into());
    }
    Ok(())
}
