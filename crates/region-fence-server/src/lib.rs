//! Region Fence Server - Network front ends for the region resolver
//!
//! Loads a fence dataset once at startup and serves two endpoints on separate
//! ports: an HTTP query endpoint returning the attribute data of the most specific
//! region, and an RPC endpoint returning its ISO code.

pub mod error;
pub mod http;
pub mod logging;
pub mod rpc;
pub mod settings;

pub use error::ServerError;
pub use settings::Settings;

use region_fence_lib::RegionResolver;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state handed to every request handler
#[derive(Debug)]
pub struct AppState {
    pub resolver: RegionResolver,
}

impl AppState {
    pub fn new(resolver: RegionResolver) -> Arc<Self> {
        Arc::new(Self { resolver })
    }
}

/// Open the dataset, bind both listeners and serve until one of them fails
pub async fn run(settings: Settings) -> error::Result<()> {
    let config = settings.resolver_config();
    // Index construction is CPU-bound
    let resolver = tokio::task::spawn_blocking(move || RegionResolver::open(&config))
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e)))??;

    let info = resolver.info();
    tracing::info!(
        fences = info.fence_count,
        vertices = info.vertex_count,
        index_nodes = info.index.node_count,
        cached_entries = settings.cached_entries,
        "Resolver ready"
    );
    let state = AppState::new(resolver);

    let http_listener = TcpListener::bind(settings.http_addr()).await?;
    let rpc_listener = TcpListener::bind(settings.rpc_addr()).await?;
    tracing::info!(addr = %settings.http_addr(), "HTTP endpoint listening");
    tracing::info!(addr = %settings.rpc_addr(), "RPC endpoint listening");

    let http = axum::serve(http_listener, http::router(state.clone())).into_future();
    let rpc = axum::serve(rpc_listener, rpc::router(state)).into_future();

    tokio::select! {
        result = http => result?,
        result = rpc => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
