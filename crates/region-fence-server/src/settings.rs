use clap::Parser;
use region_fence_lib::{ResolverConfig, StoreOptions};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Region Fence Server - Answers which regions contain a coordinate over HTTP and RPC
pub struct Settings {
    /// Fence dataset to serve
    #[clap(long, value_name = "FILE", env = "REGION_FENCE_DBPATH")]
    pub dbpath: PathBuf,

    /// Log query internals and lower the default log level to debug
    #[clap(long, env = "REGION_FENCE_DEBUG")]
    pub debug: bool,

    /// Port of the HTTP query endpoint
    #[clap(long, default_value = "8082", env = "REGION_FENCE_HTTP_PORT")]
    pub http_port: u16,

    /// Port of the RPC endpoint
    #[clap(long, default_value = "8083", env = "REGION_FENCE_RPC_PORT")]
    pub rpc_port: u16,

    /// Number of resolved coordinates to keep in memory, 0 disables caching
    #[clap(long, default_value = "0", env = "REGION_FENCE_CACHED_ENTRIES")]
    pub cached_entries: usize,
}

impl Settings {
    /// Parse settings from the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Resolver configuration derived from these settings
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new(&self.dbpath).with_options(StoreOptions {
            debug: self.debug,
            cache_capacity: self.cached_entries,
            ..Default::default()
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.http_port))
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.rpc_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["region-fence-server", "--dbpath", "fences.json"])
            .unwrap();

        assert_eq!(settings.dbpath, PathBuf::from("fences.json"));
        assert!(!settings.debug);
        assert_eq!(settings.http_port, 8082);
        assert_eq!(settings.rpc_port, 8083);
        assert_eq!(settings.cached_entries, 0);

        let config = settings.resolver_config();
        assert_eq!(config.options.cache_capacity, 0);
        assert!(!config.options.debug);
    }

    #[test]
    fn test_all_flags() {
        let settings = Settings::try_parse_from([
            "region-fence-server",
            "--dbpath",
            "/data/world.json",
            "--debug",
            "--http-port",
            "9000",
            "--rpc-port",
            "9001",
            "--cached-entries",
            "1024",
        ])
        .unwrap();

        assert!(settings.debug);
        assert_eq!(settings.http_addr().port(), 9000);
        assert_eq!(settings.rpc_addr().port(), 9001);

        let config = settings.resolver_config();
        assert_eq!(config.database_path, PathBuf::from("/data/world.json"));
        assert_eq!(config.options.cache_capacity, 1024);
        assert!(config.options.debug);
    }

    #[test]
    fn test_dbpath_is_required() {
        // Only meaningful when the variable is not set in the test environment
        if std::env::var_os("REGION_FENCE_DBPATH").is_none() {
            assert!(Settings::try_parse_from(["region-fence-server"]).is_err());
        }
    }
}
