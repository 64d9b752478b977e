//! Service configuration.
//!
//! Command-line flags (with environment fallbacks) are parsed into [`Args`]
//! and validated once into an immutable [`ServiceConfig`] that is shared by
//! every request.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use tile_common::UpstreamConfig;

use crate::governor::PoolLimits;

/// Public Mapillary coverage tiles.
pub const DEFAULT_API_URL: &str = "https://tiles.mapillary.com/maps/vtp/mly1_public/2";

/// Largest accepted output tile edge, in pixels.
pub const MAX_TILE_SIZE: u32 = 8192;

#[derive(Parser, Debug, Clone)]
#[command(name = "tile-server")]
#[command(about = "Raster coverage tiles rendered from an upstream vector tile API")]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "TILE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "TILE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Upstream vector tile API base URL
    #[arg(long, env = "TILE_API_URL", default_value = DEFAULT_API_URL)]
    pub api: String,

    /// Separate base URL for zoom-14 data tiles (defaults to --api)
    #[arg(long = "api-z14", env = "TILE_API_URL_Z14")]
    pub api_z14: Option<String>,

    /// Access token appended to upstream requests
    #[arg(long, env = "TILE_ACCESS_TOKEN", default_value = "")]
    pub token: String,

    /// Output tile edge in pixels
    #[arg(long, env = "TILE_SIZE", default_value_t = 1024)]
    pub tile_size: u32,

    /// Requests served concurrently
    #[arg(long, alias = "threads", env = "TILE_MAX_CLIENTS", default_value_t = 1)]
    pub max_clients: usize,

    /// Concurrent upstream fetches
    #[arg(long, env = "TILE_MAX_NETWORK_JOBS", default_value_t = 8)]
    pub max_network_jobs: usize,

    /// Concurrent render jobs (default: number of CPU cores)
    #[arg(long, env = "TILE_MAX_CPU_JOBS")]
    pub max_cpu_jobs: Option<usize>,

    /// Attempts per upstream fetch
    #[arg(long, env = "TILE_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Per-attempt upstream timeout
    #[arg(long, env = "TILE_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "TILE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Serve Prometheus metrics on this address (disabled when unset)
    #[arg(long, env = "TILE_METRICS_LISTEN")]
    pub metrics_listen: Option<SocketAddr>,
}

impl Args {
    /// Validate flags and build the runtime configuration.
    pub fn into_config(self) -> Result<ServiceConfig> {
        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            bail!(
                "tile size {} is out of range (1..={})",
                self.tile_size,
                MAX_TILE_SIZE
            );
        }
        if self.api.trim().is_empty() {
            bail!("upstream API URL must not be empty");
        }

        let listen = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("{} did not resolve to an address", self.host))?;

        let upstream = UpstreamConfig {
            base_url: self.api,
            detailed_base_url: self.api_z14.filter(|url| !url.trim().is_empty()),
            access_token: Some(self.token).filter(|t| !t.is_empty()),
        };

        Ok(ServiceConfig {
            listen,
            upstream,
            tile_size: self.tile_size,
            limits: PoolLimits {
                clients: self.max_clients,
                network: self.max_network_jobs,
                cpu: self.max_cpu_jobs.unwrap_or_else(num_cpus::get),
            },
            max_retries: self.max_retries,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            metrics_listen: self.metrics_listen,
        })
    }
}

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub upstream: UpstreamConfig,
    pub tile_size: u32,
    pub limits: PoolLimits,
    /// Attempts per upstream fetch, including the first.
    pub max_retries: u32,
    pub fetch_timeout: Duration,
    pub metrics_listen: Option<SocketAddr>,
}

impl ServiceConfig {
    /// Defaults for everything except the upstream.
    pub fn new(upstream: UpstreamConfig) -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            upstream,
            tile_size: 1024,
            limits: PoolLimits {
                clients: 1,
                network: 8,
                cpu: num_cpus::get(),
            },
            max_retries: 3,
            fetch_timeout: Duration::from_secs(30),
            metrics_listen: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tile-server").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).into_config().unwrap();
        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.upstream.base_url, DEFAULT_API_URL);
        assert_eq!(config.upstream.detailed_base_url, None);
        assert_eq!(config.upstream.access_token, None);
        assert_eq!(config.tile_size, 1024);
        assert_eq!(config.limits.clients, 1);
        assert_eq!(config.limits.network, 8);
        assert_eq!(config.limits.cpu, num_cpus::get());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_flags() {
        let config = parse(&[
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--api",
            "http://low",
            "--api-z14",
            "http://high",
            "--token",
            "secret",
            "--tile-size",
            "512",
            "--threads",
            "4",
            "--max-cpu-jobs",
            "2",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.upstream.detailed_base_url.as_deref(), Some("http://high"));
        assert_eq!(config.upstream.access_token.as_deref(), Some("secret"));
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.limits.clients, 4);
        assert_eq!(config.limits.cpu, 2);
    }

    #[test]
    fn test_tile_size_bounds() {
        assert!(parse(&["--tile-size", "0"]).into_config().is_err());
        assert!(parse(&["--tile-size", "8193"]).into_config().is_err());
        assert!(parse(&["--tile-size", "8192"]).into_config().is_ok());
    }

    #[test]
    fn test_invalid_host() {
        assert!(parse(&["--host", "not a host"]).into_config().is_err());
    }
}
