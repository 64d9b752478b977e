//! Render a single coverage tile to a PNG file.
//!
//! ```text
//! render-tile --z 10 --x 5 --y 3 --out tile.png
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use tile_common::{TileCoord, UpstreamConfig};
use tile_server::config::DEFAULT_API_URL;
use tile_server::{ServiceConfig, TilePipeline};

#[derive(Parser, Debug)]
#[command(name = "render-tile")]
#[command(about = "Render one coverage tile to a PNG file")]
struct Args {
    #[arg(long)]
    x: u32,

    #[arg(long)]
    y: u32,

    #[arg(long)]
    z: u32,

    /// Output tile edge in pixels
    #[arg(long, default_value_t = 1024)]
    tile_size: u32,

    /// Upstream vector tile API base URL
    #[arg(long, env = "TILE_API_URL", default_value = DEFAULT_API_URL)]
    api: String,

    /// Separate base URL for zoom-14 data tiles
    #[arg(long = "api-z14", env = "TILE_API_URL_Z14")]
    api_z14: Option<String>,

    /// Access token appended to upstream requests
    #[arg(long, env = "TILE_ACCESS_TOKEN", default_value = "")]
    token: String,

    /// Output PNG path
    #[arg(long)]
    out: Option<PathBuf>,
}

fn usage_error(message: &str) -> ExitCode {
    eprintln!("error: {}\n", message);
    // Help text is best effort; the exit code carries the failure
    let _ = Args::command().print_help();
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(Level::WARN).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: could not install log subscriber");
    }

    let Some(out) = args.out.clone() else {
        return usage_error("--out is required");
    };
    let coord = TileCoord::new(args.z, args.x, args.y);
    if let Err(e) = coord.validate() {
        return usage_error(&e.to_string());
    }
    if args.tile_size == 0 || args.tile_size > tile_server::config::MAX_TILE_SIZE {
        return usage_error(&format!("tile size {} is out of range", args.tile_size));
    }

    let mut config = ServiceConfig::new(UpstreamConfig {
        base_url: args.api,
        detailed_base_url: args.api_z14.filter(|url| !url.is_empty()),
        access_token: Some(args.token).filter(|t| !t.is_empty()),
    });
    config.tile_size = args.tile_size;

    let pipeline = match TilePipeline::new(Arc::new(config)) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Failed to set up pipeline");
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    match pipeline.render_to_file(coord, &out).await {
        Ok(bytes) => {
            println!(
                "{} -> {} ({} bytes) in {:.3}s",
                coord,
                out.display(),
                bytes,
                start.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: rendering {} failed: {:#}", coord, e);
            ExitCode::FAILURE
        }
    }
}
