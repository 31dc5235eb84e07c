use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::warn;

use crate::core::config::Config;
use crate::core::display::HeadlessDisplay;
use crate::core::provider::{self, InputSource, Resolution};
use crate::core::vision::{ExpressionService, GoogleVision, NullExpression};
use crate::core::BodyCast;

mod core;

/// Forward depth-camera body tracking over UDP and overlay cloud
/// face-expression results.
#[derive(Parser, Debug)]
#[command(name = "bodycast", version)]
struct Args {
    /// Path to a recorded frame dump to replay instead of a live camera
    #[arg(long, conflicts_with = "ip_address")]
    input_file: Option<PathBuf>,

    /// Network camera address, a.b.c.d:port or a.b.c.d
    #[arg(long)]
    ip_address: Option<String>,

    /// Capture resolution: HD2K, HD1200, HD1080, HD720, SVGA or VGA
    #[arg(long)]
    resolution: Option<String>,

    /// Override the UDP destination host from the config file
    #[arg(long)]
    dest: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    let logger =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).build();
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init()?;

    let mut config = Config::load();
    if let Some(dest) = args.dest {
        config.dest_host = dest;
    }

    let source = InputSource::from_args(args.input_file, args.ip_address.as_deref());
    let resolution = Resolution::from_name(args.resolution.as_deref());
    let provider = provider::connect(&source, resolution)?;

    let service: Box<dyn ExpressionService> = match config.api_key() {
        Some(key) => Box::new(GoogleVision::new(key)),
        None => {
            warn!("No Vision API key configured; expression inference disabled");
            Box::new(NullExpression)
        }
    };

    let display = Box::new(HeadlessDisplay::new());

    let mut app = BodyCast::new(&config, provider, display, service, &multi)?;
    app.handle_frames();

    Ok(())
}
