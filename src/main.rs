#[macro_use]
extern crate tracing;

use std::path::PathBuf;

use structopt::StructOpt;
use tokio::runtime::Builder;
use tokio::signal;

use panelvis::{
    capture::{self, FrameSource},
    daemon::{self, Daemon},
    image::RawImage,
    markers, methods, models,
    pipeline::Pipeline,
    status,
};

#[derive(Debug, StructOpt)]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    #[structopt(short, long = "config")]
    config_path: Option<PathBuf>,
    #[structopt(long)]
    dump_config: bool,
    /// Decode a single image file and exit
    #[structopt(long)]
    image: Option<PathBuf>,
    /// Write the diagnostic overlay to this PNG file
    #[structopt(long)]
    overlay: Option<PathBuf>,
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    // Load configuration
    let mut config = if let Some(config_path) = opts.config_path.as_deref() {
        models::Config::load_file(config_path).await?
    } else {
        models::Config::default()
    };

    if let Some(path) = opts.overlay {
        config.overlay.path = Some(path);
    }

    // Dump configuration if this was asked
    if opts.dump_config {
        print!("{}", config.to_string()?);
        return Ok(());
    }

    let mut pipeline = Pipeline::new(
        markers::from_config(&config.detector)?,
        config.calibration.clone(),
    );

    // Offline decode of a single shot
    if let Some(path) = opts.image {
        let raw = RawImage::open(&path)?;
        let report = pipeline.process(&raw);
        daemon::write_overlay(config.overlay.path.as_deref(), &pipeline, &report);

        if !report.readable() {
            warn!(path = %path.display(), "panel not found");
        }

        println!("{}", report.state.to_record()?);
        return Ok(());
    }

    // Not being able to grab frames at startup is fatal
    let source = FrameSource::open(
        capture::from_config(&config.capture.grabber)?,
        &config.capture,
    )?;
    let daemon = Daemon::new(
        source,
        pipeline,
        methods::from_config(&config.method),
        status::from_config(&config.status),
        &config,
    );

    daemon.run(signal::ctrl_c()).await;
    Ok(())
}

fn install_tracing(opts: &Opts) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fmt_layer = fmt::layer();

    let filter_layer = EnvFilter::try_from_env("PANELVIS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match opts.verbose {
            0 => "panelvis=warn,panelvisd=warn",
            1 => "panelvis=info,panelvisd=info",
            2 => "panelvis=debug,panelvisd=debug",
            _ => "panelvis=trace,panelvisd=trace",
        })
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    install_tracing(&opts)?;

    // Create tokio runtime
    let thd_count = match num_cpus::get() {
        1 => 2,
        other => other.min(4),
    };

    let rt = Builder::new_multi_thread()
        .worker_threads(thd_count)
        .enable_all()
        .build()?;
    rt.block_on(run(opts))
}
