// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! streamview CLI
//!
//! Runs one live video session from an input URI to an output URI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use streamview::core::signals;
use streamview::{
    MediaEngine, PlatformKind, Session, SessionConfig, TerminationReason, VideoCodec,
};

/// Video codec accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CodecArg {
    H264,
    Mjpeg,
}

impl From<CodecArg> for VideoCodec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::H264 => VideoCodec::H264,
            CodecArg::Mjpeg => VideoCodec::Mjpeg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    #[value(alias = "raspberrypi")]
    Rpi,
    Jetson,
    Generic,
}

impl From<PlatformArg> for PlatformKind {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Rpi => PlatformKind::RaspberryPi,
            PlatformArg::Jetson => PlatformKind::Jetson,
            PlatformArg::Generic => PlatformKind::Generic,
        }
    }
}

#[derive(Parser)]
#[command(name = "streamview")]
#[command(author, version, about = "Live video capture, transcode and relay", long_about = None)]
struct Cli {
    /// Input URI: /dev/videoN, csi://N, udp://[host]:port, rtp://@:port,
    /// mc://group:port, rtsp://... or a file path
    #[arg(value_name = "INPUT")]
    input: Option<String>,

    /// Output URI: local, rtp://host:port, mc://group:port, save://path,
    /// http or appsink
    #[arg(value_name = "OUTPUT")]
    output: Option<String>,

    /// Codec of network input streams
    #[arg(long, value_enum)]
    input_codec: Option<CodecArg>,

    /// Codec to encode outputs with
    #[arg(long, value_enum)]
    output_codec: Option<CodecArg>,

    /// Use the platform's hardware H.264 encoder
    #[arg(long)]
    hw_encoder: bool,

    /// Capture resolution, WxH or a preset (1080, 720, 480)
    #[arg(long)]
    resolution: Option<String>,

    /// Capture frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Platform override
    #[arg(long, value_enum)]
    platform: Option<PlatformArg>,

    /// Session config file (default: ./streamview.yaml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address the HTTP relay binds to
    #[arg(long)]
    http_host: Option<String>,

    /// Port the HTTP relay listens on
    #[arg(long)]
    http_port: Option<u16>,

    /// How long a stop waits for outputs to finalize
    #[arg(long, value_name = "MS")]
    drain_timeout_ms: Option<u64>,

    /// Print the resolved graph and exit without running it
    #[arg(long)]
    print_graph: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file values, overridden by anything given on the command line.
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::load_or_default(&std::env::current_dir()?),
        };

        if let Some(input) = &self.input {
            config.input_uri = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_uri = output.clone();
        }
        if let Some(codec) = self.input_codec {
            config.input_codec = codec.into();
        }
        if let Some(codec) = self.output_codec {
            config.output_codec = codec.into();
        }
        if self.hw_encoder {
            config.hw_encoder = true;
        }
        if let Some(resolution) = &self.resolution {
            config.resolution = Some(resolution.clone());
        }
        if let Some(fps) = self.fps {
            config.fps = Some(fps);
        }
        if let Some(platform) = self.platform {
            config.platform = Some(platform.into());
        }
        if let Some(host) = &self.http_host {
            config.http.host = host.clone();
        }
        if let Some(port) = self.http_port {
            config.http.port = port;
        }
        if let Some(ms) = self.drain_timeout_ms {
            config.drain_timeout_ms = ms;
        }

        if config.input_uri.is_empty() {
            anyhow::bail!("No input URI given (pass INPUT or set input_uri in the config file)");
        }
        Ok(config)
    }
}

#[cfg(feature = "gstreamer")]
fn media_engine() -> Result<Arc<dyn MediaEngine>> {
    let engine = streamview::GstEngine::new().context("Failed to initialize GStreamer")?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "gstreamer"))]
fn media_engine() -> Result<Arc<dyn MediaEngine>> {
    anyhow::bail!(
        "This build has no media engine; rebuild with `--features gstreamer` \
         (use --print-graph to inspect the graph without running it)"
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.session_config()?;

    if cli.print_graph {
        let plan =
            streamview::SessionPlan::resolve(&config).context("Failed to resolve session")?;
        println!("{}", plan.launch_string());
        return Ok(());
    }

    let mut session = Session::new(config, media_engine()?);
    signals::install_interrupt_handler(session.cancel_handle())
        .context("Failed to install Ctrl+C handler")?;

    let outcome = session.run();
    signals::clear_interrupt_target();

    match outcome.context("Session failed")? {
        TerminationReason::DrainTimeout => {
            tracing::warn!(
                "Outputs may be incomplete: engine did not confirm end-of-stream in time"
            );
        }
        reason => tracing::info!("Done: {}", reason),
    }
    Ok(())
}
