//! SRTP Loopback - end-to-end exercise of the secure transport
//!
//! Builds sender transport(s), a wire and a receiver transport in one
//! process, pushes synthetic RTP/RTCP through them and checks every packet
//! comes out the far end unchanged.

use clap::{Parser, ValueEnum};
use srtp_cli::{display_compact_stats, display_transport_stats, Config, Loopback};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// One key pair, untagged packets
    Single,
    /// Per-channel keys over interleaved framing
    Channels,
}

#[derive(Parser, Debug)]
#[command(name = "srtp-loopback")]
#[command(about = "SRTP loopback pipeline test", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in example to run when no configuration file is given
    #[arg(short, long, value_enum, default_value = "single")]
    mode: Mode,

    /// RTP packets per stream (overrides the configuration)
    #[arg(short, long)]
    packets: Option<u32>,

    /// RTP payload size (overrides the configuration)
    #[arg(long)]
    payload_size: Option<usize>,

    /// Write the selected example configuration to this path and exit
    #[arg(long)]
    write_example: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let example = match args.mode {
        Mode::Single => Config::example_single(),
        Mode::Channels => Config::example_channels(),
    };

    if let Some(path) = &args.write_example {
        example.to_file(path)?;
        tracing::info!("Wrote example configuration to {}", path);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            Config::from_file(path)?
        }
        None => example,
    };
    if let Some(packets) = args.packets {
        config.loopback.packets = packets;
    }
    if let Some(payload_size) = args.payload_size {
        config.loopback.payload_size = payload_size;
    }

    let keys = config.resolve()?;
    tracing::info!(
        "Starting loopback: {} single key, {} channel pair(s), {} packets per stream",
        if keys.single.is_some() { "with" } else { "without" },
        keys.channels.len(),
        config.loopback.packets
    );

    let loopback = Loopback::build(&keys, config.loopback.clone())?;
    let report = loopback.run()?;
    loopback.stop()?;

    for (label, stats) in &report.senders {
        display_transport_stats(&format!("SENDER {}", label), stats);
    }
    display_transport_stats("RECEIVER", &report.receiver);
    display_compact_stats(&report.receiver, report.elapsed);
    println!(
        "Wire: {} packets, {}",
        report.wire.packets,
        srtp_cli::format_bytes(report.wire.bytes)
    );

    if !report.is_clean() {
        anyhow::bail!(
            "Loopback lost or corrupted packets: {} delivered of {}, {} mismatched",
            report.delivered,
            report.rtp_sent + report.rtcp_sent,
            report.mismatched
        );
    }

    println!(
        "OK: {} RTP and {} RTCP packets survived the round trip",
        report.rtp_sent, report.rtcp_sent
    );
    Ok(())
}
