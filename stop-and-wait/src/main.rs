//! Entry point for `saw`.
//!
//! Parses CLI arguments, builds the network and protocol configuration, and
//! runs transmissions through the library.  `main.rs` owns only process
//! setup (logging, argument parsing) and the human-readable report.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stop_and_wait::{
    DuplicatePolicy, NetworkConfig, ProtocolConfig, Session, Statistics, TransmitError,
    MAX_DATA_SIZE, MAX_RETRIES, TIMEOUT_MS,
};

/// Stop-and-wait ARQ over a simulated lossy network.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Transmit one or more messages and print the statistics.
    Send(SendArgs),
    /// List the built-in network presets.
    Presets,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// No loss, no delay.
    Perfect,
    /// No loss, 10-50 ms.
    Ideal,
    /// 10 % loss, 50-150 ms.
    Normal,
    /// 30 % loss, 200-500 ms.
    Harsh,
}

impl Preset {
    fn config(self) -> NetworkConfig {
        match self {
            Preset::Perfect => NetworkConfig::perfect(),
            Preset::Ideal => NetworkConfig::ideal(),
            Preset::Normal => NetworkConfig::normal(),
            Preset::Harsh => NetworkConfig::harsh(),
        }
    }
}

#[derive(Args)]
struct SendArgs {
    /// Messages to send, in order.
    #[arg(required = true)]
    messages: Vec<String>,

    /// Start from a preset instead of the default (10 % loss, 50-200 ms).
    #[arg(short, long, value_enum)]
    preset: Option<Preset>,

    /// Loss probability in [0, 1]; overrides the preset.
    #[arg(short, long)]
    loss: Option<f64>,

    /// Minimum delay in milliseconds; overrides the preset.
    #[arg(long)]
    min_delay: Option<u64>,

    /// Maximum delay in milliseconds; overrides the preset.
    #[arg(long)]
    max_delay: Option<u64>,

    /// Probability in [0, 1] that a surviving frame arrives damaged.
    #[arg(long, default_value_t = 0.0)]
    corrupt: f64,

    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = TIMEOUT_MS)]
    timeout_ms: u64,

    /// Retransmissions allowed per message.
    #[arg(long, default_value_t = MAX_RETRIES)]
    max_retries: u32,

    /// Do not re-acknowledge duplicate frames.
    #[arg(long)]
    no_reack: bool,

    /// Seed the simulated network for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

impl SendArgs {
    fn network(&self) -> Result<NetworkConfig> {
        let base = self.preset.map_or_else(NetworkConfig::default, Preset::config);
        let loss = self.loss.unwrap_or(base.loss_probability());
        let min_delay = self.min_delay.unwrap_or(base.min_delay().as_millis() as u64);
        let max_delay = self.max_delay.unwrap_or(base.max_delay().as_millis() as u64);
        let config = NetworkConfig::new(loss, min_delay, max_delay)
            .and_then(|config| config.with_corruption(self.corrupt))
            .context("invalid network configuration")?;
        Ok(config)
    }

    fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            max_data_size: MAX_DATA_SIZE,
            duplicate_policy: if self.no_reack {
                DuplicatePolicy::Discard
            } else {
                DuplicatePolicy::Reack
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send(args) => send(args).await,
        Mode::Presets => {
            for (name, config) in [
                ("perfect", NetworkConfig::perfect()),
                ("ideal", NetworkConfig::ideal()),
                ("normal", NetworkConfig::normal()),
                ("harsh", NetworkConfig::harsh()),
            ] {
                println!("{name:<8} {}", describe(&config));
            }
            Ok(())
        }
    }
}

async fn send(args: SendArgs) -> Result<()> {
    let network = args.network()?;
    let protocol = args.protocol();
    log::info!("Network: {}", describe(&network));

    let mut session = match args.seed {
        Some(seed) => Session::seeded(network, protocol, seed),
        None => Session::new(network, protocol),
    }
    .context("invalid protocol configuration")?;

    let mut stats = Statistics::new();
    let mut failures = 0usize;
    for message in &args.messages {
        match session.transmit(message.as_bytes(), &mut stats).await {
            Ok(delivery) => println!(
                "delivered {message:?} as seq {} ({} retransmission(s))",
                delivery.seq, delivery.retransmissions
            ),
            Err(err @ TransmitError::PermanentFailure { .. }) => {
                failures += 1;
                println!("failed    {message:?}: {err}");
            }
            Err(err) => {
                failures += 1;
                println!("rejected  {message:?}: {err}");
            }
        }
    }

    print_report(&stats);
    if failures > 0 {
        anyhow::bail!("{failures} of {} message(s) not delivered", args.messages.len());
    }
    Ok(())
}

fn describe(config: &NetworkConfig) -> String {
    format!(
        "loss {:.1}%, delay {}-{} ms, corruption {:.1}%",
        config.loss_probability() * 100.0,
        config.min_delay().as_millis(),
        config.max_delay().as_millis(),
        config.corruption_probability() * 100.0
    )
}

fn print_report(stats: &Statistics) {
    println!();
    println!("========== Transmission statistics ==========");
    if let Some(elapsed) = stats.elapsed() {
        println!("Elapsed:           {:.3} s", elapsed.as_secs_f64());
    }
    println!("Frames sent:       {}", stats.frames_sent());
    println!("Frames received:   {}", stats.frames_received());
    println!("Acks sent:         {}", stats.acks_sent());
    println!("Acks received:     {}", stats.acks_received());
    println!("Retransmissions:   {}", stats.retransmissions());
    println!("Frames lost:       {}", stats.frames_lost());
    println!("Frames corrupted:  {}", stats.frames_corrupted());
    println!("Duplicate frames:  {}", stats.duplicate_frames());
    if let Some(rate) = stats.delivery_rate() {
        println!("Delivery rate:     {:.1}%", rate * 100.0);
    }
    if let Some(rate) = stats.retransmission_rate().filter(|_| stats.retransmissions() > 0) {
        println!("Retransmit rate:   {:.1}%", rate * 100.0);
    }
    println!("=============================================");
}
