//! RDoUT Sender - reliable line sender
//!
//! Reads lines from stdin or a file and delivers each one as a packet over a
//! go-back-N sliding window.

use bytes::Bytes;
use clap::Parser;
use rdout::{Sender, Transport, UdpTransport};
use rdout_cli::{compact_send_summary, display_send_report, Config};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rdout-sender")]
#[command(about = "Reliable sender over an unreliable datagram channel", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input file, one payload per line ('-' for stdin)
    #[arg(short, long)]
    input: Option<String>,

    /// Receiver address
    #[arg(short, long)]
    peer: Option<SocketAddr>,

    /// Local bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Sliding window size
    #[arg(short, long)]
    window: Option<usize>,

    /// Inject the lossy demonstration faults
    #[arg(long)]
    lossy: bool,

    /// Fault RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective configuration to this TOML file and exit
    #[arg(long, value_name = "PATH")]
    dump_config: Option<PathBuf>,

    /// Print a single summary line instead of the statistics table
    #[arg(short, long)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn read_payloads(input: &str, max_payload: usize) -> anyhow::Result<Vec<Bytes>> {
    let reader: Box<dyn BufRead> = if input == "-" {
        tracing::info!("Reading payloads from stdin");
        Box::new(BufReader::new(io::stdin()))
    } else {
        tracing::info!("Reading payloads from {}", input);
        let file = File::open(input)
            .map_err(|e| anyhow::anyhow!("Failed to open input '{}': {}", input, e))?;
        Box::new(BufReader::new(file))
    };

    let mut payloads = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.len() > max_payload {
            anyhow::bail!(
                "Line {} is {} bytes, larger than the {} byte payload limit",
                number + 1,
                line.len(),
                max_payload
            );
        }
        payloads.push(Bytes::from(line));
    }
    Ok(payloads)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    rdout_cli::init_logging(if args.verbose { "debug" } else { "info" });

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(input) = args.input {
        config.sender.input = input;
    }
    if let Some(peer) = args.peer {
        config.sender.peer = peer;
    }
    if let Some(bind) = args.bind {
        config.sender.bind = bind;
    }
    if let Some(window) = args.window {
        config.arq.window_size = window;
    }

    if args.lossy {
        config.faults = Config::example_lossy().faults;
    }
    if let Some(seed) = args.seed {
        config.faults.seed = Some(seed);
    }

    if let Some(path) = args.dump_config {
        config.validate()?;
        config.to_file(&path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let arq = config.arq_config();
    let faults = config.fault_config();

    let payloads = read_payloads(&config.sender.input, arq.max_payload_size())?;

    let transport = Arc::new(UdpTransport::bind(config.sender.bind)?);
    tracing::info!(
        "Sending {} payloads from {} to {}",
        payloads.len(),
        transport.local_addr()?,
        config.sender.peer
    );

    let sender = Sender::new(transport, config.sender.peer, arq, faults)?;
    let report = sender.send_all(payloads)?;

    if args.quiet {
        println!("{}", compact_send_summary(&report));
    } else {
        display_send_report(&report, &sender.channel().stats());
    }

    Ok(())
}
