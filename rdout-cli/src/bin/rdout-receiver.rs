//! RDoUT Receiver - in-order line receiver
//!
//! Accepts packets in sequence order, writes each payload as one line to
//! stdout or a file and acknowledges it.

use clap::Parser;
use rdout::{Receiver, UdpTransport};
use rdout_cli::{display_receiver_stats, Config};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "rdout-receiver")]
#[command(about = "Reliable receiver over an unreliable datagram channel", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file ('-' for stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Stop after this many deliveries (runs forever when omitted)
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Inject the lossy demonstration faults on acks
    #[arg(long)]
    lossy: bool,

    /// Fault RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    rdout_cli::init_logging(if args.verbose { "debug" } else { "info" });

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(output) = args.output {
        config.receiver.output = output;
    }
    if let Some(listen) = args.listen {
        config.receiver.listen = listen;
    }

    let mut faults = if args.lossy {
        rdout::FaultConfig::lossy()
    } else {
        config.fault_config()
    };
    if let Some(seed) = args.seed {
        faults = faults.with_seed(seed);
    }

    let mut writer: Box<dyn Write> = if config.receiver.output == "-" {
        tracing::info!("Writing to stdout");
        Box::new(io::stdout())
    } else {
        tracing::info!("Writing to file: {}", config.receiver.output);
        let file = File::create(&config.receiver.output).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create file '{}': {}",
                config.receiver.output,
                e
            )
        })?;
        Box::new(BufWriter::new(file))
    };

    // Acks still held by delay threads when the loop stops
    let ack_linger = faults.max_delay;

    let transport = Arc::new(UdpTransport::bind(config.receiver.listen)?);
    let mut receiver = Receiver::new(transport, config.arq_config(), faults)?;
    let shutdown = receiver.shutdown_handle();

    let mut delivered = 0u64;
    let mut write_error = None;
    let stats = receiver.run(|delivery| {
        let line = String::from_utf8_lossy(&delivery.payload);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            write_error = Some(e);
            shutdown.store(true, Ordering::Release);
            return;
        }

        delivered += 1;
        if args.count.map_or(false, |count| delivered >= count) {
            shutdown.store(true, Ordering::Release);
        }
    });

    if let Some(e) = write_error {
        return Err(anyhow::anyhow!("Failed to write output: {}", e));
    }

    if !ack_linger.is_zero() {
        tracing::debug!("Waiting {:?} for delayed acks", ack_linger);
        thread::sleep(ack_linger);
    }

    display_receiver_stats(&stats, &receiver.channel().stats());
    Ok(())
}
