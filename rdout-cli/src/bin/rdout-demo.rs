//! RDoUT Demo - sender and receiver in one process
//!
//! Sends `Packet_0` .. `Packet_8` across UDP loopback through a lossy,
//! corrupting, delaying channel and prints what the receiver delivered.

use clap::Parser;
use rdout::{ArqConfig, Delivery, FaultConfig, Receiver, Sender, Transport, UdpTransport};
use rdout_cli::{display_receiver_stats, display_send_report};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "rdout-demo")]
#[command(about = "Go-back-N ARQ demonstration over a lossy loopback link", long_about = None)]
struct Args {
    /// Number of messages
    #[arg(short = 'n', long, default_value = "9")]
    messages: usize,

    /// Receiver port on 127.0.0.1 (0 picks a free port)
    #[arg(short, long, default_value = "8888")]
    port: u16,

    /// Sliding window size
    #[arg(short, long, default_value = "4")]
    window: usize,

    /// Retransmission timeout in milliseconds
    #[arg(long, default_value = "2000")]
    timeout_ms: u64,

    /// Run over a clean link
    #[arg(long)]
    clean: bool,

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

    let arq = ArqConfig {
        window_size: args.window,
        retransmit_timeout: Duration::from_millis(args.timeout_ms),
        ..ArqConfig::default()
    };
    arq.validate()?;

    let mut faults = if args.clean {
        FaultConfig::default()
    } else {
        FaultConfig::lossy()
    };
    if let Some(seed) = args.seed {
        faults = faults.with_seed(seed);
    }

    let receiver_transport = Arc::new(UdpTransport::bind(SocketAddr::from((
        [127, 0, 0, 1],
        args.port,
    )))?);
    let receiver_addr = receiver_transport.local_addr()?;
    let sender_transport = Arc::new(UdpTransport::bind(SocketAddr::from(([127, 0, 0, 1], 0)))?);

    // Receiver acks see a differently seeded fault stream than data
    let ack_faults = match faults.seed {
        Some(seed) => faults.clone().with_seed(seed.wrapping_add(1)),
        None => faults.clone(),
    };
    let mut receiver = Receiver::new(receiver_transport, arq.clone(), ack_faults)?;
    let shutdown = receiver.shutdown_handle();

    let receiver_thread = thread::Builder::new()
        .name("rdout-demo-receiver".to_string())
        .spawn(move || {
            let mut delivered: Vec<Delivery> = Vec::new();
            let stats = receiver.run(|delivery| {
                println!(
                    "Receiver: delivered {} '{}'",
                    delivery.seq,
                    String::from_utf8_lossy(&delivery.payload)
                );
                delivered.push(delivery);
            });
            (delivered, stats, receiver.channel().stats())
        })?;

    let payloads: Vec<String> = (0..args.messages).map(|i| format!("Packet_{}", i)).collect();
    let sender = Sender::new(sender_transport, receiver_addr, arq, faults)?;
    let result = sender.send_all(payloads.iter().map(|p| p.clone().into_bytes()));

    shutdown.store(true, Ordering::Release);
    let (delivered, receiver_stats, ack_channel) = receiver_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Receiver thread panicked"))?;

    let report = result?;
    display_send_report(&report, &sender.channel().stats());
    display_receiver_stats(&receiver_stats, &ack_channel);

    let in_order = delivered
        .iter()
        .map(|d| d.payload.as_ref())
        .eq(payloads.iter().map(|p| p.as_bytes()));
    if !in_order {
        anyhow::bail!("Receiver delivered an unexpected sequence");
    }
    println!(
        "\nAll {} messages delivered in order",
        delivered.len()
    );

    Ok(())
}
