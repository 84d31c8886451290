//! Statistics display and formatting

use rdout::io::ChannelStats;
use rdout::{ReceiverStats, SendReport};
use std::time::Duration;

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else if secs > 0 {
        format!("{}.{:01}s", seconds, duration.subsec_millis() / 100)
    } else {
        format!("{}ms", duration.subsec_millis())
    }
}

/// Share of `part` in `total` as a percentage
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Display sender statistics
pub fn display_send_report(report: &SendReport, channel: &ChannelStats) {
    let stats = &report.stats;

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ SENDER STATISTICS                                           │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Packets:  {} delivered ({})",
        stats.packets_total,
        format_bytes(stats.bytes_total)
    );
    println!(
        "│ Sent:     {} first / {} retransmitted ({:.1}% overhead)",
        stats.packets_sent,
        stats.packets_retransmitted,
        percent(stats.packets_retransmitted, stats.packets_sent)
    );
    println!("│ Timeouts: {}", stats.timeouts);
    println!(
        "│ Acks:     {} accepted / {} ignored / {} discarded",
        stats.acks_accepted, stats.acks_ignored, stats.datagrams_discarded
    );
    println!("│ Elapsed:  {}", format_duration(report.elapsed));
    println!("├─────────────────────────────────────────────────────────────┤");
    display_channel_rows(channel);
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// Display receiver statistics
pub fn display_receiver_stats(stats: &ReceiverStats, channel: &ChannelStats) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ RECEIVER STATISTICS                                         │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Delivered:    {} packets ({})",
        stats.packets_delivered,
        format_bytes(stats.bytes_delivered)
    );
    println!("│ Out of order: {}", stats.out_of_order);
    println!("│ Discarded:    {}", stats.datagrams_discarded);
    println!("│ Acks sent:    {}", stats.acks_sent);
    println!("├─────────────────────────────────────────────────────────────┤");
    display_channel_rows(channel);
    println!("└─────────────────────────────────────────────────────────────┘");
}

fn display_channel_rows(channel: &ChannelStats) {
    println!("│ Channel: {} sends", channel.sends);
    println!(
        "│   dropped {} ({:.1}%) / corrupted {} / delayed {} / failed {}",
        channel.dropped,
        percent(channel.dropped, channel.sends),
        channel.corrupted,
        channel.delayed,
        channel.delivery_failures
    );
}

/// One-line summary of a finished send
pub fn compact_send_summary(report: &SendReport) -> String {
    format!(
        "{} packets in {} | {} retransmitted | {} timeouts",
        report.stats.packets_total,
        format_duration(report.elapsed),
        report.stats.packets_retransmitted,
        report.stats.timeouts
    )
}
