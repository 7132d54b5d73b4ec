//! Statistics display and formatting

use rdt::{ReceiveReport, SendReport};
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

/// Format bandwidth in human-readable form
pub fn format_bandwidth(bps: u64) -> String {
    const KBPS: u64 = 1000;
    const MBPS: u64 = KBPS * 1000;
    const GBPS: u64 = MBPS * 1000;

    if bps >= GBPS {
        format!("{:.2} Gbps", bps as f64 / GBPS as f64)
    } else if bps >= MBPS {
        format!("{:.2} Mbps", bps as f64 / MBPS as f64)
    } else if bps >= KBPS {
        format!("{:.2} Kbps", bps as f64 / KBPS as f64)
    } else {
        format!("{} bps", bps)
    }
}

/// Format an RTT or timeout in human-readable form
pub fn format_rtt(rtt: Duration) -> String {
    let us = rtt.as_micros();
    if us >= 1_000_000 {
        format!("{:.2}s", us as f64 / 1_000_000.0)
    } else if us >= 1_000 {
        format!("{:.2}ms", us as f64 / 1_000.0)
    } else {
        format!("{}µs", us)
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
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Display a completed send
pub fn display_send_report(report: &SendReport) {
    let srtt = report
        .srtt
        .map(format_rtt)
        .unwrap_or_else(|| "N/A".to_string());

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ TRANSFER COMPLETE (SENDER)                                  │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Sent:       {} in {}",
        format_bytes(report.bytes),
        format_duration(report.duration)
    );
    println!(
        "│ Throughput: {}",
        format_bandwidth(report.throughput_bps() as u64)
    );
    println!(
        "│ Segments:   {} new / {} retransmitted ({} fast, {} timeouts)",
        report.stats.segments_sent,
        report.stats.retransmissions,
        report.stats.fast_retransmits,
        report.stats.timeouts
    );
    println!(
        "│ ACKs:       {} received / {} duplicate",
        report.stats.acks_received, report.stats.duplicate_acks
    );
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ cwnd:       {} ({:?})",
        format_bytes(report.congestion.cwnd as u64),
        report.congestion.phase
    );
    println!(
        "│ ssthresh:   {}",
        format_bytes(report.congestion.ssthresh as u64)
    );
    println!("│ SRTT / RTO: {} / {}", srtt, format_rtt(report.rto));
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// Display a completed receive
pub fn display_receive_report(report: &ReceiveReport) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ TRANSFER COMPLETE (RECEIVER)                                │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Received:   {} in {}",
        format_bytes(report.bytes),
        format_duration(report.duration)
    );
    println!(
        "│ Throughput: {}",
        format_bandwidth(report.throughput_bps() as u64)
    );
    println!(
        "│ Segments:   {} ({} out of order, {} duplicate)",
        report.stats.segments_received, report.stats.out_of_order, report.stats.duplicates
    );
    println!(
        "│ Dropped:    {} malformed / {} buffer full",
        report.stats.malformed, report.stats.buffer_full_drops
    );
    println!(
        "│ ACKs sent:  {} | connection attempts: {}",
        report.stats.acks_sent, report.attempts
    );
    println!("└─────────────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.00 MB");
    }

    #[test]
    fn test_format_bandwidth() {
        assert_eq!(format_bandwidth(500), "500 bps");
        assert_eq!(format_bandwidth(10_000), "10.00 Kbps");
        assert_eq!(format_bandwidth(10_000_000), "10.00 Mbps");
    }

    #[test]
    fn test_format_rtt() {
        assert_eq!(format_rtt(Duration::from_micros(500)), "500µs");
        assert_eq!(format_rtt(Duration::from_millis(50)), "50.00ms");
        assert_eq!(format_rtt(Duration::from_secs(2)), "2.00s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 01m 01s");
    }
}
