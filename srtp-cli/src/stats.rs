//! Statistics display and formatting

use srtp_transport::TransportStats;
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

/// Format a packet rate from a count and the time it took
pub fn format_rate(packets: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return "N/A".to_string();
    }
    let rate = packets as f64 / secs;
    if rate >= 1_000_000.0 {
        format!("{:.2} Mpps", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2} Kpps", rate / 1_000.0)
    } else {
        format!("{:.0} pps", rate)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis >= 1_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", millis)
    }
}

/// Display one transport's counters
pub fn display_transport_stats(label: &str, stats: &TransportStats) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ {:<59} │", label);
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Protected:   {:>8} RTP / {:>8} RTCP / {:>12}     │",
        stats.rtp_protected,
        stats.rtcp_protected,
        format_bytes(stats.bytes_protected)
    );
    println!(
        "│ Unprotected: {:>8} RTP / {:>8} RTCP / {:>12}     │",
        stats.rtp_unprotected,
        stats.rtcp_unprotected,
        format_bytes(stats.bytes_unprotected)
    );
    println!(
        "│ Dropped:     {:>8} total                                    │",
        stats.packets_dropped()
    );
    if stats.packets_dropped() > 0 {
        println!(
            "│   not started {} / malformed {} / no session {}",
            stats.dropped_not_started, stats.dropped_malformed, stats.dropped_no_session
        );
        println!(
            "│   unknown channel {} / crypto {} / unsupported {} / forward {}",
            stats.dropped_unknown_channel,
            stats.dropped_crypto,
            stats.dropped_unsupported,
            stats.dropped_forward
        );
    }
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// Display compact stats on one line
pub fn display_compact_stats(stats: &TransportStats, elapsed: Duration) {
    println!(
        "[{}] protected {} | unprotected {} | dropped {} | {}",
        format_duration(elapsed),
        stats.packets_protected(),
        stats.packets_unprotected(),
        stats.packets_dropped(),
        format_rate(stats.packets_unprotected(), elapsed)
    );
}
