//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use regex::Regex;
use std::sync::OnceLock;

use crate::models::EndpointAddress;

/// Check that an address is written as `host:port`
pub fn valid_address(address: &str) -> bool {
    static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

    let re = ADDRESS_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9.-]+:[0-9]{2,5}$").expect("Invalid regex pattern")
    });

    re.is_match(address)
}

/// Parse a `host:port` string into an endpoint address
///
/// Returns `None` when the shape is wrong or the port is outside 1..=65535.
pub fn parse_address(address: &str) -> Option<EndpointAddress> {
    let address = address.trim();
    if !valid_address(address) {
        return None;
    }

    let (host, port) = address.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    if port == 0 {
        return None;
    }

    Some(EndpointAddress::new(host, port))
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Format a duration as a compact `1d 2h 3m` string
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{total}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        assert!(valid_address("play.mysrv.com:25565"));
        assert!(valid_address("127.0.0.1:19132"));
        assert!(!valid_address("play.mysrv.com"));
        assert!(!valid_address("play.mysrv.com:5"));
        assert!(!valid_address("play.mysrv.com:255650"));
        assert!(!valid_address("bad host:25565"));
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address("Play.Test.com:25565").unwrap();
        assert_eq!(addr.host, "play.test.com");
        assert_eq!(addr.port, 25565);

        assert!(parse_address("play.test.com:70000").is_none());
        assert!(parse_address("play.test.com:00").is_none());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long motd line", 8), "a lon...");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::minutes(125)), "2h 5m");
        assert_eq!(
            format_duration(chrono::Duration::hours(26) + chrono::Duration::minutes(1)),
            "1d 2h 1m"
        );
    }
}
