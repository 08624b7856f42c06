//! Status dump parser
//!
//! Parses the tab/space separated output of `wg show <iface> dump`. The first
//! non-blank line describes the interface itself and is skipped; every other
//! line describes one peer:
//!
//! ```text
//! public_key preshared_key endpoint allowed_ips latest_handshake rx_bytes tx_bytes persistent_keepalive
//! ```
//!
//! A malformed peer line is dropped on its own; it never fails the whole dump.

use crate::peer::{PeerRecord, PeerSet};
use tracing::debug;

/// Number of columns a peer line must have to be considered
pub const MIN_PEER_FIELDS: usize = 8;

/// Parse a full dump into a peer set. Later duplicates of a key replace earlier ones.
pub fn parse_dump(dump: &str) -> PeerSet {
    dump.lines()
        .filter(|line| !line.trim().is_empty())
        .skip(1)
        .filter_map(parse_peer_line)
        .map(|peer| (peer.public_key.clone(), peer))
        .collect()
}

/// Parse a single peer line, returning `None` if it has too few columns.
pub fn parse_peer_line(line: &str) -> Option<PeerRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_PEER_FIELDS {
        debug!(
            fields = fields.len(),
            "Skipping dump line with too few fields"
        );
        return None;
    }

    Some(PeerRecord {
        public_key: fields[0].to_string(),
        endpoint: optional_field(fields[2]).map(str::to_string),
        allowed_ips: optional_field(fields[3])
            .map(|ips| {
                ips.split(',')
                    .filter(|ip| !ip.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        latest_handshake: fields[4].parse().unwrap_or(0),
        rx_bytes: fields[5].parse().unwrap_or(0),
        tx_bytes: fields[6].parse().unwrap_or(0),
        persistent_keepalive: optional_field(fields[7]).and_then(|v| v.parse().ok()),
    })
}

/// Render a record back into a dump peer line.
///
/// The preshared key column is always written as absent.
pub fn format_peer_line(peer: &PeerRecord) -> String {
    let allowed_ips = if peer.allowed_ips.is_empty() {
        "(none)".to_string()
    } else {
        peer.allowed_ips.join(",")
    };
    let keepalive = match peer.persistent_keepalive {
        Some(seconds) if seconds > 0 => seconds.to_string(),
        _ => "off".to_string(),
    };

    format!(
        "{}\t(none)\t{}\t{}\t{}\t{}\t{}\t{}",
        peer.public_key,
        peer.endpoint.as_deref().unwrap_or("(none)"),
        allowed_ips,
        peer.latest_handshake,
        peer.rx_bytes,
        peer.tx_bytes,
        keepalive
    )
}

/// `-` is the documented sentinel; `wg` itself prints `(none)` and `off`.
fn optional_field(value: &str) -> Option<&str> {
    match value {
        "-" | "(none)" | "off" => None,
        other => Some(other),
    }
}
