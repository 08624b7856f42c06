//! Handshake-based liveness

/// Whether a peer counts as online.
///
/// A peer is online when it has completed a handshake (`latest_handshake != 0`)
/// no more than `staleness_threshold` seconds before `now`. Callers sample `now`
/// once per cycle and reuse it for every peer. A handshake stamped in the future
/// (clock skew between the two hosts) counts as online.
pub fn is_online(latest_handshake: i64, now: i64, staleness_threshold: u64) -> bool {
    if latest_handshake == 0 {
        return false;
    }
    let age = now.saturating_sub(latest_handshake);
    age <= 0 || (age as u64) <= staleness_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary() {
        assert!(is_online(880, 1000, 120));
        assert!(!is_online(879, 1000, 120));
    }

    #[test]
    fn test_never_handshaked_is_offline() {
        assert!(!is_online(0, 1000, 120));
        assert!(!is_online(0, 0, 120));
        assert!(!is_online(0, 50, u64::MAX));
    }

    #[test]
    fn test_future_handshake_is_online() {
        assert!(is_online(1010, 1000, 120));
    }

    #[test]
    fn test_zero_threshold() {
        assert!(is_online(1000, 1000, 0));
        assert!(!is_online(999, 1000, 0));
    }
}
