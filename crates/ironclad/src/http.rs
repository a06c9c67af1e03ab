//! The status endpoint's contract: `{"players": n}`, read from an atomically-updated counter
//! rather than locking the hub. Wiring an actual HTTP listener onto this is the same out-of-scope
//! transport concern `transport.rs` documents — no HTTP framework sits in this workspace's
//! dependency stack, so this module stops at the counter and the JSON it renders.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared, lock-free player count a status handler can read without touching the hub thread.
#[derive(Clone, Default)]
pub struct PlayerCountGauge(Arc<AtomicU32>);

impl PlayerCountGauge {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    pub fn set(&self, count: usize) {
        self.0.store(count as u32, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// The status endpoint's exact response body.
    #[must_use]
    pub fn to_json(&self) -> String {
        status_json(self.get())
    }
}

#[must_use]
pub fn status_json(players: u32) -> String {
    format!("{{\"players\":{players}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_player_count() {
        let gauge = PlayerCountGauge::new();
        gauge.set(7);
        assert_eq!(gauge.to_json(), "{\"players\":7}");
    }

    #[test]
    fn starts_at_zero() {
        assert_eq!(PlayerCountGauge::new().to_json(), "{\"players\":0}");
    }
}
