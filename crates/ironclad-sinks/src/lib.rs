//! The hub's only window onto the outside world: player registration, leaderboard/stats
//! reporting, and periodic terrain snapshots, all injected behind one trait. Every method
//! returns `()`, not `Result` — a sink failure is the sink's own problem to log and swallow,
//! never the driver's to propagate into a tick.

use std::collections::BTreeMap;

/// Fire-and-forget external reporting. A real deployment's implementation lives outside this
/// crate (HTTP client, database writer, whatever the cloud backend happens to be); the driver
/// only ever sees this trait.
pub trait CloudSink: Send + Sync {
    /// Called once when a non-bot player joins.
    fn register_player(&self, display_name: &str);
    /// Called once when a non-bot player leaves.
    fn unregister_player(&self, display_name: &str);
    /// Called on the cloud timer: current best score per player, current fleet (boat) count, and
    /// a PNG-encoded terrain snapshot.
    fn report(&self, best_scores: &BTreeMap<String, u32>, fleet_size: u32, terrain_png: &[u8]);
}

/// Total no-op. The default for tests and for any deployment that hasn't wired in a real cloud
/// backend yet.
#[derive(Default, Debug)]
pub struct NullSink;

impl CloudSink for NullSink {
    fn register_player(&self, _display_name: &str) {}
    fn unregister_player(&self, _display_name: &str) {}
    fn report(&self, _best_scores: &BTreeMap<String, u32>, _fleet_size: u32, _terrain_png: &[u8]) {}
}

/// Logs every call at `info!` instead of sending anywhere. Useful in integration tests that want
/// to assert a sink was actually invoked, and as a development default before a real backend is
/// wired up.
#[derive(Default, Debug)]
pub struct LoggingSink;

impl CloudSink for LoggingSink {
    fn register_player(&self, display_name: &str) {
        tracing::info!(display_name, "cloud: player registered");
    }

    fn unregister_player(&self, display_name: &str) {
        tracing::info!(display_name, "cloud: player unregistered");
    }

    fn report(&self, best_scores: &BTreeMap<String, u32>, fleet_size: u32, terrain_png: &[u8]) {
        tracing::info!(
            players = best_scores.len(),
            fleet_size,
            snapshot_bytes = terrain_png.len(),
            "cloud: periodic report"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_every_call_without_panicking() {
        let sink = NullSink;
        sink.register_player("alice");
        sink.report(&BTreeMap::new(), 0, &[]);
        sink.unregister_player("alice");
    }

    #[test]
    fn logging_sink_accepts_every_call_without_panicking() {
        let sink = LoggingSink;
        sink.register_player("alice");
        let mut scores = BTreeMap::new();
        scores.insert("alice".to_string(), 42);
        sink.report(&scores, 3, b"not-really-a-png");
        sink.unregister_player("alice");
    }
}
