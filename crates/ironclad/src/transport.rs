//! The contract between the hub and whatever owns real sockets. Building a WebSocket/HTTP server
//! is explicitly out of this crate's scope — no web framework sits in this workspace's dependency
//! stack, and the transport is treated as an external collaborator, named by its contract only.
//! This module is that contract: a [`Transport`] trait the driver sends outbound frames through,
//! a [`LocalTransport`] in-process adapter (flume channels) good enough to drive the integration
//! tests in `tests/scenarios.rs`, and the per-IP connection-cap bookkeeping a real adapter would
//! consult before accepting a new socket.

use std::collections::HashMap;
use std::net::IpAddr;

use ironclad_proto::Outbound;
use parking_lot::Mutex;

use crate::ClientId;

/// Anything that can deliver one outbound frame to one connected client. A transport adapter
/// (a real WebSocket server, or [`LocalTransport`] for tests) implements this; the hub and its
/// driver loop never touch a socket, only this trait object.
pub trait Transport: Send + Sync {
    fn send(&self, client: ClientId, msg: &Outbound);
}

/// Discards every frame. The driver's default before a real transport adapter is wired in.
#[derive(Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _client: ClientId, _msg: &Outbound) {}
}

/// Logs every outbound frame at `trace!` instead of delivering it anywhere. Useful for running
/// the driver loop standalone (see `main.rs`) without a real socket layer behind it.
#[derive(Default)]
pub struct LoggingTransport;

impl Transport for LoggingTransport {
    fn send(&self, client: ClientId, msg: &Outbound) {
        let tag = match msg {
            Outbound::Update(_) => "update",
            Outbound::Leaderboard(_) => "leaderboard",
        };
        tracing::trace!(client = client.0, tag, "outbound frame");
    }
}

/// In-process [`Transport`]: outbound frames go onto a `flume` channel a test can drain, instead
/// of a socket. No codec here at all, just the already-decoded [`Outbound`] value.
pub struct LocalTransport {
    tx: flume::Sender<(ClientId, Outbound)>,
}

impl LocalTransport {
    #[must_use]
    pub fn new() -> (Self, flume::Receiver<(ClientId, Outbound)>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl Transport for LocalTransport {
    fn send(&self, client: ClientId, msg: &Outbound) {
        let _ = self.tx.send((client, msg.clone()));
    }
}

/// Per-IP connection cap, a small locked map, default 10 concurrent connections from one address. A real WebSocket upgrade handler would call [`ConnectionLimiter::try_acquire`]
/// before accepting a socket and [`ConnectionLimiter::release`] when it closes; this crate's own
/// driver loop (no real sockets) never calls it, but it's the unit such a handler would consult.
pub struct ConnectionLimiter {
    max_per_ip: u32,
    counts: Mutex<HashMap<IpAddr, u32>>,
}

impl ConnectionLimiter {
    #[must_use]
    pub fn new(max_per_ip: u32) -> Self {
        Self { max_per_ip, counts: Mutex::new(HashMap::new()) }
    }

    /// Returns `true` and reserves a slot iff `ip` is under its cap.
    #[must_use]
    pub fn try_acquire(&self, ip: IpAddr) -> bool {
        let mut counts = self.counts.lock();
        let entry = counts.entry(ip).or_insert(0);
        if *entry >= self.max_per_ip {
            return false;
        }
        *entry += 1;
        true
    }

    pub fn release(&self, ip: IpAddr) {
        let mut counts = self.counts.lock();
        if let Some(entry) = counts.get_mut(&ip) {
            *entry = entry.saturating_sub(1);
            if *entry == 0 {
                counts.remove(&ip);
            }
        }
    }
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_connections_per_ip() {
        let limiter = ConnectionLimiter::new(2);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.try_acquire(ip));
        assert!(limiter.try_acquire(ip));
        assert!(!limiter.try_acquire(ip));
        limiter.release(ip);
        assert!(limiter.try_acquire(ip));
    }

    #[test]
    fn different_ips_have_independent_budgets() {
        let limiter = ConnectionLimiter::new(1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.try_acquire(a));
        assert!(limiter.try_acquire(b));
    }

    #[test]
    fn local_transport_delivers_to_its_receiver() {
        let (transport, rx) = LocalTransport::new();
        let msg = Outbound::Leaderboard(ironclad_proto::LeaderboardPayload::default());
        transport.send(ClientId(1), &msg);
        let (client, received) = rx.recv().unwrap();
        assert_eq!(client.0, 1);
        assert!(matches!(received, Outbound::Leaderboard(_)));
    }
}
