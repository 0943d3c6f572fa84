//! Per-endpoint packet rate limiting.
//!
//! Runs before any decode work, bounding what a flooding peer can cost.
//! Repeat offenders and protocol violators accumulate violations toward a
//! temporary ban.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Packets admitted per window per endpoint.
    pub max_per_window: u32,
    pub window: Duration,
    /// Violations before a temporary ban.
    pub violations_before_ban: u32,
    pub ban_duration: Duration,
    /// Peers silent this long are forgotten by the sweep.
    pub idle_retention: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: 100,
            window: Duration::from_secs(1),
            violations_before_ban: 20,
            ban_duration: Duration::from_secs(60),
            idle_retention: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct PeerWindow {
    count: u32,
    window_start: Instant,
    violations: u32,
    last_seen: Instant,
}

impl PeerWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            violations: 0,
            last_seen: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("endpoint is banned")]
    Banned,
    #[error("rate limit exceeded")]
    Exceeded,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    peers: FxHashMap<SocketAddr, PeerWindow>,
    banned: FxHashMap<SocketAddr, Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            peers: FxHashMap::default(),
            banned: FxHashMap::default(),
        }
    }

    /// Admits or rejects one inbound packet from `addr`. Exactly
    /// `max_per_window` packets pass per window; the next one is rejected
    /// and counts as a violation.
    pub fn check(&mut self, addr: SocketAddr) -> Result<(), RateLimitError> {
        let now = Instant::now();
        if let Some(banned_at) = self.banned.get(&addr) {
            if now.duration_since(*banned_at) < self.config.ban_duration {
                return Err(RateLimitError::Banned);
            }
            self.banned.remove(&addr);
        }

        let peer = self
            .peers
            .entry(addr)
            .or_insert_with(|| PeerWindow::new(now));
        peer.last_seen = now;
        if now.duration_since(peer.window_start) >= self.config.window {
            peer.window_start = now;
            peer.count = 0;
        }
        peer.count += 1;
        if peer.count > self.config.max_per_window {
            peer.violations += 1;
            if peer.violations >= self.config.violations_before_ban {
                warn!(%addr, violations = peer.violations, "endpoint banned for flooding");
                self.banned.insert(addr, now);
            }
            return Err(RateLimitError::Exceeded);
        }
        Ok(())
    }

    /// Records a protocol violation (bad slot, unjoined INPUT, …); enough
    /// of them escalates to the same temporary ban as flooding.
    pub fn note_violation(&mut self, addr: SocketAddr) {
        let now = Instant::now();
        let peer = self
            .peers
            .entry(addr)
            .or_insert_with(|| PeerWindow::new(now));
        peer.violations += 1;
        if peer.violations >= self.config.violations_before_ban {
            warn!(%addr, violations = peer.violations, "endpoint banned for protocol violations");
            self.banned.insert(addr, now);
        }
    }

    pub fn is_banned(&self, addr: SocketAddr) -> bool {
        self.banned
            .get(&addr)
            .map(|at| at.elapsed() < self.config.ban_duration)
            .unwrap_or(false)
    }

    /// Drops expired bans and long-idle peer windows.
    pub fn sweep(&mut self) {
        let ban_duration = self.config.ban_duration;
        self.banned.retain(|_, at| at.elapsed() < ban_duration);
        let retention = self.config.idle_retention;
        self.peers.retain(|_, p| p.last_seen.elapsed() < retention);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
