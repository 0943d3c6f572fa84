//! UDP listener: the process's single socket and dispatch loop.
//!
//! Non-blocking receive loop: rate-limit the endpoint, decode the header,
//! route by type — JOIN/LEAVE to the room manager, INPUT to the owning
//! room's inbox. Outbound snapshots arrive from room tasks over a channel
//! and go out one datagram per connected slot, the same buffer for every
//! slot. Simulation never waits on any of this.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use smallvec::SmallVec;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::context::ServerContext;
use crate::game::input::InputFrame;
use crate::net::protocol::{self, Packet, MAX_SLOTS};
use crate::net::rate_limit::{RateLimitConfig, RateLimiter};
use crate::room::manager::RoomManager;
use crate::room::room::RoomEvent;

/// One encoded snapshot and the slots it broadcasts to.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub payload: Vec<u8>,
    pub targets: SmallVec<[SocketAddr; MAX_SLOTS]>,
}

pub struct Listener {
    socket: Arc<UdpSocket>,
    manager: RoomManager,
    limiter: RateLimiter,
    ctx: Arc<ServerContext>,
    out_rx: mpsc::Receiver<Outbound>,
    events_rx: mpsc::Receiver<RoomEvent>,
}

impl Listener {
    pub async fn bind(ctx: Arc<ServerContext>) -> anyhow::Result<Self> {
        let addr = SocketAddr::new(ctx.config.bind_address, ctx.config.port);
        let socket = Arc::new(UdpSocket::bind(addr).await.context("udp bind")?);

        let (out_tx, out_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(32);
        let manager = RoomManager::new(ctx.clone(), out_tx, events_tx);
        let limiter = RateLimiter::new(RateLimitConfig {
            max_per_window: ctx.config.packet_rate_cap,
            ..Default::default()
        });

        Ok(Self {
            socket,
            manager,
            limiter,
            ctx,
            out_rx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// The dispatch loop. Runs until the task is aborted; shutdown is the
    /// caller dropping or aborting it after `RoomManager::shutdown_all`.
    pub async fn run(self) -> anyhow::Result<()> {
        let Listener {
            socket,
            mut manager,
            mut limiter,
            ctx,
            mut out_rx,
            mut events_rx,
        } = self;

        let idle_timeout = Duration::from_secs(ctx.config.idle_timeout_secs);
        let mut sweep = interval(Duration::from_secs(5));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report = interval(Duration::from_secs(60));
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buf = vec![0u8; 64 * 1024];
        info!(addr = %socket.local_addr()?, "listener running");

        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, addr)) => {
                            handle_datagram(&socket, &mut manager, &mut limiter, &ctx, addr, &buf[..len])
                                .await;
                        }
                        Err(e) => {
                            // Transient ICMP-driven errors are routine for UDP.
                            debug!(error = %e, "recv_from failed");
                        }
                    }
                }
                Some(out) = out_rx.recv() => {
                    for target in &out.targets {
                        if let Err(e) = socket.send_to(&out.payload, target).await {
                            debug!(%target, error = %e, "snapshot send failed");
                        }
                    }
                    ctx.metrics.add_snapshots_sent(out.targets.len() as u64);
                }
                Some(event) = events_rx.recv() => {
                    manager.handle_event(event);
                }
                _ = sweep.tick() => {
                    for endpoint in manager.sweep_idle(idle_timeout) {
                        debug!(%endpoint, "swept idle endpoint");
                    }
                    limiter.sweep();
                }
                _ = report.tick() => {
                    info!(target: "metrics", "{}", ctx.metrics.to_json());
                }
            }
        }
    }
}

async fn handle_datagram(
    socket: &UdpSocket,
    manager: &mut RoomManager,
    limiter: &mut RateLimiter,
    ctx: &ServerContext,
    addr: SocketAddr,
    bytes: &[u8],
) {
    ctx.metrics.inc_packets_received();
    if limiter.check(addr).is_err() {
        ctx.metrics.inc_packets_rate_limited();
        return;
    }

    let packet = match protocol::decode(bytes) {
        Ok(packet) => packet,
        Err(e) => {
            // Malformed traffic is dropped silently; it already counted
            // toward the sender's window above.
            ctx.metrics.inc_packets_malformed();
            debug!(%addr, error = %e, "malformed packet dropped");
            return;
        }
    };

    match packet {
        Packet::Join { name } => match manager.admit(addr, name) {
            Ok(ack) => {
                let reply = protocol::encode(&Packet::Ack {
                    slot: ack.slot,
                    room: ack.room,
                    tick: ack.tick,
                });
                if let Err(e) = socket.send_to(&reply, addr).await {
                    warn!(%addr, error = %e, "ack send failed");
                }
            }
            Err(e) => {
                // Client retry/backoff handles the rest.
                ctx.metrics.inc_joins_rejected();
                warn!(%addr, error = %e, "join rejected");
            }
        },
        Packet::Input { slot, keys, seq } => match manager.binding(addr) {
            None => violation(limiter, ctx, addr, "input from unjoined endpoint"),
            Some((_, bound)) if bound != slot => {
                violation(limiter, ctx, addr, "input slot does not match binding")
            }
            Some((room, _)) => {
                manager.touch(addr);
                match manager.inbox(room) {
                    Some(inbox) if inbox.try_send(InputFrame { slot, keys, seq }).is_ok() => {
                        ctx.metrics.inc_inputs_enqueued();
                    }
                    _ => ctx.metrics.inc_inputs_dropped(),
                }
            }
        },
        Packet::Leave { slot } => match manager.binding(addr) {
            Some((_, bound)) if bound == slot => {
                manager.remove_player(addr);
            }
            _ => violation(limiter, ctx, addr, "leave slot does not match binding"),
        },
        Packet::Ack { .. } | Packet::Snapshot(_) => {
            violation(limiter, ctx, addr, "server-only packet type from client")
        }
    }
}

fn violation(limiter: &mut RateLimiter, ctx: &ServerContext, addr: SocketAddr, why: &'static str) {
    ctx.metrics.inc_protocol_violations();
    limiter.note_violation(addr);
    warn!(%addr, why, "protocol violation dropped");
}
