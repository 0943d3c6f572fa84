//! Room lifecycle and player admission.
//!
//! The manager owns the room table and the endpoint → (room, slot) map. It
//! lives on the listener task; rooms run on their own tasks and talk back
//! only through finish events, so no lock guards cross-room state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::context::ServerContext;
use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
use crate::net::listener::Outbound;
use crate::net::protocol::MAX_SLOTS;
use crate::room::inbox::{InboxSender, RoomInbox};
use crate::room::room::{self, Room, RoomConfig, RoomControl, RoomEvent, RoomShared, RoomState};

/// Admission failures surfaced to the listener.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdmissionError {
    #[error("room limit reached")]
    RoomLimit,
    #[error("room not found")]
    RoomNotFound,
    #[error("room filled concurrently")]
    RoomFull,
}

/// What a successful admission tells the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckInfo {
    pub room: Uuid,
    pub slot: u8,
    pub tick: u64,
}

/// The manager's grip on one running room task.
pub struct RoomHandle {
    pub id: Uuid,
    shared: Arc<RoomShared>,
    ctrl: mpsc::Sender<RoomControl>,
    inbox: InboxSender,
    occupied: [Option<SocketAddr>; MAX_SLOTS],
}

impl RoomHandle {
    pub fn state(&self) -> RoomState {
        self.shared.state()
    }

    pub fn tick(&self) -> u64 {
        self.shared.tick()
    }

    fn free_slot(&self, capacity: usize) -> Option<u8> {
        self.occupied[..capacity]
            .iter()
            .position(|s| s.is_none())
            .map(|i| i as u8)
    }

    fn occupied_count(&self) -> usize {
        self.occupied.iter().flatten().count()
    }
}

pub struct RoomManager {
    ctx: Arc<ServerContext>,
    rooms: HashMap<Uuid, RoomHandle>,
    /// Creation order; `find_available_room` scans it front to back.
    order: Vec<Uuid>,
    endpoints: FxHashMap<SocketAddr, (Uuid, u8)>,
    last_seen: FxHashMap<SocketAddr, Instant>,
    out_tx: mpsc::Sender<Outbound>,
    events_tx: mpsc::Sender<RoomEvent>,
}

impl RoomManager {
    pub fn new(
        ctx: Arc<ServerContext>,
        out_tx: mpsc::Sender<Outbound>,
        events_tx: mpsc::Sender<RoomEvent>,
    ) -> Self {
        Self {
            ctx,
            rooms: HashMap::new(),
            order: Vec::new(),
            endpoints: FxHashMap::default(),
            last_seen: FxHashMap::default(),
            out_tx,
            events_tx,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_count(&self) -> usize {
        self.endpoints.len()
    }

    /// First non-finished room with a free slot, in creation order.
    pub fn find_available_room(&self) -> Option<Uuid> {
        let capacity = self.ctx.config.room_capacity;
        self.order.iter().copied().find(|id| {
            self.rooms
                .get(id)
                .map(|h| h.state() != RoomState::Finished && h.free_slot(capacity).is_some())
                .unwrap_or(false)
        })
    }

    /// Spawns a new room task in WAITING.
    pub fn create_room(&mut self) -> Result<Uuid, AdmissionError> {
        if self.rooms.len() >= self.ctx.config.max_rooms {
            return Err(AdmissionError::RoomLimit);
        }
        let id = Uuid::new_v4();
        let config = RoomConfig {
            capacity: self.ctx.config.room_capacity,
            min_players: self.ctx.config.min_players,
            tick_rate: self.ctx.config.tick_rate,
            ..Default::default()
        };
        let room = Room::new(
            id,
            config,
            ArchetypeLibrary::standard(),
            SpawnSchedule::standard_wave(),
        );

        let shared = Arc::new(RoomShared::default());
        let (ctrl_tx, ctrl_rx) = mpsc::channel(16);
        let inbox = RoomInbox::default();
        let inbox_sender = inbox.sender();

        let span = info_span!("room", id = %id);
        tokio::spawn(
            room::run(
                room,
                shared.clone(),
                ctrl_rx,
                inbox,
                self.out_tx.clone(),
                self.events_tx.clone(),
            )
            .instrument(span),
        );

        self.rooms.insert(
            id,
            RoomHandle {
                id,
                shared,
                ctrl: ctrl_tx,
                inbox: inbox_sender,
                occupied: Default::default(),
            },
        );
        self.order.push(id);
        self.ctx.metrics.inc_rooms_created();
        info!(room = %id, "room created");
        Ok(id)
    }

    /// Admits an endpoint: an existing binding is re-acknowledged (JOIN
    /// retries are idempotent), otherwise the first available room takes
    /// it, creating one if every room is full.
    pub fn admit(&mut self, endpoint: SocketAddr, name: String) -> Result<AckInfo, AdmissionError> {
        if let Some(&(room, slot)) = self.endpoints.get(&endpoint) {
            let tick = self.rooms.get(&room).map(|h| h.tick()).unwrap_or(0);
            return Ok(AckInfo { room, slot, tick });
        }
        let room = match self.find_available_room() {
            Some(id) => id,
            None => self.create_room()?,
        };
        match self.assign_player(room, endpoint, name.clone()) {
            // Filled or died between the query and the bind: take a fresh
            // room instead of bouncing the client.
            Err(AdmissionError::RoomFull | AdmissionError::RoomNotFound) => {
                let fresh = self.create_room()?;
                self.assign_player(fresh, endpoint, name)
            }
            other => other,
        }
    }

    /// Binds `endpoint` to a free slot of `room`. Fails if the room filled
    /// concurrently; the caller re-queries.
    pub fn assign_player(
        &mut self,
        room: Uuid,
        endpoint: SocketAddr,
        name: String,
    ) -> Result<AckInfo, AdmissionError> {
        let capacity = self.ctx.config.room_capacity;
        let handle = self.rooms.get_mut(&room).ok_or(AdmissionError::RoomNotFound)?;
        let slot = handle.free_slot(capacity).ok_or(AdmissionError::RoomFull)?;

        if handle
            .ctrl
            .try_send(RoomControl::Join {
                slot,
                endpoint,
                name,
            })
            .is_err()
        {
            // Task is gone or backlogged; treat the room as unavailable.
            return Err(AdmissionError::RoomFull);
        }
        handle.occupied[slot as usize] = Some(endpoint);
        let tick = handle.tick();
        self.endpoints.insert(endpoint, (room, slot));
        self.last_seen.insert(endpoint, Instant::now());
        self.ctx.metrics.inc_joins_accepted();
        info!(room = %room, slot, %endpoint, "player assigned");
        Ok(AckInfo { room, slot, tick })
    }

    /// Unbinds an endpoint; explicit LEAVE and the idle sweep both land
    /// here.
    pub fn remove_player(&mut self, endpoint: SocketAddr) -> Option<(Uuid, u8)> {
        let (room, slot) = self.endpoints.remove(&endpoint)?;
        self.last_seen.remove(&endpoint);
        if let Some(handle) = self.rooms.get_mut(&room) {
            handle.occupied[slot as usize] = None;
            let _ = handle.ctrl.try_send(RoomControl::Leave { slot });
            if handle.occupied_count() == 0 {
                let _ = handle.ctrl.try_send(RoomControl::Shutdown);
            }
        }
        self.ctx.metrics.inc_players_left();
        info!(room = %room, slot, %endpoint, "player removed");
        Some((room, slot))
    }

    pub fn binding(&self, endpoint: SocketAddr) -> Option<(Uuid, u8)> {
        self.endpoints.get(&endpoint).copied()
    }

    pub fn inbox(&self, room: Uuid) -> Option<&InboxSender> {
        self.rooms.get(&room).map(|h| &h.inbox)
    }

    /// Marks the endpoint live; packets from bound endpoints call this.
    pub fn touch(&mut self, endpoint: SocketAddr) {
        if let Some(seen) = self.last_seen.get_mut(&endpoint) {
            *seen = Instant::now();
        }
    }

    /// Removes endpoints silent past `timeout`, through the same path as
    /// an explicit leave. Returns who was swept.
    pub fn sweep_idle(&mut self, timeout: Duration) -> Vec<SocketAddr> {
        let now = Instant::now();
        let idle: Vec<SocketAddr> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) >= timeout)
            .map(|(ep, _)| *ep)
            .collect();
        for endpoint in &idle {
            warn!(%endpoint, "idle timeout; removing player");
            self.remove_player(*endpoint);
        }
        idle
    }

    /// Handles a room task's parting event: drops the handle and any
    /// binding that still points at the room.
    pub fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Finished(id) => {
                self.rooms.remove(&id);
                self.order.retain(|r| *r != id);
                let stale: Vec<SocketAddr> = self
                    .endpoints
                    .iter()
                    .filter(|(_, (room, _))| *room == id)
                    .map(|(ep, _)| *ep)
                    .collect();
                for endpoint in stale {
                    self.endpoints.remove(&endpoint);
                    self.last_seen.remove(&endpoint);
                }
                self.ctx.metrics.inc_rooms_finished();
                info!(room = %id, "room torn down");
            }
        }
    }

    /// Cooperative shutdown: every room finishes its tick and exits.
    pub fn shutdown_all(&mut self) {
        for handle in self.rooms.values() {
            let _ = handle.ctrl.try_send(RoomControl::Shutdown);
        }
    }
}
