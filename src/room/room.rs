//! One isolated match: registry, scheduler, player slots, and the
//! deterministic fixed-tick loop.
//!
//! Nothing outside the room task ever touches the registry; the listener
//! reaches a room only through its inbox (inputs), its control channel
//! (join/leave/shutdown), and the shared atomic mirrors (state, tick).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use smallvec::SmallVec;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::ecs::scheduler::Scheduler;
use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
use crate::game::commands;
use crate::game::components::{CompanionOrb, PlayerControlled};
use crate::game::constants::player;
use crate::game::input::InputFrame;
use crate::game::{snapshot, SimState};
use crate::net::listener::Outbound;
use crate::net::protocol::{self, Packet, Snapshot, MAX_SLOTS};
use crate::room::inbox::RoomInbox;

/// Room lifecycle. FINISHED is terminal; the task exits and the manager
/// tears the room down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Accepting joins, below the activation trigger.
    Waiting,
    /// Simulating.
    Active,
    /// Torn down after the last player left.
    Finished,
}

impl RoomState {
    fn to_u8(self) -> u8 {
        match self {
            RoomState::Waiting => 0,
            RoomState::Active => 1,
            RoomState::Finished => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => RoomState::Waiting,
            1 => RoomState::Active,
            _ => RoomState::Finished,
        }
    }
}

/// Lock-free mirrors the manager reads without touching the room.
#[derive(Debug, Default)]
pub struct RoomShared {
    state: AtomicU8,
    tick: AtomicU64,
}

impl RoomShared {
    pub fn state(&self) -> RoomState {
        RoomState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: RoomState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    pub fn set_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::Release);
    }
}

/// Control messages from the manager to the room task.
#[derive(Debug)]
pub enum RoomControl {
    Join {
        slot: u8,
        endpoint: SocketAddr,
        name: String,
    },
    Leave {
        slot: u8,
    },
    Shutdown,
}

/// Room → manager notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    Finished(Uuid),
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub capacity: usize,
    /// Player count that fires WAITING → ACTIVE.
    pub min_players: usize,
    pub tick_rate: u32,
    /// Seeds the room rng; same seed + same inputs = same snapshots.
    pub seed: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_SLOTS,
            min_players: 1,
            tick_rate: crate::game::constants::sim::TICK_RATE,
            seed: 0x4E4F_5641,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("slot {0} out of range")]
    BadSlot(u8),
    #[error("slot {0} already bound")]
    SlotTaken(u8),
    #[error("room is finished")]
    Finished,
}

struct PlayerSlot {
    endpoint: SocketAddr,
    name: String,
    entity: Entity,
}

pub struct Room {
    id: Uuid,
    state: RoomState,
    tick: u64,
    dt: f32,
    capacity: usize,
    min_players: usize,
    registry: Registry,
    scheduler: Scheduler,
    sim: SimState,
    slots: [Option<PlayerSlot>; MAX_SLOTS],
}

impl Room {
    pub fn new(
        id: Uuid,
        config: RoomConfig,
        archetypes: ArchetypeLibrary,
        schedule: SpawnSchedule,
    ) -> Self {
        let capacity = config.capacity.clamp(1, MAX_SLOTS);
        Self {
            id,
            state: RoomState::Waiting,
            tick: 0,
            dt: 1.0 / config.tick_rate as f32,
            capacity,
            min_players: config.min_players.clamp(1, capacity),
            registry: Registry::new(),
            scheduler: crate::game::standard_scheduler(),
            sim: SimState::new(archetypes, schedule, config.seed),
            slots: Default::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn occupied(&self) -> usize {
        self.slots[..self.capacity]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn has_free_slot(&self) -> bool {
        self.occupied() < self.capacity
    }

    /// Endpoints of every bound slot, for snapshot broadcast.
    pub fn endpoints(&self) -> SmallVec<[SocketAddr; MAX_SLOTS]> {
        self.slots[..self.capacity]
            .iter()
            .flatten()
            .map(|s| s.endpoint)
            .collect()
    }

    /// Binds `endpoint` to `slot` and spawns its ship plus companion orb.
    pub fn join(&mut self, slot: u8, endpoint: SocketAddr, name: String) -> Result<(), RoomError> {
        if self.state == RoomState::Finished {
            return Err(RoomError::Finished);
        }
        if slot as usize >= self.capacity {
            return Err(RoomError::BadSlot(slot));
        }
        if self.slots[slot as usize].is_some() {
            return Err(RoomError::SlotTaken(slot));
        }

        let spawn = crate::util::vec2::Vec2::new(player::SPAWN_X, player::SPAWN_YS[slot as usize]);
        let ship = match self.sim.archetypes.get("player") {
            Some(template) => template.instantiate(&mut self.registry, spawn),
            None => {
                warn!(room = %self.id, "archetype library has no player template");
                self.registry.create_entity()
            }
        };
        if let Some(mut pc) = self.registry.get_mut::<PlayerControlled>(ship) {
            pc.slot = slot;
        }
        if let Some(orb_template) = self.sim.archetypes.get("orb") {
            let orb = orb_template.instantiate(&mut self.registry, spawn);
            self.registry.add_component(
                orb,
                CompanionOrb {
                    owner: ship,
                    attached: true,
                },
            );
        }

        self.sim.inputs.reset_slot(slot);
        self.slots[slot as usize] = Some(PlayerSlot {
            endpoint,
            name,
            entity: ship,
        });

        if self.state == RoomState::Waiting && self.occupied() >= self.min_players {
            info!(room = %self.id, players = self.occupied(), "room activating");
            self.state = RoomState::Active;
        }
        Ok(())
    }

    /// Frees `slot`, destroying its ship and orb. The room finishes when
    /// the last slot empties.
    pub fn leave(&mut self, slot: u8) -> Option<SocketAddr> {
        let bound = self.slots.get_mut(slot as usize)?.take()?;
        let ship = bound.entity;

        let mut orbs = Vec::new();
        self.registry.for_each::<CompanionOrb>(|entity, orb| {
            if orb.owner == ship {
                orbs.push(entity);
            }
        });
        for orb in orbs {
            self.registry.destroy_entity(orb);
        }
        self.registry.destroy_entity(ship);
        self.sim.inputs.reset_slot(slot);

        debug!(room = %self.id, slot, name = %bound.name, "slot freed");
        if self.occupied() == 0 {
            info!(room = %self.id, "last player left; room finished");
            self.state = RoomState::Finished;
        }
        Some(bound.endpoint)
    }

    /// Queues an input frame for its slot. Unbound or out-of-range slots
    /// are dropped before anything is indexed.
    pub fn enqueue_input(&mut self, frame: InputFrame) -> bool {
        match self.slots.get(frame.slot as usize) {
            Some(Some(_)) => self.sim.inputs.push(frame),
            _ => false,
        }
    }

    pub fn handle_control(&mut self, msg: RoomControl) {
        match msg {
            RoomControl::Join {
                slot,
                endpoint,
                name,
            } => {
                if let Err(e) = self.join(slot, endpoint, name) {
                    warn!(room = %self.id, error = %e, "join control rejected");
                }
            }
            RoomControl::Leave { slot } => {
                self.leave(slot);
            }
            RoomControl::Shutdown => {
                self.state = RoomState::Finished;
            }
        }
    }

    /// One fixed-Δt advance. Returns the tick's snapshot while ACTIVE.
    ///
    /// Order per tick: drain one input per slot, logic group, physics
    /// group (commands settle after each group), reclaim dead, increment
    /// the counter, build the snapshot, then release cooled entity ids.
    pub fn tick(&mut self) -> Option<Snapshot> {
        if self.state != RoomState::Active {
            return None;
        }
        let now = self.tick as f64 * self.dt as f64;
        self.sim.tick = self.tick;
        self.sim.clock = now;

        self.sim.inputs.begin_tick();

        self.scheduler.run_group("logic", now, &self.registry, &mut self.sim);
        self.settle_commands();
        self.scheduler.run_group("physics", now, &self.registry, &mut self.sim);
        self.settle_commands();

        self.registry.reclaim_dead();

        self.tick += 1;
        let snapshot = snapshot::build(&self.registry, self.tick);
        self.registry.release_cooled();
        Some(snapshot)
    }

    fn settle_commands(&mut self) {
        let SimState {
            commands: buffer,
            scripts,
            archetypes,
            ..
        } = &mut self.sim;
        commands::apply(buffer, &mut self.registry, scripts, archetypes);
    }
}

/// The per-room task: ticks at the configured rate, applies control
/// messages between ticks, and hands each snapshot to the listener for
/// broadcast. Cancellation is cooperative — the current tick always
/// completes.
pub async fn run(
    mut room: Room,
    shared: Arc<RoomShared>,
    mut ctrl: mpsc::Receiver<RoomControl>,
    inbox: RoomInbox,
    out: mpsc::Sender<Outbound>,
    events: mpsc::Sender<RoomEvent>,
) {
    let period = Duration::from_secs_f64(room.dt as f64);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = ctrl.recv() => {
                match maybe {
                    Some(msg) => {
                        room.handle_control(msg);
                        shared.set_state(room.state());
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                for frame in inbox.drain() {
                    room.enqueue_input(frame);
                }
                if let Some(snapshot) = room.tick() {
                    shared.set_tick(room.tick_count());
                    let targets = room.endpoints();
                    if !targets.is_empty() {
                        let payload = protocol::encode(&Packet::Snapshot(snapshot));
                        if out.try_send(Outbound { payload, targets }).is_err() {
                            debug!(room = %room.id(), "outbound queue full; snapshot dropped");
                        }
                    }
                }
            }
        }
        if room.state() == RoomState::Finished {
            break;
        }
    }

    shared.set_state(RoomState::Finished);
    let _ = events.send(RoomEvent::Finished(room.id())).await;
}
