//! Scripted entity callbacks and the capability façade.
//!
//! The script engine sees exactly four entry points per entity — `init`,
//! `on_update`, `on_damage`, `on_death` — and touches the world only
//! through `ScriptApi`. Scripts cannot reach the registry, fabricate
//! components, or enumerate entities; every capability is mediated. Calls
//! are plain synchronous calls on the thread owning the room, and every
//! callback is panic-isolated so a faulty script cannot halt the tick loop.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::commands::CommandBuffer;
use crate::game::components::{Health, PlayerControlled, Position, Velocity};
use crate::game::constants::enemy;
use crate::util::vec2::Vec2;

/// What dealt the damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageKind {
    Shot,
    Contact,
}

/// The callback contract a scripted entity implements. All hooks default to
/// no-ops; `on_damage` returning true reflects the hit instead of taking it.
pub trait Script: Send {
    fn init(&mut self, _api: &mut ScriptApi<'_>) {}
    fn on_update(&mut self, _api: &mut ScriptApi<'_>, _dt: f32) {}
    fn on_damage(&mut self, _api: &mut ScriptApi<'_>, _amount: i32, _kind: DamageKind) -> bool {
        false
    }
    fn on_death(&mut self, _api: &mut ScriptApi<'_>) {}
}

/// Capability-limited world view handed to script callbacks.
pub struct ScriptApi<'a> {
    entity: Entity,
    registry: &'a Registry,
    commands: &'a mut CommandBuffer,
}

impl<'a> ScriptApi<'a> {
    pub fn new(entity: Entity, registry: &'a Registry, commands: &'a mut CommandBuffer) -> Self {
        Self {
            entity,
            registry,
            commands,
        }
    }

    pub fn position(&self) -> Option<Vec2> {
        self.registry.get::<Position>(self.entity).map(|p| p.0)
    }

    pub fn set_position(&mut self, pos: Vec2) {
        if let Some(mut p) = self.registry.get_mut::<Position>(self.entity) {
            p.0 = pos;
        }
    }

    pub fn velocity(&self) -> Option<Vec2> {
        self.registry.get::<Velocity>(self.entity).map(|v| v.0)
    }

    pub fn set_velocity(&mut self, vel: Vec2) {
        if let Some(mut v) = self.registry.get_mut::<Velocity>(self.entity) {
            v.0 = vel;
        }
    }

    pub fn health(&self) -> Option<i32> {
        self.registry.get::<Health>(self.entity).map(|h| h.hp)
    }

    pub fn shield(&self) -> bool {
        self.registry
            .get::<Health>(self.entity)
            .map(|h| h.shield)
            .unwrap_or(false)
    }

    pub fn set_shield(&mut self, raised: bool) {
        if let Some(mut h) = self.registry.get_mut::<Health>(self.entity) {
            h.shield = raised;
        }
    }

    /// Requests a spawn by archetype name; resolved at the next command
    /// application point.
    pub fn spawn(&mut self, archetype: &str, pos: Vec2) {
        self.commands.spawn(archetype, pos);
    }

    pub fn spawn_moving(&mut self, archetype: &str, pos: Vec2, vel: Vec2) {
        self.commands.spawn_moving(archetype, pos, vel);
    }

    /// Position of the nearest player ship, if any are alive.
    pub fn nearest_player(&self) -> Option<Vec2> {
        let own = self.position()?;
        let mut best: Option<(f32, Vec2)> = None;
        self.registry
            .for_each2::<PlayerControlled, Position>(|_, _, pos| {
                let d = own.distance_sq_to(pos.0);
                if best.map(|(bd, _)| d < bd).unwrap_or(true) {
                    best = Some((d, pos.0));
                }
            });
        best.map(|(_, pos)| pos)
    }
}

/// Owns the script instances of one room, keyed by entity in id order.
#[derive(Default)]
pub struct ScriptHost {
    scripts: BTreeMap<Entity, Box<dyn Script>>,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, entity: Entity, script: Box<dyn Script>) {
        self.scripts.insert(entity, script);
    }

    pub fn detach(&mut self, entity: Entity) -> Option<Box<dyn Script>> {
        self.scripts.remove(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.scripts.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn init(&mut self, entity: Entity, registry: &Registry, commands: &mut CommandBuffer) {
        if let Some(script) = self.scripts.get_mut(&entity) {
            let mut api = ScriptApi::new(entity, registry, commands);
            if catch_unwind(AssertUnwindSafe(|| script.init(&mut api))).is_err() {
                error!(%entity, "script init panicked");
            }
        }
    }

    /// Runs `on_update` for every live scripted entity, in entity id order.
    pub fn run_updates(&mut self, registry: &Registry, commands: &mut CommandBuffer, dt: f32) {
        for (&entity, script) in self.scripts.iter_mut() {
            if !registry.is_alive(entity) {
                continue;
            }
            let mut api = ScriptApi::new(entity, registry, commands);
            if catch_unwind(AssertUnwindSafe(|| script.on_update(&mut api, dt))).is_err() {
                error!(%entity, "script on_update panicked");
            }
        }
    }

    /// Asks the entity's script about a hit. `None` means unscripted;
    /// `Some(true)` means the hit is reflected.
    pub fn on_damage(
        &mut self,
        entity: Entity,
        registry: &Registry,
        commands: &mut CommandBuffer,
        amount: i32,
        kind: DamageKind,
    ) -> Option<bool> {
        let script = self.scripts.get_mut(&entity)?;
        let mut api = ScriptApi::new(entity, registry, commands);
        match catch_unwind(AssertUnwindSafe(|| script.on_damage(&mut api, amount, kind))) {
            Ok(reflect) => Some(reflect),
            Err(_) => {
                error!(%entity, "script on_damage panicked");
                Some(false)
            }
        }
    }

    /// Fires `on_death` exactly once: the script is detached before the
    /// callback, so a second kill of the same entity finds nothing.
    pub fn fire_death(&mut self, entity: Entity, registry: &Registry, commands: &mut CommandBuffer) {
        if let Some(mut script) = self.scripts.remove(&entity) {
            let mut api = ScriptApi::new(entity, registry, commands);
            if catch_unwind(AssertUnwindSafe(|| script.on_death(&mut api))).is_err() {
                error!(%entity, "script on_death panicked");
            }
        }
    }
}

/// Weaving kamikaze enemy: cruises left, sine-weaves vertically.
#[derive(Default)]
pub struct DartScript {
    phase: f32,
}

impl Script for DartScript {
    fn init(&mut self, api: &mut ScriptApi<'_>) {
        api.set_velocity(Vec2::new(-enemy::DART_SPEED, 0.0));
    }

    fn on_update(&mut self, api: &mut ScriptApi<'_>, dt: f32) {
        self.phase += dt;
        let vy = (self.phase * enemy::DART_WEAVE_RATE).sin() * enemy::DART_WEAVE;
        api.set_velocity(Vec2::new(-enemy::DART_SPEED, vy));
    }
}

/// Stationary-ish gun platform: volleys at the nearest player, raises its
/// shield for a window after each shot, drops a shield pickup on death.
pub struct TurretScript {
    cooldown: f32,
}

impl Default for TurretScript {
    fn default() -> Self {
        Self { cooldown: 1.0 }
    }
}

impl Script for TurretScript {
    fn on_update(&mut self, api: &mut ScriptApi<'_>, dt: f32) {
        self.cooldown -= dt;
        if self.cooldown <= enemy::TURRET_COOLDOWN - enemy::TURRET_SHIELD_WINDOW && api.shield() {
            api.set_shield(false);
        }
        if self.cooldown > 0.0 {
            return;
        }
        let (Some(pos), Some(target)) = (api.position(), api.nearest_player()) else {
            return;
        };
        let dir = (target - pos).normalize();
        api.spawn_moving(
            "enemy_shot",
            pos + dir * 24.0,
            dir * crate::game::constants::shot::ENEMY_SPEED,
        );
        api.set_shield(true);
        self.cooldown = enemy::TURRET_COOLDOWN;
    }

    fn on_death(&mut self, api: &mut ScriptApi<'_>) {
        if let Some(pos) = api.position() {
            api.spawn("powerup_shield", pos);
        }
    }
}
