//! Deferred structural changes.
//!
//! Systems and scripts never mutate the registry's structure directly; they
//! queue spawn/kill/despawn requests here, and the room applies the buffer
//! at fixed points between system groups. A kill runs the target's
//! `on_death`; a despawn (lifespan expiry, off-bounds culling) is silent.

use tracing::warn;

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::archetype::ArchetypeLibrary;
use crate::game::components::{CompanionOrb, EntityKind, Projectile, Velocity};
use crate::game::script::ScriptHost;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub archetype: String,
    pub pos: Vec2,
    pub vel: Option<Vec2>,
    pub owner: Option<Entity>,
}

#[derive(Default)]
pub struct CommandBuffer {
    spawns: Vec<SpawnRequest>,
    kills: Vec<Entity>,
    despawns: Vec<Entity>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, archetype: &str, pos: Vec2) {
        self.spawns.push(SpawnRequest {
            archetype: archetype.to_string(),
            pos,
            vel: None,
            owner: None,
        });
    }

    pub fn spawn_moving(&mut self, archetype: &str, pos: Vec2, vel: Vec2) {
        self.spawns.push(SpawnRequest {
            archetype: archetype.to_string(),
            pos,
            vel: Some(vel),
            owner: None,
        });
    }

    pub fn spawn_owned(&mut self, archetype: &str, pos: Vec2, vel: Option<Vec2>, owner: Entity) {
        self.spawns.push(SpawnRequest {
            archetype: archetype.to_string(),
            pos,
            vel,
            owner: Some(owner),
        });
    }

    /// Queues destruction with the death callback.
    pub fn kill(&mut self, entity: Entity) {
        self.kills.push(entity);
    }

    /// Queues silent destruction (culling, expiry).
    pub fn despawn(&mut self, entity: Entity) {
        self.despawns.push(entity);
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.kills.is_empty() && self.despawns.is_empty()
    }
}

/// Death callbacks and spawn-time `init` may queue further commands
/// (a turret drops a pickup, a pickup never retaliates); a few rounds
/// settle any sane content.
const MAX_APPLY_ROUNDS: usize = 4;

/// Applies the buffer: instantiates queued spawns (attaching and
/// initializing scripts), fires death callbacks, destroys entities.
/// Returns the number of entities spawned.
pub fn apply(
    buffer: &mut CommandBuffer,
    registry: &mut Registry,
    scripts: &mut ScriptHost,
    library: &ArchetypeLibrary,
) -> usize {
    let mut spawned = 0;
    for _ in 0..MAX_APPLY_ROUNDS {
        if buffer.is_empty() {
            return spawned;
        }
        let spawns = std::mem::take(&mut buffer.spawns);
        let kills = std::mem::take(&mut buffer.kills);
        let despawns = std::mem::take(&mut buffer.despawns);

        for request in spawns {
            let Some(template) = library.get(&request.archetype) else {
                warn!(archetype = %request.archetype, "spawn request for unknown archetype");
                continue;
            };
            let entity = template.instantiate(registry, request.pos);
            if let Some(vel) = request.vel {
                if let Some(mut v) = registry.get_mut::<Velocity>(entity) {
                    v.0 = vel;
                }
            }
            if let Some(owner) = request.owner {
                let is_projectile = if let Some(mut proj) = registry.get_mut::<Projectile>(entity) {
                    proj.owner = Some(owner);
                    true
                } else {
                    false
                };
                if !is_projectile && template.kind == EntityKind::Orb {
                    registry.add_component(
                        entity,
                        CompanionOrb {
                            owner,
                            attached: true,
                        },
                    );
                }
            }
            if let Some(factory) = template.script {
                scripts.attach(entity, factory());
                scripts.init(entity, registry, buffer);
            }
            spawned += 1;
        }

        for entity in kills {
            if registry.is_alive(entity) {
                scripts.fire_death(entity, registry, buffer);
                registry.destroy_entity(entity);
            }
        }

        for entity in despawns {
            scripts.detach(entity);
            registry.destroy_entity(entity);
        }
    }
    if !buffer.is_empty() {
        warn!("command buffer still not settled; deferring remainder to next tick");
    }
    spawned
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::game::components::{KindTag, Position};
    use crate::game::script::{Script, ScriptApi};

    fn setup() -> (CommandBuffer, Registry, ScriptHost, ArchetypeLibrary) {
        (
            CommandBuffer::new(),
            Registry::new(),
            ScriptHost::new(),
            ArchetypeLibrary::standard(),
        )
    }

    #[test]
    fn test_spawn_applies_template_and_overrides() {
        let (mut buf, mut reg, mut scripts, lib) = setup();
        buf.spawn_moving("player_shot", Vec2::new(50.0, 60.0), Vec2::new(0.0, -100.0));

        assert_eq!(apply(&mut buf, &mut reg, &mut scripts, &lib), 1);
        assert_eq!(reg.alive_count(), 1);

        let mut found = 0;
        reg.for_each2::<Position, Velocity>(|_, pos, vel| {
            assert_eq!(pos.0, Vec2::new(50.0, 60.0));
            assert_eq!(vel.0, Vec2::new(0.0, -100.0));
            found += 1;
        });
        assert_eq!(found, 1);
    }

    #[test]
    fn test_spawn_unknown_archetype_dropped() {
        let (mut buf, mut reg, mut scripts, lib) = setup();
        buf.spawn("no_such_thing", Vec2::ZERO);
        assert_eq!(apply(&mut buf, &mut reg, &mut scripts, &lib), 0);
        assert_eq!(reg.alive_count(), 0);
    }

    #[test]
    fn test_spawn_owned_projectile() {
        let (mut buf, mut reg, mut scripts, lib) = setup();
        let owner = reg.create_entity();
        buf.spawn_owned("player_shot", Vec2::ZERO, None, owner);
        apply(&mut buf, &mut reg, &mut scripts, &lib);

        let mut owners = Vec::new();
        reg.for_each::<Projectile>(|_, p| owners.push(p.owner));
        assert_eq!(owners, vec![Some(owner)]);
    }

    #[test]
    fn test_spawn_owned_orb_binds_owner() {
        let (mut buf, mut reg, mut scripts, lib) = setup();
        let owner = reg.create_entity();
        buf.spawn_owned("orb", Vec2::ZERO, None, owner);
        apply(&mut buf, &mut reg, &mut scripts, &lib);

        let mut orbs = Vec::new();
        reg.for_each::<CompanionOrb>(|_, o| orbs.push((o.owner, o.attached)));
        assert_eq!(orbs, vec![(owner, true)]);
    }

    #[test]
    fn test_scripted_spawn_gets_init() {
        let (mut buf, mut reg, mut scripts, lib) = setup();
        buf.spawn("dart", Vec2::new(100.0, 100.0));
        apply(&mut buf, &mut reg, &mut scripts, &lib);

        assert_eq!(scripts.len(), 1);
        // DartScript::init points the dart leftward.
        let mut vx = 0.0;
        reg.for_each2::<Velocity, KindTag>(|_, v, _| vx = v.0.x);
        assert!(vx < 0.0);
    }

    #[test]
    fn test_kill_runs_death_which_may_spawn() {
        struct DropScript(Arc<AtomicU32>);
        impl Script for DropScript {
            fn on_death(&mut self, api: &mut ScriptApi<'_>) {
                self.0.fetch_add(1, Ordering::Relaxed);
                api.spawn("powerup_repair", Vec2::ZERO);
            }
        }

        let (mut buf, mut reg, mut scripts, lib) = setup();
        let e = reg.create_entity();
        reg.add_component(e, Position(Vec2::ZERO));
        let deaths = Arc::new(AtomicU32::new(0));
        scripts.attach(e, Box::new(DropScript(deaths.clone())));

        buf.kill(e);
        apply(&mut buf, &mut reg, &mut scripts, &lib);
        reg.reclaim_dead();

        assert_eq!(deaths.load(Ordering::Relaxed), 1);
        assert!(!reg.is_alive(e));
        // The drop spawned in the same application pass.
        assert_eq!(reg.alive_count(), 1);
    }

    #[test]
    fn test_despawn_is_silent() {
        struct NeverScript(Arc<AtomicU32>);
        impl Script for NeverScript {
            fn on_death(&mut self, _api: &mut ScriptApi<'_>) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let (mut buf, mut reg, mut scripts, lib) = setup();
        let e = reg.create_entity();
        let deaths = Arc::new(AtomicU32::new(0));
        scripts.attach(e, Box::new(NeverScript(deaths.clone())));

        buf.despawn(e);
        apply(&mut buf, &mut reg, &mut scripts, &lib);

        assert_eq!(deaths.load(Ordering::Relaxed), 0);
        assert!(!reg.is_alive(e));
        assert!(!scripts.contains(e));
    }

    #[test]
    fn test_kill_dead_entity_is_noop() {
        let (mut buf, mut reg, mut scripts, lib) = setup();
        let e = reg.create_entity();
        reg.destroy_entity(e);
        buf.kill(e);
        apply(&mut buf, &mut reg, &mut scripts, &lib);
        assert_eq!(reg.reclaim_dead(), 1);
    }
}
