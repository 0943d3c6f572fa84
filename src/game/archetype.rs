//! Archetype templates and the pre-parsed spawn schedule.
//!
//! The level/archetype collaborator hands the core an archetype-name →
//! template map and (name, time, position) spawn triples already parsed;
//! nothing here reads level files. `standard()` is the built-in template
//! set default rooms run with.

use std::collections::HashMap;

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::components::{
    Collider, EntityKind, Health, KindTag, Lifespan, PlayerControlled, Position, PowerUp,
    PowerUpKind, Projectile, Sprite, Velocity,
};
use crate::game::constants::{enemy, orb, player, powerup, shot, sprites};
use crate::game::script::{DartScript, Script, TurretScript};
use crate::util::vec2::Vec2;

/// Builds a fresh script instance for a scripted archetype.
pub type ScriptFactory = fn() -> Box<dyn Script>;

/// Component template for one archetype.
#[derive(Clone)]
pub struct Archetype {
    pub kind: EntityKind,
    pub sprite: Sprite,
    pub velocity: Vec2,
    pub health: Option<i32>,
    pub collider: Option<Vec2>,
    pub lifespan: Option<f32>,
    /// (damage, hostile) for projectile archetypes.
    pub projectile: Option<(i32, bool)>,
    pub powerup: Option<PowerUpKind>,
    pub script: Option<ScriptFactory>,
}

impl Archetype {
    /// Stamps the template onto a fresh entity at `pos`. Scripts are the
    /// caller's concern (the host attaches and initializes them).
    pub fn instantiate(&self, registry: &mut Registry, pos: Vec2) -> Entity {
        let entity = registry.create_entity();
        registry.add_component(entity, Position(pos));
        registry.add_component(entity, Velocity(self.velocity));
        registry.add_component(entity, self.sprite);
        registry.add_component(entity, KindTag(self.kind));
        if let Some(max) = self.health {
            registry.add_component(entity, Health::new(max));
        }
        if let Some(half) = self.collider {
            registry.add_component(entity, Collider { half });
        }
        if let Some(seconds) = self.lifespan {
            registry.add_component(entity, Lifespan(seconds));
        }
        if let Some((damage, hostile)) = self.projectile {
            registry.add_component(
                entity,
                Projectile {
                    damage,
                    owner: None,
                    hostile,
                },
            );
        }
        if let Some(kind) = self.powerup {
            registry.add_component(entity, PowerUp { kind });
        }
        if self.kind == EntityKind::Player {
            registry.add_component(entity, PlayerControlled::default());
        }
        entity
    }
}

/// Archetype-name → component-template map.
#[derive(Clone, Default)]
pub struct ArchetypeLibrary {
    templates: HashMap<String, Archetype>,
}

impl ArchetypeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, archetype: Archetype) {
        self.templates.insert(name.into(), archetype);
    }

    pub fn get(&self, name: &str) -> Option<&Archetype> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Built-in template set: the player ship, its ordnance and companion
    /// orb, the stock enemies, and the pickups they drop.
    pub fn standard() -> Self {
        let mut lib = Self::new();
        lib.insert(
            "player",
            Archetype {
                kind: EntityKind::Player,
                sprite: Sprite::animated(sprites::PLAYER, 2),
                velocity: Vec2::ZERO,
                health: Some(player::HEALTH),
                collider: Some(Vec2::new(player::HALF_EXTENT, player::HALF_EXTENT)),
                lifespan: None,
                projectile: None,
                powerup: None,
                script: None,
            },
        );
        lib.insert(
            "player_shot",
            Archetype {
                kind: EntityKind::Projectile,
                sprite: Sprite::fixed(sprites::PLAYER_SHOT),
                velocity: Vec2::new(shot::SPEED, 0.0),
                health: None,
                collider: Some(Vec2::new(6.0, 3.0)),
                lifespan: Some(shot::LIFESPAN),
                projectile: Some((shot::DAMAGE, false)),
                powerup: None,
                script: None,
            },
        );
        lib.insert(
            "enemy_shot",
            Archetype {
                kind: EntityKind::Projectile,
                sprite: Sprite::fixed(sprites::ENEMY_SHOT),
                velocity: Vec2::new(-shot::ENEMY_SPEED, 0.0),
                health: None,
                collider: Some(Vec2::new(4.0, 4.0)),
                lifespan: Some(shot::ENEMY_LIFESPAN),
                projectile: Some((shot::ENEMY_DAMAGE, true)),
                powerup: None,
                script: None,
            },
        );
        lib.insert(
            "dart",
            Archetype {
                kind: EntityKind::Enemy,
                sprite: Sprite::animated(sprites::ENEMY_DART, 4),
                velocity: Vec2::new(-enemy::DART_SPEED, 0.0),
                health: Some(20),
                collider: Some(Vec2::new(12.0, 12.0)),
                lifespan: None,
                projectile: None,
                powerup: None,
                script: Some(|| Box::new(DartScript::default())),
            },
        );
        lib.insert(
            "turret",
            Archetype {
                kind: EntityKind::Enemy,
                sprite: Sprite::animated(sprites::ENEMY_TURRET, 2),
                velocity: Vec2::new(-40.0, 0.0),
                health: Some(60),
                collider: Some(Vec2::new(16.0, 16.0)),
                lifespan: None,
                projectile: None,
                powerup: None,
                script: Some(|| Box::new(TurretScript::default())),
            },
        );
        lib.insert(
            "orb",
            Archetype {
                kind: EntityKind::Orb,
                sprite: Sprite::animated(sprites::ORB, 4),
                velocity: Vec2::ZERO,
                health: None,
                collider: Some(Vec2::new(orb::HALF_EXTENT, orb::HALF_EXTENT)),
                lifespan: None,
                projectile: None,
                powerup: None,
                script: None,
            },
        );
        lib.insert(
            "powerup_shield",
            Archetype {
                kind: EntityKind::PowerUp,
                sprite: Sprite::fixed(sprites::POWERUP_SHIELD),
                velocity: Vec2::new(-60.0, 0.0),
                health: None,
                collider: Some(Vec2::new(10.0, 10.0)),
                lifespan: Some(powerup::LIFESPAN),
                projectile: None,
                powerup: Some(PowerUpKind::Shield),
                script: None,
            },
        );
        lib.insert(
            "powerup_repair",
            Archetype {
                kind: EntityKind::PowerUp,
                sprite: Sprite::fixed(sprites::POWERUP_REPAIR),
                velocity: Vec2::new(-60.0, 0.0),
                health: None,
                collider: Some(Vec2::new(10.0, 10.0)),
                lifespan: Some(powerup::LIFESPAN),
                projectile: None,
                powerup: Some(PowerUpKind::Repair),
                script: None,
            },
        );
        lib
    }
}

/// One scheduled spawn: archetype by name, at a simulation time, at a
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnEntry {
    pub at: f32,
    pub archetype: String,
    pub pos: Vec2,
}

/// Pre-parsed level schedule, drained in time order as the clock advances.
#[derive(Debug, Clone, Default)]
pub struct SpawnSchedule {
    entries: Vec<SpawnEntry>,
    cursor: usize,
}

impl SpawnSchedule {
    pub fn new(mut entries: Vec<SpawnEntry>) -> Self {
        entries.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { entries, cursor: 0 }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Entries due at or before `clock` that have not been drained yet.
    pub fn drain_due(&mut self, clock: f32) -> &[SpawnEntry] {
        let start = self.cursor;
        while self.cursor < self.entries.len() && self.entries[self.cursor].at <= clock {
            self.cursor += 1;
        }
        &self.entries[start..self.cursor]
    }

    pub fn remaining(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Built-in demo wave used by default rooms.
    pub fn standard_wave() -> Self {
        let mut entries = Vec::new();
        let right = crate::game::constants::arena::WIDTH + 32.0;
        for i in 0..6 {
            entries.push(SpawnEntry {
                at: 2.0 + i as f32 * 1.5,
                archetype: "dart".to_string(),
                pos: Vec2::new(right, 160.0 + (i % 3) as f32 * 180.0),
            });
        }
        entries.push(SpawnEntry {
            at: 6.0,
            archetype: "turret".to_string(),
            pos: Vec2::new(right, 360.0),
        });
        entries.push(SpawnEntry {
            at: 12.0,
            archetype: "turret".to_string(),
            pos: Vec2::new(right, 520.0),
        });
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_complete() {
        let lib = ArchetypeLibrary::standard();
        for name in [
            "player",
            "player_shot",
            "enemy_shot",
            "dart",
            "turret",
            "orb",
            "powerup_shield",
            "powerup_repair",
        ] {
            assert!(lib.get(name).is_some(), "missing archetype {name}");
        }
    }

    #[test]
    fn test_instantiate_player() {
        let lib = ArchetypeLibrary::standard();
        let mut reg = Registry::new();
        let e = lib
            .get("player")
            .unwrap()
            .instantiate(&mut reg, Vec2::new(96.0, 300.0));

        assert_eq!(reg.get::<Position>(e).unwrap().0, Vec2::new(96.0, 300.0));
        assert_eq!(reg.get::<Health>(e).unwrap().hp, player::HEALTH);
        assert!(reg.get::<PlayerControlled>(e).is_some());
        assert_eq!(reg.get::<KindTag>(e).unwrap().0, EntityKind::Player);
    }

    #[test]
    fn test_instantiate_projectile() {
        let lib = ArchetypeLibrary::standard();
        let mut reg = Registry::new();
        let e = lib
            .get("enemy_shot")
            .unwrap()
            .instantiate(&mut reg, Vec2::ZERO);

        let proj = reg.get::<Projectile>(e).unwrap();
        assert!(proj.hostile);
        assert_eq!(proj.damage, shot::ENEMY_DAMAGE);
        drop(proj);
        assert!(reg.get::<Lifespan>(e).is_some());
        assert!(reg.get::<PlayerControlled>(e).is_none());
    }

    #[test]
    fn test_schedule_drains_in_time_order() {
        let mut schedule = SpawnSchedule::new(vec![
            SpawnEntry {
                at: 3.0,
                archetype: "dart".into(),
                pos: Vec2::ZERO,
            },
            SpawnEntry {
                at: 1.0,
                archetype: "turret".into(),
                pos: Vec2::ZERO,
            },
        ]);

        let due = schedule.drain_due(2.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].archetype, "turret");
        assert_eq!(schedule.remaining(), 1);

        assert!(schedule.drain_due(2.5).is_empty());
        assert_eq!(schedule.drain_due(3.0).len(), 1);
        assert_eq!(schedule.remaining(), 0);
    }

    #[test]
    fn test_schedule_never_redelivers() {
        let mut schedule = SpawnSchedule::new(vec![SpawnEntry {
            at: 0.0,
            archetype: "dart".into(),
            pos: Vec2::ZERO,
        }]);
        assert_eq!(schedule.drain_due(1.0).len(), 1);
        assert!(schedule.drain_due(2.0).is_empty());
    }
}
