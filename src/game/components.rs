//! Component records. Plain data, one concern each, at most one instance
//! per entity per kind.

use crate::ecs::entity::Entity;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position(pub Vec2);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec2);

/// Renderable appearance. Entities without a sprite never appear in a
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub id: u16,
    pub frame: u8,
    pub frames: u8,
}

impl Sprite {
    pub fn fixed(id: u16) -> Self {
        Self {
            id,
            frame: 0,
            frames: 1,
        }
    }

    pub fn animated(id: u16, frames: u8) -> Self {
        Self {
            id,
            frame: 0,
            frames,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub hp: i32,
    pub max: i32,
    /// A raised shield absorbs the next hit.
    pub shield: bool,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self {
            hp: max,
            max,
            shield: false,
        }
    }
}

/// Axis-aligned collider, half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub half: Vec2,
}

impl Collider {
    pub fn square(half: f32) -> Self {
        Self {
            half: Vec2::new(half, half),
        }
    }
}

/// Marks the entity a player slot controls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerControlled {
    pub slot: u8,
    pub want_fire: bool,
    pub cooldown: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub damage: i32,
    pub owner: Option<Entity>,
    /// Hostile projectiles harm players; friendly ones harm enemies.
    pub hostile: bool,
}

/// Companion orb bound to a player ship. Attached, it shadows the owner;
/// detached, it flies free and soaks hostile shots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompanionOrb {
    pub owner: Entity,
    pub attached: bool,
}

/// Remaining lifetime in seconds; expiry despawns silently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifespan(pub f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    Shield,
    Repair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerUp {
    pub kind: PowerUpKind,
}

/// Coarse entity category, also the wire kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Enemy,
    Projectile,
    PowerUp,
    Orb,
}

impl EntityKind {
    pub fn code(self) -> u8 {
        match self {
            EntityKind::Player => 0,
            EntityKind::Enemy => 1,
            EntityKind::Projectile => 2,
            EntityKind::PowerUp => 3,
            EntityKind::Orb => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTag(pub EntityKind);
