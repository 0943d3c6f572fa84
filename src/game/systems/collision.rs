//! Collision detection and resolution.
//!
//! AABB overlap over the collider set, resolved by category: friendly
//! shots damage enemies, hostile shots damage players (companion orbs soak
//! them first), ramming enemies hurt players and die doing it, and players
//! collect power-ups on contact. All damage funnels through
//! [`apply_damage`], which honors shields and script reflection.

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::commands::CommandBuffer;
use crate::game::components::{
    Collider, EntityKind, Health, KindTag, Position, PowerUp, PowerUpKind, Projectile, Velocity,
};
use crate::game::constants::{player, powerup};
use crate::game::script::{DamageKind, ScriptHost};
use crate::game::SimState;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy)]
struct Body {
    entity: Entity,
    pos: Vec2,
    half: Vec2,
    kind: EntityKind,
}

fn overlap(a: &Body, b: &Body) -> bool {
    let d = (a.pos - b.pos).abs();
    d.x <= a.half.x + b.half.x && d.y <= a.half.y + b.half.y
}

/// What a hit did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Target has no health facet; nothing to damage.
    Ignored,
    /// A raised shield soaked the hit and dropped.
    ShieldAbsorbed,
    /// The target's script reflected the hit.
    Reflected,
    Damaged,
    Killed,
}

/// Applies `amount` damage to `target`. Shield first, then the script's
/// `on_damage` verdict, then hit points; a kill is queued, not immediate.
pub fn apply_damage(
    registry: &Registry,
    scripts: &mut ScriptHost,
    commands: &mut CommandBuffer,
    target: Entity,
    amount: i32,
    kind: DamageKind,
) -> HitOutcome {
    let Some(shielded) = registry.get::<Health>(target).map(|h| h.shield) else {
        return HitOutcome::Ignored;
    };
    if shielded {
        if let Some(mut health) = registry.get_mut::<Health>(target) {
            health.shield = false;
        }
        return HitOutcome::ShieldAbsorbed;
    }
    if scripts.on_damage(target, registry, commands, amount, kind) == Some(true) {
        return HitOutcome::Reflected;
    }
    let mut killed = false;
    if let Some(mut health) = registry.get_mut::<Health>(target) {
        health.hp -= amount;
        killed = health.hp <= 0;
    }
    if killed {
        commands.kill(target);
        HitOutcome::Killed
    } else {
        HitOutcome::Damaged
    }
}

pub fn update(registry: &Registry, sim: &mut SimState, _dt: f32) {
    let mut bodies: Vec<Body> = Vec::new();
    registry.for_each3::<Position, Collider, KindTag>(|entity, pos, collider, tag| {
        bodies.push(Body {
            entity,
            pos: pos.0,
            half: collider.half,
            kind: tag.0,
        });
    });

    let players: Vec<Body> = bodies
        .iter()
        .filter(|b| b.kind == EntityKind::Player)
        .copied()
        .collect();
    let enemies: Vec<Body> = bodies
        .iter()
        .filter(|b| b.kind == EntityKind::Enemy)
        .copied()
        .collect();
    let orbs: Vec<Body> = bodies
        .iter()
        .filter(|b| b.kind == EntityKind::Orb)
        .copied()
        .collect();
    let powerups: Vec<Body> = bodies
        .iter()
        .filter(|b| b.kind == EntityKind::PowerUp)
        .copied()
        .collect();
    let shots: Vec<(Body, Projectile)> = bodies
        .iter()
        .filter(|b| b.kind == EntityKind::Projectile)
        .filter_map(|b| registry.get::<Projectile>(b.entity).map(|p| (*b, *p)))
        .collect();

    let SimState {
        scripts, commands, ..
    } = sim;

    // Friendly fire into the enemy ranks.
    for (shot, proj) in shots.iter().filter(|(_, p)| !p.hostile) {
        for enemy in &enemies {
            if !overlap(shot, enemy) {
                continue;
            }
            match apply_damage(
                registry,
                scripts,
                commands,
                enemy.entity,
                proj.damage,
                DamageKind::Shot,
            ) {
                HitOutcome::Reflected => {
                    if let Some(mut vel) = registry.get_mut::<Velocity>(shot.entity) {
                        vel.0 = -vel.0;
                    }
                }
                _ => commands.despawn(shot.entity),
            }
            break;
        }
    }

    // Hostile shots: orbs soak them before they reach a ship.
    'hostile: for (shot, proj) in shots.iter().filter(|(_, p)| p.hostile) {
        for orb in &orbs {
            if overlap(shot, orb) {
                commands.despawn(shot.entity);
                continue 'hostile;
            }
        }
        for ship in &players {
            if overlap(shot, ship) {
                apply_damage(
                    registry,
                    scripts,
                    commands,
                    ship.entity,
                    proj.damage,
                    DamageKind::Shot,
                );
                commands.despawn(shot.entity);
                continue 'hostile;
            }
        }
    }

    // Ramming enemies trade themselves for contact damage.
    for enemy in &enemies {
        for ship in &players {
            if overlap(enemy, ship) {
                apply_damage(
                    registry,
                    scripts,
                    commands,
                    ship.entity,
                    player::CONTACT_DAMAGE,
                    DamageKind::Contact,
                );
                commands.kill(enemy.entity);
                break;
            }
        }
    }

    // Pickups.
    for ship in &players {
        for pickup in &powerups {
            if !overlap(ship, pickup) {
                continue;
            }
            let kind = registry.get::<PowerUp>(pickup.entity).map(|p| p.kind);
            if let Some(kind) = kind {
                if let Some(mut health) = registry.get_mut::<Health>(ship.entity) {
                    match kind {
                        PowerUpKind::Shield => health.shield = true,
                        PowerUpKind::Repair => {
                            health.hp = (health.hp + powerup::REPAIR_AMOUNT).min(health.max)
                        }
                    }
                }
            }
            commands.despawn(pickup.entity);
        }
    }
}
