//! Play area enforcement: ships and orbs are clamped inside the arena,
//! everything else is culled once it drifts past the margin. Culling is a
//! silent despawn, not a death.

use crate::ecs::registry::Registry;
use crate::game::components::{CompanionOrb, EntityKind, KindTag, PlayerControlled, Position};
use crate::game::constants::arena;
use crate::game::SimState;

pub fn update(registry: &Registry, sim: &mut SimState, _dt: f32) {
    registry.for_each2::<PlayerControlled, Position>(|_, _, pos| {
        pos.0.x = pos.0.x.clamp(0.0, arena::WIDTH);
        pos.0.y = pos.0.y.clamp(0.0, arena::HEIGHT);
    });
    registry.for_each2::<CompanionOrb, Position>(|_, _, pos| {
        pos.0.x = pos.0.x.clamp(0.0, arena::WIDTH);
        pos.0.y = pos.0.y.clamp(0.0, arena::HEIGHT);
    });

    let commands = &mut sim.commands;
    registry.for_each2::<Position, KindTag>(|entity, pos, tag| {
        if matches!(tag.0, EntityKind::Player | EntityKind::Orb) {
            return;
        }
        let m = arena::CULL_MARGIN;
        let p = pos.0;
        if p.x < -m || p.x > arena::WIDTH + m || p.y < -m || p.y > arena::HEIGHT + m {
            commands.despawn(entity);
        }
    });
}
