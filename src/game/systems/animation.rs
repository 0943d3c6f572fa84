//! Sprite frame advance. Runs in the logic group at its own sub-rate; the
//! scheduler decides when.

use crate::ecs::registry::Registry;
use crate::game::components::Sprite;
use crate::game::SimState;

pub fn update(registry: &Registry, _sim: &mut SimState, _dt: f32) {
    registry.for_each::<Sprite>(|_, sprite| {
        if sprite.frames > 1 {
            sprite.frame = (sprite.frame + 1) % sprite.frames;
        }
    });
}
