//! Movement integration: position += velocity * dt.

use crate::ecs::registry::Registry;
use crate::game::components::{Position, Velocity};
use crate::game::SimState;

pub fn update(registry: &Registry, _sim: &mut SimState, dt: f32) {
    registry.for_each2::<Position, Velocity>(|_, pos, vel| {
        pos.0 += vel.0 * dt;
    });
}
