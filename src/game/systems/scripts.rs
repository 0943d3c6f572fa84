//! Script update dispatch: one synchronous `on_update` per scripted entity
//! per pass, in entity id order.

use crate::ecs::registry::Registry;
use crate::game::SimState;

pub fn update(registry: &Registry, sim: &mut SimState, dt: f32) {
    let SimState {
        scripts, commands, ..
    } = sim;
    scripts.run_updates(registry, commands, dt);
}
