//! Lifespan expiry: timed entities despawn silently when they run out.

use crate::ecs::registry::Registry;
use crate::game::components::Lifespan;
use crate::game::SimState;

pub fn update(registry: &Registry, sim: &mut SimState, dt: f32) {
    let commands = &mut sim.commands;
    registry.for_each::<Lifespan>(|entity, lifespan| {
        lifespan.0 -= dt;
        if lifespan.0 <= 0.0 {
            commands.despawn(entity);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
    use crate::game::commands;

    #[test]
    fn test_expired_entity_despawns() {
        let mut reg = Registry::new();
        let mut sim = SimState::new(ArchetypeLibrary::standard(), SpawnSchedule::empty(), 1);
        let e = reg.create_entity();
        reg.add_component(e, Lifespan(0.05));

        for _ in 0..2 {
            update(&reg, &mut sim, 1.0 / 60.0);
        }
        assert!(reg.is_alive(e), "should survive below its lifespan");

        update(&reg, &mut sim, 1.0 / 60.0);
        let SimState {
            commands: buf,
            scripts,
            archetypes,
            ..
        } = &mut sim;
        commands::apply(buf, &mut reg, scripts, archetypes);
        assert!(!reg.is_alive(e));
    }
}
