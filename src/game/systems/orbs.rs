//! Companion orb behavior: an attached orb shadows its owner; a detached
//! orb flies free under its own velocity. An orb whose owner is gone is
//! removed.

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::components::{CompanionOrb, Position, Velocity};
use crate::game::constants::orb;
use crate::game::SimState;
use crate::util::vec2::Vec2;

pub fn update(registry: &Registry, sim: &mut SimState, _dt: f32) {
    let mut links: Vec<(Entity, Entity, bool)> = Vec::new();
    registry.for_each::<CompanionOrb>(|entity, state| {
        links.push((entity, state.owner, state.attached));
    });

    let commands = &mut sim.commands;
    for (orb_entity, owner, attached) in links {
        let owner_pos = registry.get::<Position>(owner).map(|p| p.0);
        match owner_pos {
            Some(anchor) if attached => {
                if let Some(mut pos) = registry.get_mut::<Position>(orb_entity) {
                    pos.0 = anchor + Vec2::new(0.0, -orb::FOLLOW_OFFSET);
                }
                if let Some(mut vel) = registry.get_mut::<Velocity>(orb_entity) {
                    vel.0 = Vec2::ZERO;
                }
            }
            Some(_) => {}
            None => commands.despawn(orb_entity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
    use crate::game::commands;

    fn setup() -> (Registry, SimState, Entity, Entity) {
        let mut reg = Registry::new();
        let sim = SimState::new(ArchetypeLibrary::standard(), SpawnSchedule::empty(), 1);
        let owner = reg.create_entity();
        reg.add_component(owner, Position(Vec2::new(200.0, 400.0)));

        let orb_e = reg.create_entity();
        reg.add_component(orb_e, Position(Vec2::ZERO));
        reg.add_component(orb_e, Velocity(Vec2::new(50.0, 0.0)));
        reg.add_component(
            orb_e,
            CompanionOrb {
                owner,
                attached: true,
            },
        );
        (reg, sim, owner, orb_e)
    }

    #[test]
    fn test_attached_orb_shadows_owner() {
        let (reg, mut sim, _, orb_e) = setup();
        update(&reg, &mut sim, 1.0 / 60.0);

        assert_eq!(
            reg.get::<Position>(orb_e).unwrap().0,
            Vec2::new(200.0, 400.0 - orb::FOLLOW_OFFSET)
        );
        assert_eq!(reg.get::<Velocity>(orb_e).unwrap().0, Vec2::ZERO);
    }

    #[test]
    fn test_detached_orb_keeps_its_velocity() {
        let (reg, mut sim, _, orb_e) = setup();
        reg.get_mut::<CompanionOrb>(orb_e).unwrap().attached = false;
        reg.get_mut::<Position>(orb_e).unwrap().0 = Vec2::new(300.0, 100.0);

        update(&reg, &mut sim, 1.0 / 60.0);

        assert_eq!(reg.get::<Position>(orb_e).unwrap().0, Vec2::new(300.0, 100.0));
        assert_eq!(reg.get::<Velocity>(orb_e).unwrap().0, Vec2::new(50.0, 0.0));
    }

    #[test]
    fn test_orphaned_orb_removed() {
        let (mut reg, mut sim, owner, orb_e) = setup();
        reg.destroy_entity(owner);

        update(&reg, &mut sim, 1.0 / 60.0);
        let SimState {
            commands: buf,
            scripts,
            archetypes,
            ..
        } = &mut sim;
        commands::apply(buf, &mut reg, scripts, archetypes);

        assert!(!reg.is_alive(orb_e));
    }
}
