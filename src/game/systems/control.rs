//! Player control: maps each slot's held keys onto its ship.
//!
//! Keys are sticky — the bitmask drained at tick start stays in force until
//! a later frame overrides it, so an absent input never zeroes velocity.

use crate::ecs::entity::Entity;
use crate::ecs::registry::Registry;
use crate::game::components::{CompanionOrb, PlayerControlled, Velocity};
use crate::game::constants::{orb, player};
use crate::game::input::InputKeys;
use crate::game::SimState;
use crate::util::vec2::Vec2;

pub fn update(registry: &Registry, sim: &mut SimState, _dt: f32) {
    let inputs = &sim.inputs;
    let mut toggled_owners: Vec<Entity> = Vec::new();

    registry.for_each2::<PlayerControlled, Velocity>(|entity, pc, vel| {
        let slot = inputs.slot(pc.slot);
        vel.0 = slot.direction() * player::SPEED;
        pc.want_fire = slot.keys().contains(InputKeys::FIRE);
        if slot.force_edge() {
            toggled_owners.push(entity);
        }
    });

    if toggled_owners.is_empty() {
        return;
    }
    registry.for_each2::<CompanionOrb, Velocity>(|_, orb_state, vel| {
        if toggled_owners.contains(&orb_state.owner) {
            orb_state.attached = !orb_state.attached;
            vel.0 = if orb_state.attached {
                Vec2::ZERO
            } else {
                Vec2::new(orb::DETACH_SPEED, 0.0)
            };
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
    use crate::game::components::Position;
    use crate::game::input::InputFrame;

    fn setup() -> (Registry, SimState, Entity) {
        let mut reg = Registry::new();
        let mut sim = SimState::new(ArchetypeLibrary::standard(), SpawnSchedule::empty(), 1);
        let ship = reg.create_entity();
        reg.add_component(ship, Position(Vec2::new(100.0, 300.0)));
        reg.add_component(ship, Velocity(Vec2::ZERO));
        reg.add_component(ship, PlayerControlled::default());
        (reg, sim, ship)
    }

    fn press(sim: &mut SimState, keys: InputKeys, seq: u32) {
        sim.inputs.push(InputFrame { slot: 0, keys, seq });
        sim.inputs.begin_tick();
    }

    #[test]
    fn test_up_key_sets_negative_y_velocity() {
        let (reg, mut sim, ship) = setup();
        press(&mut sim, InputKeys::UP, 1);

        update(&reg, &mut sim, 1.0 / 60.0);

        assert_eq!(
            reg.get::<Velocity>(ship).unwrap().0,
            Vec2::new(0.0, -player::SPEED)
        );
    }

    #[test]
    fn test_diagonal_keys() {
        let (reg, mut sim, ship) = setup();
        press(&mut sim, InputKeys::DOWN | InputKeys::RIGHT, 1);

        update(&reg, &mut sim, 1.0 / 60.0);

        assert_eq!(
            reg.get::<Velocity>(ship).unwrap().0,
            Vec2::new(player::SPEED, player::SPEED)
        );
    }

    #[test]
    fn test_keys_sticky_across_ticks() {
        let (reg, mut sim, ship) = setup();
        press(&mut sim, InputKeys::LEFT, 1);
        update(&reg, &mut sim, 1.0 / 60.0);

        // No new frame: held keys keep driving the ship.
        sim.inputs.begin_tick();
        update(&reg, &mut sim, 1.0 / 60.0);
        assert_eq!(
            reg.get::<Velocity>(ship).unwrap().0,
            Vec2::new(-player::SPEED, 0.0)
        );
    }

    #[test]
    fn test_fire_key_arms_shooter() {
        let (reg, mut sim, ship) = setup();
        press(&mut sim, InputKeys::FIRE, 1);
        update(&reg, &mut sim, 1.0 / 60.0);
        assert!(reg.get::<PlayerControlled>(ship).unwrap().want_fire);

        press(&mut sim, InputKeys::empty(), 2);
        update(&reg, &mut sim, 1.0 / 60.0);
        assert!(!reg.get::<PlayerControlled>(ship).unwrap().want_fire);
    }

    #[test]
    fn test_force_edge_toggles_orb() {
        let (mut reg, mut sim, ship) = setup();
        let orb_e = reg.create_entity();
        reg.add_component(orb_e, Velocity(Vec2::ZERO));
        reg.add_component(
            orb_e,
            CompanionOrb {
                owner: ship,
                attached: true,
            },
        );

        press(&mut sim, InputKeys::FORCE_TOGGLE, 1);
        update(&reg, &mut sim, 1.0 / 60.0);
        assert!(!reg.get::<CompanionOrb>(orb_e).unwrap().attached);
        assert_eq!(
            reg.get::<Velocity>(orb_e).unwrap().0,
            Vec2::new(orb::DETACH_SPEED, 0.0)
        );

        // Held bit: no second toggle.
        sim.inputs.begin_tick();
        update(&reg, &mut sim, 1.0 / 60.0);
        assert!(!reg.get::<CompanionOrb>(orb_e).unwrap().attached);

        // Release then press again: reattach.
        press(&mut sim, InputKeys::empty(), 2);
        update(&reg, &mut sim, 1.0 / 60.0);
        press(&mut sim, InputKeys::FORCE_TOGGLE, 3);
        update(&reg, &mut sim, 1.0 / 60.0);
        assert!(reg.get::<CompanionOrb>(orb_e).unwrap().attached);
    }
}
