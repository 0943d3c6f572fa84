//! Player weapon fire: cooldown-gated shot spawning.

use crate::ecs::registry::Registry;
use crate::game::components::{PlayerControlled, Position};
use crate::game::constants::player;
use crate::game::SimState;
use crate::util::vec2::Vec2;

pub fn update(registry: &Registry, sim: &mut SimState, dt: f32) {
    let commands = &mut sim.commands;
    registry.for_each2::<PlayerControlled, Position>(|entity, pc, pos| {
        pc.cooldown = (pc.cooldown - dt).max(0.0);
        if pc.want_fire && pc.cooldown == 0.0 {
            commands.spawn_owned(
                "player_shot",
                pos.0 + Vec2::new(player::MUZZLE_X, 0.0),
                None,
                entity,
            );
            pc.cooldown = player::FIRE_COOLDOWN;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Entity;
    use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
    use crate::game::commands;
    use crate::game::components::Projectile;

    const DT: f32 = 1.0 / 60.0;

    fn setup(firing: bool) -> (Registry, SimState, Entity) {
        let mut reg = Registry::new();
        let sim = SimState::new(ArchetypeLibrary::standard(), SpawnSchedule::empty(), 1);
        let ship = reg.create_entity();
        reg.add_component(ship, Position(Vec2::new(100.0, 300.0)));
        reg.add_component(
            ship,
            PlayerControlled {
                slot: 0,
                want_fire: firing,
                cooldown: 0.0,
            },
        );
        (reg, sim, ship)
    }

    fn settle(reg: &mut Registry, sim: &mut SimState) {
        let SimState {
            commands: buf,
            scripts,
            archetypes,
            ..
        } = sim;
        commands::apply(buf, reg, scripts, archetypes);
    }

    #[test]
    fn test_fires_when_armed_and_cooled() {
        let (mut reg, mut sim, ship) = setup(true);
        update(&reg, &mut sim, DT);
        settle(&mut reg, &mut sim);

        let mut shots = Vec::new();
        reg.for_each2::<Projectile, Position>(|_, p, pos| shots.push((p.owner, pos.0)));
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].0, Some(ship));
        assert_eq!(shots[0].1, Vec2::new(100.0 + player::MUZZLE_X, 300.0));
    }

    #[test]
    fn test_cooldown_gates_fire_rate() {
        let (mut reg, mut sim, _) = setup(true);
        // Hold fire for a quarter second of ticks.
        for _ in 0..15 {
            update(&reg, &mut sim, DT);
        }
        settle(&mut reg, &mut sim);

        let mut count = 0;
        reg.for_each::<Projectile>(|_, _| count += 1);
        // 15 ticks at a 0.15 s cooldown: shots at t=0 and t=0.15.
        assert_eq!(count, 2);
    }

    #[test]
    fn test_no_fire_when_disarmed() {
        let (mut reg, mut sim, _) = setup(false);
        for _ in 0..10 {
            update(&reg, &mut sim, DT);
        }
        settle(&mut reg, &mut sim);

        let mut count = 0;
        reg.for_each::<Projectile>(|_, _| count += 1);
        assert_eq!(count, 0);
    }
}
