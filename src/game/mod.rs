pub mod archetype;
pub mod commands;
pub mod components;
pub mod constants;
pub mod input;
pub mod script;
pub mod snapshot;
pub mod systems;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ecs::scheduler::Scheduler;
use crate::game::archetype::{ArchetypeLibrary, SpawnSchedule};
use crate::game::commands::CommandBuffer;
use crate::game::input::InputTable;
use crate::game::script::ScriptHost;

/// Everything a system may touch besides component data: deferred
/// commands, script instances, player inputs, the level schedule, and the
/// room's seeded rng. Owned by the room, passed to every system invocation.
pub struct SimState {
    pub commands: CommandBuffer,
    pub scripts: ScriptHost,
    pub inputs: InputTable,
    pub archetypes: ArchetypeLibrary,
    pub schedule: SpawnSchedule,
    pub rng: StdRng,
    /// Simulation clock in seconds, derived from the tick counter.
    pub clock: f64,
    pub tick: u64,
}

impl SimState {
    pub fn new(archetypes: ArchetypeLibrary, schedule: SpawnSchedule, seed: u64) -> Self {
        Self {
            commands: CommandBuffer::new(),
            scripts: ScriptHost::new(),
            inputs: InputTable::new(),
            archetypes,
            schedule,
            rng: StdRng::seed_from_u64(seed),
            clock: 0.0,
            tick: 0,
        }
    }
}

/// Registers the stock system set: the logic group then the physics group,
/// in their fixed execution order.
pub fn standard_scheduler() -> Scheduler {
    let rate = constants::sim::TICK_RATE as f64;
    let mut scheduler = Scheduler::new();
    scheduler.add_system("logic", "control", rate, true, Box::new(systems::control::update));
    scheduler.add_system("logic", "weapons", rate, false, Box::new(systems::weapons::update));
    scheduler.add_system("logic", "scripts", rate, false, Box::new(systems::scripts::update));
    scheduler.add_system("logic", "spawner", rate, false, Box::new(systems::spawner::update));
    scheduler.add_system("logic", "lifespan", rate, false, Box::new(systems::lifespan::update));
    scheduler.add_system(
        "logic",
        "animation",
        constants::sim::ANIM_RATE,
        false,
        Box::new(systems::animation::update),
    );
    scheduler.add_system("physics", "movement", rate, true, Box::new(systems::movement::update));
    scheduler.add_system("physics", "orbs", rate, true, Box::new(systems::orbs::update));
    scheduler.add_system("physics", "collision", rate, true, Box::new(systems::collision::update));
    scheduler.add_system("physics", "bounds", rate, true, Box::new(systems::bounds::update));
    scheduler
}
