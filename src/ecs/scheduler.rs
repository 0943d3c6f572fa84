//! System scheduler: named groups of rate-gated systems.
//!
//! Systems are uniform function objects registered under an ordered group
//! name with a target rate. Gating is by simulation time (derived from the
//! tick counter), never wall clock, so two runs over the same inputs fire
//! the same systems on the same ticks. A panic inside a system is caught at
//! the invocation boundary and the loop continues.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::ecs::registry::Registry;
use crate::game::SimState;

/// Uniform system signature: component data via the registry, everything
/// else (inputs, commands, scripts, rng) via the sim state. The `f32` is
/// the simulation time elapsed since this system last ran.
pub type SystemFn = Box<dyn FnMut(&Registry, &mut SimState, f32) + Send>;

struct SystemEntry {
    name: &'static str,
    period: f64,
    always_run: bool,
    enabled: bool,
    last_run: Option<f64>,
    run: SystemFn,
}

struct Group {
    name: &'static str,
    systems: Vec<SystemEntry>,
}

#[derive(Default)]
pub struct Scheduler {
    groups: Vec<Group>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system under `group` at `rate_hz`. Registration order is
    /// execution order within the group. An `always_run` system ignores its
    /// rate and fires every group pass.
    pub fn add_system(
        &mut self,
        group: &'static str,
        name: &'static str,
        rate_hz: f64,
        always_run: bool,
        run: SystemFn,
    ) {
        let index = match self.groups.iter().position(|g| g.name == group) {
            Some(i) => i,
            None => {
                self.groups.push(Group {
                    name: group,
                    systems: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        self.groups[index].systems.push(SystemEntry {
            name,
            period: 1.0 / rate_hz,
            always_run,
            enabled: true,
            last_run: None,
            run,
        });
    }

    /// Enables or disables a system. Returns false if no such system.
    pub fn set_enabled(&mut self, group: &str, name: &str, enabled: bool) -> bool {
        for g in &mut self.groups {
            if g.name != group {
                continue;
            }
            if let Some(sys) = g.systems.iter_mut().find(|s| s.name == name) {
                sys.enabled = enabled;
                return true;
            }
        }
        false
    }

    /// Runs every due system in `group` at simulation time `now` (seconds).
    pub fn run_group(&mut self, group: &str, now: f64, registry: &Registry, sim: &mut SimState) {
        let Some(group) = self.groups.iter_mut().find(|g| g.name == group) else {
            return;
        };
        for sys in &mut group.systems {
            if !sys.enabled {
                continue;
            }
            // First invocation is treated as exactly one period overdue.
            let elapsed = match sys.last_run {
                Some(at) => now - at,
                None => sys.period,
            };
            if !sys.always_run && elapsed + 1e-9 < sys.period {
                continue;
            }
            sys.last_run = Some(now);
            let dt = elapsed as f32;
            let result = catch_unwind(AssertUnwindSafe(|| (sys.run)(registry, sim, dt)));
            if result.is_err() {
                error!(
                    system = sys.name,
                    group = group.name,
                    tick = sim.tick,
                    "system panicked; resuming next tick"
                );
            }
        }
    }

    pub fn system_count(&self) -> usize {
        self.groups.iter().map(|g| g.systems.len()).sum()
    }
}
