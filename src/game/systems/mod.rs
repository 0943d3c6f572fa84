pub mod animation;
pub mod bounds;
pub mod collision;
pub mod control;
pub mod lifespan;
pub mod movement;
pub mod orbs;
pub mod scripts;
pub mod spawner;
pub mod weapons;
