//! Novastrike Server Library
//!
//! An authoritative real-time simulation server for a 2-D arcade shooter.
//! Rooms run a deterministic fixed-tick ECS simulation; thin clients talk a
//! compact binary protocol over UDP and render the snapshots they receive.

pub mod config;
pub mod context;
pub mod ecs;
pub mod game;
pub mod metrics;
pub mod net;
pub mod room;
pub mod util;
