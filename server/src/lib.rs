//! Arena server library.
//!
//! Authoritative simulation for single-player arena runs: procedural
//! arenas, stance combat, enemy AI, gathering, and the session and network
//! layers that drive them.

pub mod combat;
pub mod config;
pub mod dungeon;
pub mod entities;
pub mod navigation;
pub mod network;
pub mod rng;
pub mod session;
pub mod world;
