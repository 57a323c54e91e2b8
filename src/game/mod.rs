//! Game logic modules.
//!
//! Everything in here is deterministic: fixed-step updates, explicit
//! RNG, no system time. The frame driver in [`tick`] is the only entry
//! point that sees wall-clock time, and it immediately converts it into
//! fixed ticks.

pub mod assets;
pub mod config;
pub mod input;
pub mod level;
pub mod machine;
pub mod person;
pub mod script;
pub mod tick;
pub mod world;
