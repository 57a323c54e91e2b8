//! Deterministic primitives shared by the game modules.

pub mod direction;
pub mod rng;

pub use direction::Direction;
pub use rng::GameRng;
