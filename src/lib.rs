//! # Emberwood Simulation Core
//!
//! Deterministic fixed-step simulation for Emberwood, a tile-based
//! action/adventure game. The renderer, asset decoding and platform
//! input live outside this crate; everything that decides what the
//! world *does* lives here.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     EMBERWOOD CORE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── rng.rs       - Xorshift128+ PRNG, explicitly passed     │
//! │  └── direction.rs - Cardinal facing directions               │
//! │                                                              │
//! │  game/            - Game logic (deterministic)               │
//! │  ├── input.rs     - Button history and frame aggregation     │
//! │  ├── world.rs     - Heightmap and edge-distance queries      │
//! │  ├── person.rs    - Character physics and animation          │
//! │  ├── script.rs    - Bytecode program and reader              │
//! │  ├── machine.rs   - Script virtual machine                   │
//! │  ├── level.rs     - Spawn tables                             │
//! │  ├── assets.rs    - Decoded asset data and provider trait    │
//! │  ├── config.rs    - Tunable constants                        │
//! │  └── tick.rs      - Fixed-step frame driver                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The simulation advances in fixed ticks. Given the same assets, the
//! same seed, and the same timestamped input events, the sequence of
//! ticks is identical on every platform:
//!
//! - One control thread; the renderer only reads a frozen snapshot
//!   (previous/current position pairs plus `frame_fraction`) between
//!   updates.
//! - All randomness comes from a seeded [`GameRng`] owned by the
//!   [`Game`] and passed explicitly to whoever needs it.
//! - Newly spawned persons are staged in a pending queue and merged
//!   into the roster only at tick boundaries.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use crate::core::direction::Direction;
pub use crate::core::rng::GameRng;
pub use crate::game::config::GameConfig;
pub use crate::game::input::{Button, FrameInput, InputHistory};
pub use crate::game::machine::Machine;
pub use crate::game::person::Person;
pub use crate::game::tick::Game;
pub use crate::game::world::World;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 30;

/// Duration of one simulation tick in seconds
pub const TICK_SECONDS: f64 = 1.0 / TICK_RATE as f64;
