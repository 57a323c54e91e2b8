//! Tunable Simulation Constants
//!
//! Every number the simulation consumes lives here, with defaults
//! matching the shipped game. Configs are plain serde structs so the
//! application can load overrides from JSON.

use serde::{Deserialize, Serialize};

/// Character movement and animation constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersonConfig {
    /// Maximum walking speed, units per second.
    pub move_speed: f32,
    /// Linear acceleration toward the target velocity, units/s^2.
    pub acceleration: f32,
    /// Distance traveled per walk-cycle frame advance, units.
    pub step_distance: f32,
    /// Seconds the last walking frame is held before idling.
    pub stand_time: f32,
    /// Distance below which an entity is pushed off terrain edges.
    pub push_threshold: f32,
    /// Reach of the interact probe in front of the player, units.
    pub interact_reach: f32,
    /// Radius around the probe point in which entities can be targeted.
    pub interact_radius: f32,
}

impl Default for PersonConfig {
    fn default() -> Self {
        Self {
            move_speed: 12.0,   // unit/s
            acceleration: 50.0, // unit/s^2
            step_distance: 1.0, // unit
            stand_time: 1.0,    // s
            push_threshold: 0.5,
            interact_reach: 1.5,
            interact_radius: 2.0,
        }
    }
}

/// Terrain query constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Half-width, in tiles, of the window scanned for obstacle edges.
    pub scan_radius: i32,
    /// Tile codes that read as open for the player and solid for
    /// everyone else.
    pub player_open_tiles: Vec<u8>,
}

impl TerrainConfig {
    /// Sentinel distance reported when no edge is found in the window.
    pub fn sentinel_distance(&self) -> f32 {
        self.scan_radius as f32 + 1.0
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            scan_radius: 3,
            player_open_tiles: vec![6],
        }
    }
}

/// Script machine constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Instructions executed per tick before the machine assumes an
    /// infinite loop and halts.
    pub instruction_budget: u32,
    /// Seconds a dialogue must stay on screen before a confirm press
    /// is accepted.
    pub min_dialogue_time: f32,
    /// Per-axis uniform jitter applied to SPAWN placement, units.
    /// Zero places spawns exactly at the scripted coordinates.
    pub spawn_jitter: f32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            instruction_budget: 1000,
            min_dialogue_time: 0.25,
            spawn_jitter: 0.0,
        }
    }
}

/// Frame driver constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed simulation step, seconds.
    pub tick_seconds: f64,
    /// Wall-clock gap beyond which elapsed time is dropped instead of
    /// simulated (debugger pauses, window drags).
    pub max_catch_up: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_seconds: crate::TICK_SECONDS,
            max_catch_up: 1.0,
        }
    }
}

/// All simulation constants, grouped.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Character constants.
    pub person: PersonConfig,
    /// Terrain query constants.
    pub terrain: TerrainConfig,
    /// Script machine constants.
    pub machine: MachineConfig,
    /// Frame driver constants.
    pub clock: ClockConfig,
}

impl GameConfig {
    /// Parse a configuration from JSON. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
