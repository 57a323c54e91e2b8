//! Decoded Asset Data
//!
//! The chunked binary formats are decoded outside this crate; an
//! [`AssetProvider`] hands the core owned, already-decoded tables.
//! Validation happens when the tables are converted into live types
//! (`World::from_data`, `Script::from_data`, `Level::from_data`), so a
//! malformed asset is a recoverable [`AssetError`], never a panic.

use thiserror::Error;
use tracing::warn;

use crate::game::person::PART_COUNT;

/// Why an asset could not be loaded or validated.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The provider has no asset with the requested name.
    #[error("asset not found: {0}")]
    NotFound(String),
    /// The world tables failed validation.
    #[error("world data invalid: {0}")]
    World(&'static str),
    /// The script tables failed validation.
    #[error("script data invalid: {0}")]
    Script(&'static str),
    /// The level tables failed validation.
    #[error("level data invalid: {0}")]
    Level(&'static str),
}

/// Decoded terrain tables for one world.
#[derive(Clone, Debug)]
pub struct WorldData {
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Terrain height mapped to heightmap byte 0.
    pub height_min: f32,
    /// Terrain height mapped to heightmap byte 255.
    pub height_max: f32,
    /// Scale applied to mesh vertices by the renderer.
    pub vertex_scale: [f32; 3],
    /// Row-major heightmap samples, one byte per tile corner.
    pub heightmap: Vec<u8>,
    /// Row-major tile classification codes.
    pub tiles: Vec<u8>,
}

/// Decoded script tables: labels, text blob, instruction words.
#[derive(Clone, Debug)]
pub struct ScriptData {
    /// Label name to program-counter table.
    pub labels: Vec<(String, u16)>,
    /// Text blob; strings are NUL-terminated, operands index into it.
    pub text: Vec<u8>,
    /// Packed 16-bit instruction words.
    pub program: Vec<u16>,
    /// Number of script-visible variables.
    pub var_count: usize,
}

/// One spawn point decoded from a level.
#[derive(Clone, Copy, Debug)]
pub struct SpawnPointData {
    /// Tile X coordinate in level space.
    pub x: i16,
    /// Tile Y coordinate in level space.
    pub y: i16,
    /// Index into the level's spawn-type table.
    pub kind: u16,
}

/// Decoded spawn tables for one level.
#[derive(Clone, Debug)]
pub struct LevelData {
    /// Sprite-group names referenced by the spawn types.
    pub sprites: Vec<String>,
    /// Part-sprite layouts; entries index `sprites`, -1 leaves the
    /// part empty.
    pub spawn_types: Vec<[i16; PART_COUNT]>,
    /// Spawn placements.
    pub spawn_points: Vec<SpawnPointData>,
}

/// Source of decoded assets, keyed by logical name.
pub trait AssetProvider {
    /// Terrain tables.
    fn world(&self) -> Result<WorldData, AssetError>;
    /// Script tables.
    fn script(&self) -> Result<ScriptData, AssetError>;
    /// Sprite-group names, in index order.
    fn sprite_groups(&self) -> Result<Vec<String>, AssetError>;
    /// Spawn tables for the named level.
    fn level(&self, name: &str) -> Result<LevelData, AssetError>;
}

/// Sprite-group name lookup.
///
/// The renderer owns the actual sprite sheets; the simulation only
/// needs to turn names from scripts and levels into group indices.
#[derive(Clone, Debug, Default)]
pub struct SpriteCatalog {
    names: Vec<String>,
}

impl SpriteCatalog {
    /// Build a catalog from group names in index order.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Look up a sprite group by name. Missing names are logged.
    pub fn get_index(&self, name: &str) -> Option<usize> {
        let found = self.names.iter().position(|n| n == name);
        if found.is_none() {
            warn!("missing sprite: {}", name);
        }
        found
    }

    /// Number of sprite groups.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the catalog has no groups.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = SpriteCatalog::new(vec![
            "hero_body".to_string(),
            "hero_head".to_string(),
        ]);
        assert_eq!(catalog.get_index("hero_head"), Some(1));
        assert_eq!(catalog.get_index("no_such_group"), None);
    }
}
