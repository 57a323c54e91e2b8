//! Level Spawn Tables
//!
//! A level is a list of spawn points: who stands where when the level
//! starts. Spawn types carry one sprite-group per appearance slot;
//! points place a type at a tile, offset to the tile center.

use glam::Vec2;

use crate::game::assets::{AssetError, LevelData, SpriteCatalog};
use crate::game::person::PART_COUNT;

/// A spawn point in a level.
#[derive(Clone, Copy, Debug)]
pub struct SpawnPoint {
    /// Position in level space (tile center).
    pub pos: Vec2,
    /// Sprite-group index per part slot, -1 empty.
    pub sprites: [i32; PART_COUNT],
}

/// A game level.
#[derive(Clone, Debug)]
pub struct Level {
    spawn: Vec<SpawnPoint>,
}

impl Level {
    /// Resolve decoded spawn tables against the sprite catalog.
    ///
    /// Sprite names missing from the catalog resolve to empty slots
    /// (with a logged warning from the catalog); structural problems
    /// in the tables are load errors.
    pub fn from_data(data: LevelData, catalog: &SpriteCatalog) -> Result<Level, AssetError> {
        let sprite_indices: Vec<i32> = data
            .sprites
            .iter()
            .map(|name| catalog.get_index(name).map_or(-1, |i| i as i32))
            .collect();

        let mut types = Vec::with_capacity(data.spawn_types.len());
        for entry in &data.spawn_types {
            let mut sprites = [-1i32; PART_COUNT];
            for (slot, &index) in entry.iter().enumerate() {
                if index == -1 {
                    continue;
                }
                if index < 0 || index as usize >= sprite_indices.len() {
                    return Err(AssetError::Level("sprite index out of range"));
                }
                sprites[slot] = sprite_indices[index as usize];
            }
            types.push(sprites);
        }

        let mut spawn = Vec::with_capacity(data.spawn_points.len());
        for point in &data.spawn_points {
            let Some(sprites) = types.get(point.kind as usize) else {
                return Err(AssetError::Level("spawn type out of range"));
            };
            spawn.push(SpawnPoint {
                pos: Vec2::new(point.x as f32 + 0.5, point.y as f32 + 0.5),
                sprites: *sprites,
            });
        }

        Ok(Level { spawn })
    }

    /// The level's spawn points.
    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::assets::SpawnPointData;

    fn sample_data() -> LevelData {
        let mut types = vec![[-1i16; PART_COUNT]; 2];
        types[0][2] = 0; // bottom -> "villager_body"
        types[0][4] = 1; // head -> "villager_head"
        types[1][7] = 2; // only -> missing name
        LevelData {
            sprites: vec![
                "villager_body".to_string(),
                "villager_head".to_string(),
                "no_such_sprite".to_string(),
            ],
            spawn_types: types,
            spawn_points: vec![
                SpawnPointData { x: 4, y: 9, kind: 0 },
                SpawnPointData { x: 5, y: 9, kind: 1 },
            ],
        }
    }

    fn catalog() -> SpriteCatalog {
        SpriteCatalog::new(vec![
            "villager_head".to_string(),
            "villager_body".to_string(),
        ])
    }

    #[test]
    fn test_resolves_names_and_centers_positions() {
        let level = Level::from_data(sample_data(), &catalog()).unwrap();
        let points = level.spawn_points();
        assert_eq!(points.len(), 2);

        assert_eq!(points[0].pos, Vec2::new(4.5, 9.5));
        assert_eq!(points[0].sprites[2], 1); // villager_body
        assert_eq!(points[0].sprites[4], 0); // villager_head
        assert_eq!(points[0].sprites[0], -1);

        // Missing sprite name resolved to an empty slot
        assert_eq!(points[1].sprites[7], -1);
    }

    #[test]
    fn test_rejects_out_of_range_tables() {
        let mut data = sample_data();
        data.spawn_types[0][1] = 17;
        assert!(Level::from_data(data, &catalog()).is_err());

        let mut data = sample_data();
        data.spawn_points[0].kind = 9;
        assert!(Level::from_data(data, &catalog()).is_err());
    }
}
