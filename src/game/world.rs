//! Terrain Queries
//!
//! The world is an immutable tile grid: a byte heightmap sampled at
//! tile corners and a classification code per tile. Entities live in
//! world space, which is grid space translated so the map center sits
//! at the origin; both queries translate back before sampling.
//!
//! [`World::edge_distance`] is the collision primitive: a signed
//! distance from a point to the nearest boundary between traversable
//! and blocked terrain, with a direction pointing toward the
//! traversable interior. Character physics cancels velocity against
//! that direction, so the function must stay continuous across tile
//! boundaries.

use glam::{IVec2, Vec2, Vec3};

use crate::game::assets::{AssetError, WorldData};
use crate::game::config::TerrainConfig;

/// Classified shape of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileShape {
    /// Fully blocked.
    Solid,
    /// Fully traversable.
    Open,
    /// Solid corner at +X/+Y, hypotenuse across the tile.
    RampNE,
    /// Solid corner at -X/+Y.
    RampNW,
    /// Solid corner at +X/-Y.
    RampSE,
    /// Solid corner at -X/-Y.
    RampSW,
}

/// Result of an edge-distance query.
#[derive(Clone, Copy, Debug)]
pub struct EdgeDistance {
    /// Signed distance to the nearest traversable/blocked boundary.
    /// Positive inside traversable terrain, negative outside. The
    /// magnitude saturates at the scan-window sentinel.
    pub distance: f32,
    /// Unit direction toward the traversable interior; zero at
    /// distance zero and for sentinel results.
    pub toward_interior: Vec2,
}

/// Information about the world terrain (not the objects in it).
#[derive(Clone, Debug)]
pub struct World {
    size: IVec2,
    center: Vec2,
    height_min: f32,
    height_scale: f32,
    vertex_scale: Vec3,
    heightmap: Vec<u8>,
    tiles: Vec<u8>,
    config: TerrainConfig,
}

impl World {
    /// Validate decoded terrain tables and build the world.
    pub fn from_data(data: WorldData, config: TerrainConfig) -> Result<World, AssetError> {
        let (w, h) = (data.width as usize, data.height as usize);
        if w < 2 || h < 2 {
            return Err(AssetError::World("grid smaller than 2x2"));
        }
        if data.heightmap.len() != w * h {
            return Err(AssetError::World("heightmap size mismatch"));
        }
        if data.tiles.len() != w * h {
            return Err(AssetError::World("tilemap size mismatch"));
        }
        if !(data.height_min <= data.height_max) {
            return Err(AssetError::World("inverted height range"));
        }
        if data
            .tiles
            .iter()
            .any(|&t| t > 5 && !config.player_open_tiles.contains(&t))
        {
            return Err(AssetError::World("unknown tile code"));
        }

        Ok(World {
            size: IVec2::new(data.width as i32, data.height as i32),
            center: Vec2::new(data.width as f32 * 0.5, data.height as f32 * 0.5),
            height_min: data.height_min,
            height_scale: (data.height_max - data.height_min) * (1.0 / 255.0),
            vertex_scale: Vec3::from_array(data.vertex_scale),
            heightmap: data.heightmap,
            tiles: data.tiles,
            config,
        })
    }

    /// Dimensions of the world in tiles.
    pub fn size(&self) -> IVec2 {
        self.size
    }

    /// Offset from world space (entity positions) to grid space.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Scaling factor the renderer applies to mesh vertices.
    pub fn vertex_scale(&self) -> Vec3 {
        self.vertex_scale
    }

    /// Terrain height at a world-space position.
    ///
    /// Bilinear interpolation over the four surrounding heightmap
    /// samples; positions outside the grid (leaving a one-cell margin
    /// for interpolation) report the minimum height.
    pub fn height_at(&self, pos: Vec2) -> f32 {
        let rpos = pos + self.center;
        let x = rpos.x.floor() as i32;
        let y = rpos.y.floor() as i32;
        let (w, h) = (self.size.x, self.size.y);
        if x < 0 || y < 0 || x >= w - 1 || y >= h - 1 {
            return self.height_min;
        }
        let sample = |sx: i32, sy: i32| self.heightmap[(sy * w + sx) as usize] as f32;
        let v00 = sample(x, y);
        let v01 = sample(x + 1, y);
        let v10 = sample(x, y + 1);
        let v11 = sample(x + 1, y + 1);
        let fx = rpos.x - x as f32;
        let fy = rpos.y - y as f32;
        let v0 = v00 + (v01 - v00) * fx;
        let v1 = v10 + (v11 - v10) * fx;
        (v0 + (v1 - v0) * fy) * self.height_scale + self.height_min
    }

    /// Signed distance from a world-space position to the nearest
    /// traversable/blocked boundary.
    ///
    /// The tile under the position decides inside vs outside; a square
    /// window of `scan_radius` tiles is then scanned for the closest
    /// boundary feature. Tiles matching the querying point's own
    /// classification are not obstacles. When two features are
    /// equidistant the first in row-major scan order wins; callers
    /// must not rely on the tie-break.
    pub fn edge_distance(&self, pos: Vec2, is_player: bool) -> EdgeDistance {
        let p = pos + self.center;
        let tx = p.x.floor() as i32;
        let ty = p.y.floor() as i32;
        let sentinel = self.config.sentinel_distance();
        if tx < 0 || ty < 0 || tx >= self.size.x || ty >= self.size.y {
            return EdgeDistance {
                distance: -sentinel,
                toward_interior: Vec2::ZERO,
            };
        }

        let inside = self.point_is_open(p, tx, ty, is_player);
        let r = self.config.scan_radius;
        let mut best: Option<(f32, Vec2)> = None;

        for dy in -r..=r {
            for dx in -r..=r {
                let cx = tx + dx;
                let cy = ty + dy;
                let shape = self.shape_at(cx, cy, is_player);
                let x0 = cx as f32;
                let y0 = cy as f32;

                let candidate = match shape {
                    TileShape::Open => {
                        if inside {
                            continue;
                        }
                        closest_on_square(p, x0, y0)
                    }
                    TileShape::Solid => {
                        if !inside {
                            continue;
                        }
                        closest_on_square(p, x0, y0)
                    }
                    ramp => {
                        // The hypotenuse separates the tile's open and
                        // blocked halves, so it is always a boundary.
                        let (a, b, _) = ramp_segment(ramp, x0, y0);
                        closest_on_segment(p, a, b)
                    }
                };

                let dist = p.distance(candidate);
                if best.is_none_or(|(bd, _)| dist < bd) {
                    best = Some((dist, candidate));
                }
            }
        }

        match best {
            None => EdgeDistance {
                distance: if inside { sentinel } else { -sentinel },
                toward_interior: Vec2::ZERO,
            },
            Some((dist, closest)) => {
                let toward_interior = if dist > 1e-6 {
                    let away = (p - closest) / dist;
                    if inside {
                        away
                    } else {
                        -away
                    }
                } else {
                    Vec2::ZERO
                };
                EdgeDistance {
                    distance: if inside { dist } else { -dist },
                    toward_interior,
                }
            }
        }
    }

    /// Shape of the tile at grid coordinates; out-of-grid is solid.
    fn shape_at(&self, tx: i32, ty: i32, is_player: bool) -> TileShape {
        if tx < 0 || ty < 0 || tx >= self.size.x || ty >= self.size.y {
            return TileShape::Solid;
        }
        let code = self.tiles[(ty * self.size.x + tx) as usize];
        self.classify(code, is_player)
    }

    /// Classify a raw tile code for the given entity variant.
    fn classify(&self, code: u8, is_player: bool) -> TileShape {
        if self.config.player_open_tiles.contains(&code) {
            return if is_player {
                TileShape::Open
            } else {
                TileShape::Solid
            };
        }
        match code {
            1 => TileShape::Open,
            2 => TileShape::RampNE,
            3 => TileShape::RampNW,
            4 => TileShape::RampSE,
            5 => TileShape::RampSW,
            _ => TileShape::Solid,
        }
    }

    /// Is a grid-space point on traversable ground? Ramp tiles split
    /// on which side of the hypotenuse the point falls.
    fn point_is_open(&self, p: Vec2, tx: i32, ty: i32, is_player: bool) -> bool {
        match self.shape_at(tx, ty, is_player) {
            TileShape::Open => true,
            TileShape::Solid => false,
            ramp => {
                let (a, _, normal) = ramp_segment(ramp, tx as f32, ty as f32);
                (p - a).dot(normal) >= 0.0
            }
        }
    }
}

/// Hypotenuse of a ramp tile with origin corner `(x0, y0)`:
/// endpoints plus the unit normal pointing into the open half.
fn ramp_segment(shape: TileShape, x0: f32, y0: f32) -> (Vec2, Vec2, Vec2) {
    const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;
    match shape {
        TileShape::RampNE => (
            Vec2::new(x0, y0 + 1.0),
            Vec2::new(x0 + 1.0, y0),
            Vec2::new(-DIAG, -DIAG),
        ),
        TileShape::RampNW => (
            Vec2::new(x0, y0),
            Vec2::new(x0 + 1.0, y0 + 1.0),
            Vec2::new(DIAG, -DIAG),
        ),
        TileShape::RampSE => (
            Vec2::new(x0, y0),
            Vec2::new(x0 + 1.0, y0 + 1.0),
            Vec2::new(-DIAG, DIAG),
        ),
        TileShape::RampSW => (
            Vec2::new(x0, y0 + 1.0),
            Vec2::new(x0 + 1.0, y0),
            Vec2::new(DIAG, DIAG),
        ),
        _ => unreachable!("not a ramp"),
    }
}

/// Closest point to `p` on the unit tile square at `(x0, y0)`.
fn closest_on_square(p: Vec2, x0: f32, y0: f32) -> Vec2 {
    Vec2::new(p.x.clamp(x0, x0 + 1.0), p.y.clamp(y0, y0 + 1.0))
}

/// Closest point to `p` on segment `a`-`b`; endpoints win when the
/// projection falls outside the segment.
fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

// =============================================================================
// TESTS
// =============================================================================
