//! Character Physics and Animation
//!
//! A person is any simulated character: the player, NPCs, monsters.
//! Each tick a person integrates velocity toward its input axis,
//! gets pushed off terrain edges, advances its walk cycle by distance
//! traveled, and recomposes the ordered list of part sprites the
//! renderer draws.

use glam::{Vec2, Vec3};

use crate::core::direction::Direction;
use crate::game::config::PersonConfig;
use crate::game::input::{Button, FrameInput};
use crate::game::world::World;

/// Number of appearance slots on a person.
pub const PART_COUNT: usize = 8;

/// Identity of an anonymous (non-scriptable) person.
pub const ANONYMOUS: i32 = -1;

/// Appearance slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Part {
    /// Held item, drawn in front or behind by facing.
    Item1 = 0,
    /// Second held item.
    Item2 = 1,
    /// Legs.
    Bottom = 2,
    /// Torso.
    Top = 3,
    /// Head.
    Head = 4,
    /// Face.
    Face = 5,
    /// Hat.
    Hat = 6,
    /// Whole-body sprite for single-piece characters.
    Only = 7,
}

impl Part {
    /// Decode a part slot from its index (script operands).
    pub fn from_index(index: usize) -> Option<Part> {
        match index {
            0 => Some(Part::Item1),
            1 => Some(Part::Item2),
            2 => Some(Part::Bottom),
            3 => Some(Part::Top),
            4 => Some(Part::Head),
            5 => Some(Part::Face),
            6 => Some(Part::Hat),
            7 => Some(Part::Only),
            _ => None,
        }
    }
}

/// Animation groups; each part animates with one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Group {
    /// No animation.
    None = 0,
    /// Walk-cycle leg frames.
    Legs = 1,
    /// Torso sway frames (also used by held items).
    Torso = 2,
    /// Face frames.
    Face = 3,
}

const GROUP_COUNT: usize = 4;

/// Map from parts to animation groups.
const PART_GROUP: [Group; PART_COUNT] = [
    Group::Torso, // Item1
    Group::Torso, // Item2
    Group::Legs,  // Bottom
    Group::Torso, // Top
    Group::None,  // Head
    Group::Face,  // Face
    Group::None,  // Hat
    Group::None,  // Only
];

/// Length of the walking cycle, in frames.
const WALK_COUNT: usize = 4;
/// Index of the standing frame in [`WALK_FRAMES`].
const WALK_STAND: usize = 4;

/// Information about each frame of the walk cycle.
struct WalkFrame {
    torso: u8,
    legs: u8,
    /// Vertical bob, applied to everything but the bottom part.
    lift: i8,
}

const WALK_FRAMES: [WalkFrame; WALK_COUNT + 1] = [
    // Walking
    WalkFrame { torso: 3, legs: 1, lift: 0 },
    WalkFrame { torso: 2, legs: 2, lift: 1 },
    WalkFrame { torso: 3, legs: 3, lift: 0 },
    WalkFrame { torso: 4, legs: 4, lift: 1 },
    // Standing
    WalkFrame { torso: 3, legs: 0, lift: 0 },
];

/// Draw order for parts, by facing direction. Held items render in
/// front of or behind the body depending on which way the person
/// faces.
const PART_ORDER: [[Part; PART_COUNT]; Direction::COUNT] = {
    use Part::*;
    [
        // Right
        [Item1, Bottom, Top, Head, Face, Hat, Only, Item2],
        // Up
        [Item2, Item1, Bottom, Top, Head, Face, Hat, Only],
        // Left
        [Item1, Bottom, Top, Head, Face, Hat, Only, Item2],
        // Down
        [Bottom, Top, Head, Face, Hat, Only, Item1, Item2],
    ]
};

/// One drawable sprite of a person, recomputed each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartSprite {
    /// Sprite-group index.
    pub sprite: u16,
    /// Frame within the group.
    pub frame: u8,
    /// Horizontal pixel offset.
    pub offset_x: i8,
    /// Vertical pixel offset.
    pub offset_y: i8,
}

/// Identity and position of a sibling entity, snapshotted at the
/// start of the tick for interaction queries.
#[derive(Clone, Copy, Debug)]
pub struct Neighbor {
    /// Sibling identity (`ANONYMOUS` for unscripted persons).
    pub identity: i32,
    /// Sibling position at the tick boundary.
    pub position: Vec2,
}

/// Everything a person needs for one tick.
pub struct PersonContext<'a> {
    /// Absolute time at the end of this tick.
    pub abstime: f64,
    /// Fixed tick duration.
    pub dt: f32,
    /// Aggregated input for this tick; only the player consumes it.
    pub input: &'a FrameInput,
    /// Terrain queries.
    pub world: &'a World,
    /// Snapshot of all persons at the tick boundary.
    pub neighbors: &'a [Neighbor],
    /// Movement constants.
    pub config: &'a PersonConfig,
}

/// A person in the game, in a broad sense: the player, NPCs, and
/// monsters alike.
#[derive(Clone, Debug)]
pub struct Person {
    identity: i32,
    is_player: bool,

    // Current facing direction.
    dir: Direction,

    // Sprite-group index per appearance slot, -1 empty.
    parts: [i32; PART_COUNT],

    // Composed sprites, recalculated each update.
    sprites: [PartSprite; PART_COUNT],
    sprite_count: usize,

    // Previous and current position; the pair always spans exactly
    // one tick.
    pos: [Vec2; 2],
    elevation: [f32; 2],
    vel: Vec2,

    // Position where the walk animation last advanced.
    step_anchor: Vec2,
    step_frame: usize,
    // Absolute time when walking decays into standing.
    stand_until: f64,
}

impl Person {
    /// Create a person at the given location.
    pub fn new(identity: i32, pos: Vec2, dir: Direction) -> Self {
        Self {
            identity,
            is_player: false,
            dir,
            parts: [-1; PART_COUNT],
            sprites: [PartSprite::default(); PART_COUNT],
            sprite_count: 0,
            pos: [pos; 2],
            elevation: [0.0; 2],
            vel: Vec2::ZERO,
            step_anchor: pos,
            step_frame: 0,
            stand_until: f64::NEG_INFINITY,
        }
    }

    /// Initialize terrain-derived state. Called exactly once, after
    /// the person is added to the roster and before the first update.
    pub fn initialize(&mut self, world: &World) {
        let height = world.height_at(self.pos[1]);
        self.elevation = [height; 2];
    }

    /// Advance one tick.
    ///
    /// Returns the identity of a sibling to run a script against when
    /// the player pressed the interact button in front of one; the
    /// caller forwards it to the machine.
    pub fn update(&mut self, ctx: &PersonContext) -> Option<i32> {
        let mut trigger = None;
        let move_axis = if self.is_player {
            ctx.input.movement
        } else {
            Vec2::ZERO
        };
        if self.is_player && ctx.input.button_pressed(Button::Action1) {
            trigger = self.find_interact_target(ctx);
        }

        // Accelerate toward the target velocity without overshooting:
        // when one tick of acceleration would cross the target, snap
        // to it exactly.
        let v0 = self.vel;
        let target = move_axis * ctx.config.move_speed;
        let dv = target - v0;
        let dv_mag = dv.length();
        let max_step = ctx.config.acceleration * ctx.dt;
        let mut v1 = if dv_mag <= max_step {
            target
        } else {
            v0 + dv * (max_step / dv_mag)
        };

        // Single-iteration edge constraint: near a boundary, cancel
        // the velocity component heading into it.
        let edge = ctx.world.edge_distance(self.pos[1], self.is_player);
        if edge.distance < ctx.config.push_threshold {
            let inward = v1.dot(edge.toward_interior);
            if inward < 0.0 {
                v1 -= edge.toward_interior * inward;
            }
        }

        // Trapezoidal position update.
        self.pos[0] = self.pos[1];
        self.pos[1] += (v0 + v1) * (0.5 * ctx.dt);
        self.vel = v1;

        self.elevation[0] = self.elevation[1];
        self.elevation[1] = ctx.world.height_at(self.pos[1]);

        self.advance_walk(ctx);
        self.compose_sprites(ctx);
        trigger
    }

    /// Nearest scriptable sibling around the probe point in front of
    /// the person.
    fn find_interact_target(&self, ctx: &PersonContext) -> Option<i32> {
        let probe = self.pos[1] + self.dir.to_vec() * ctx.config.interact_reach;
        let mut best: Option<(f32, i32)> = None;
        for n in ctx.neighbors {
            if n.identity < 0 || n.identity == self.identity {
                continue;
            }
            let dist = probe.distance(n.position);
            if dist <= ctx.config.interact_radius && best.is_none_or(|(bd, _)| dist < bd) {
                best = Some((dist, n.identity));
            }
        }
        best.map(|(_, identity)| identity)
    }

    /// Advance the walk cycle by distance traveled since the last
    /// anchor, carrying fractional distance so one large tick and many
    /// small ticks land on the same frame.
    fn advance_walk(&mut self, ctx: &PersonContext) {
        let step = self.pos[1] - self.step_anchor;
        let step_d2 = step.length_squared();
        let stride = ctx.config.step_distance;
        if step_d2 >= stride * stride {
            let step_len = step_d2.sqrt();
            let steps = step_len / stride;
            let whole = steps.floor();
            self.step_anchor += step * (whole * stride / step_len);
            self.step_frame = (self.step_frame + whole as usize) % WALK_COUNT;
            self.stand_until = ctx.abstime + ctx.config.stand_time as f64;
            self.dir = Direction::from_vec(step);
        }
    }

    /// Rebuild the ordered sprite list for the current facing and
    /// walk frame.
    fn compose_sprites(&mut self, ctx: &PersonContext) {
        // A step this tick refreshed stand_until, so this holds the
        // frame it landed on; an idle person past the grace window
        // falls back to standing.
        let walk = if ctx.abstime > self.stand_until {
            &WALK_FRAMES[WALK_STAND]
        } else {
            &WALK_FRAMES[self.step_frame]
        };

        let mut frames = [0u8; GROUP_COUNT];
        frames[Group::Legs as usize] = walk.legs;
        frames[Group::Torso as usize] = walk.torso;

        let mut count = 0;
        for &part in &PART_ORDER[self.dir as usize] {
            let slot = part as usize;
            let sprite = self.parts[slot];
            if sprite < 0 {
                continue;
            }
            let group = PART_GROUP[slot];
            let lift = if part == Part::Bottom { 0 } else { walk.lift };
            self.sprites[count] = PartSprite {
                sprite: sprite as u16,
                frame: frames[group as usize],
                offset_x: 0,
                offset_y: lift,
            };
            count += 1;
        }
        self.sprite_count = count;
    }

    /// Set the appearance of one part, by sprite-group index
    /// (-1 clears the slot).
    pub fn set_part(&mut self, part: Part, sprite: i32) {
        self.parts[part as usize] = sprite;
    }

    /// Grant or revoke player control.
    pub fn set_player(&mut self, is_player: bool) {
        self.is_player = is_player;
    }

    /// Scripting identity (`ANONYMOUS` if none).
    pub fn identity(&self) -> i32 {
        self.identity
    }

    /// Is this person under player control?
    pub fn is_player(&self) -> bool {
        self.is_player
    }

    /// Current facing direction.
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Velocity at the end of the last tick.
    pub fn velocity(&self) -> Vec2 {
        self.vel
    }

    /// Position interpolated between the last two ticks; z is the
    /// terrain elevation.
    pub fn position(&self, frac: f32) -> Vec3 {
        let xy = self.pos[0] + (self.pos[1] - self.pos[0]) * frac;
        let z = self.elevation[0] + (self.elevation[1] - self.elevation[0]) * frac;
        Vec3::new(xy.x, xy.y, z)
    }

    /// The person's drawable sprites, back to front.
    pub fn sprites(&self) -> &[PartSprite] {
        &self.sprites[..self.sprite_count]
    }
}

// =============================================================================
// TESTS
// =============================================================================
