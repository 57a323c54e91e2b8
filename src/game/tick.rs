//! Fixed-Step Frame Driver
//!
//! [`Game`] owns the whole simulation: input history, terrain, the
//! script machine, and the person roster. The renderer calls
//! [`Game::update`] once per frame with wall-clock time; the driver
//! converts that into zero or more fixed ticks, each fed the input
//! recorded during its window. Between ticks the renderer reads a
//! frozen snapshot and interpolates with [`Game::frame_fraction`].

use tracing::warn;

use crate::core::direction::Direction;
use crate::core::rng::GameRng;
use crate::game::assets::{AssetError, AssetProvider, SpriteCatalog};
use crate::game::config::GameConfig;
use crate::game::input::{Bindings, FrameInput, InputHistory};
use crate::game::level::Level;
use crate::game::machine::{Machine, ScriptContext};
use crate::game::person::{Neighbor, Part, Person, PersonContext, ANONYMOUS, PART_COUNT};
use crate::game::script::Script;
use crate::game::world::World;

/// The game simulation: a world, a script machine, and a roster of
/// persons, advanced in fixed ticks.
pub struct Game {
    config: GameConfig,

    // Clock state: end of the last completed tick, and the wall-clock
    // time of the last update call.
    started: bool,
    frame_time: f64,
    real_time: f64,
    ticks: u64,

    input: InputHistory,
    bindings: Bindings,
    frame_input: FrameInput,

    machine: Machine,
    sprites: SpriteCatalog,
    world: World,
    rng: GameRng,

    persons: Vec<Person>,
    pending: Vec<Person>,
}

impl Game {
    /// Build a game from already-validated assets.
    pub fn new(
        world: World,
        script: Script,
        sprites: SpriteCatalog,
        config: GameConfig,
        seed: u64,
    ) -> Self {
        Self {
            config,
            started: false,
            frame_time: 0.0,
            real_time: 0.0,
            ticks: 0,
            input: InputHistory::new(),
            bindings: Bindings::standard_keyboard(),
            frame_input: FrameInput::default(),
            machine: Machine::new(script),
            sprites,
            world,
            rng: GameRng::new(seed),
            persons: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Load and validate all assets through a provider.
    pub fn load(
        provider: &dyn AssetProvider,
        config: GameConfig,
        seed: u64,
    ) -> Result<Self, AssetError> {
        let world = World::from_data(provider.world()?, config.terrain.clone())?;
        let script = Script::from_data(provider.script()?)?;
        let sprites = SpriteCatalog::new(provider.sprite_groups()?);
        Ok(Self::new(world, script, sprites, config, seed))
    }

    /// Seed the roster from a level's spawn points.
    pub fn start_level(&mut self, level: &Level) {
        for point in level.spawn_points() {
            let mut person = Person::new(
                ANONYMOUS,
                point.pos - self.world.center(),
                Direction::Down,
            );
            for slot in 0..PART_COUNT {
                if let Some(part) = Part::from_index(slot) {
                    person.set_part(part, point.sprites[slot]);
                }
            }
            self.add_person(person);
        }
    }

    /// Stage a person for the roster; merged at the next tick
    /// boundary so updates in progress never see a half-added entry.
    pub fn add_person(&mut self, person: Person) {
        self.pending.push(person);
    }

    /// Route a raw device button event through the binding table.
    pub fn handle_button(&mut self, time: f64, device: u32, ident: u32, is_down: bool) -> bool {
        self.bindings
            .handle_button(&mut self.input, time, device, ident, is_down)
    }

    /// Advance the simulation to a wall-clock time.
    ///
    /// The first call seeds the clock and runs exactly one tick over
    /// the full elapsed window. Afterwards, fixed ticks run while they
    /// fit; a gap beyond the catch-up limit is dropped (with a logged
    /// warning) instead of simulated.
    pub fn update(&mut self, time: f64) {
        let dt = self.config.clock.tick_seconds;

        if !self.started {
            self.started = true;
            self.frame_time = time;
            self.real_time = time;
            self.frame_input = self.input.read(0.0, time, true);
            self.advance();
            return;
        }

        let delta = time - self.real_time;
        let max_catch_up = self.config.clock.max_catch_up;
        if delta > max_catch_up {
            warn!("lag: dropping {:.3} s", delta - max_catch_up);
            self.frame_time += delta - max_catch_up;
        }
        self.real_time = time;

        let mut start = self.frame_time;
        loop {
            let end = start + dt;
            if end > time {
                break;
            }
            self.frame_time = end;
            self.frame_input = self.input.read(start, end, true);
            self.advance();
            start = end;
        }
    }

    /// Run one fixed tick.
    fn advance(&mut self) {
        self.ticks += 1;
        let dt = self.config.clock.tick_seconds as f32;

        // Merge staged spawns; each is initialized exactly once.
        for mut person in self.pending.drain(..) {
            person.initialize(&self.world);
            self.persons.push(person);
        }

        // The machine first: it may retarget control, change
        // appearances, or stage spawns for the next tick.
        let mut ctx = ScriptContext {
            dt,
            input: &self.frame_input,
            persons: &mut self.persons,
            spawn_queue: &mut self.pending,
            world: &self.world,
            sprites: &self.sprites,
            rng: &mut self.rng,
            config: &self.config.machine,
        };
        self.machine.run(&mut ctx);

        // Then every person, against a tick-boundary snapshot of the
        // roster; script triggers are collected and applied after the
        // loop.
        let neighbors: Vec<Neighbor> = self
            .persons
            .iter()
            .map(|p| Neighbor {
                identity: p.identity(),
                position: p.position(1.0).truncate(),
            })
            .collect();

        let mut triggers = Vec::new();
        for person in self.persons.iter_mut() {
            let pctx = PersonContext {
                abstime: self.frame_time,
                dt,
                input: &self.frame_input,
                world: &self.world,
                neighbors: &neighbors,
                config: &self.config.person,
            };
            if let Some(identity) = person.update(&pctx) {
                triggers.push(identity);
            }
        }
        for identity in triggers {
            self.machine.trigger_script(identity);
        }
    }

    /// How far wall-clock time sits between the last completed tick
    /// and the next, in `[0, 1)`; for render interpolation.
    pub fn frame_fraction(&self) -> f32 {
        ((self.real_time - self.frame_time) / self.config.clock.tick_seconds) as f32
    }

    /// Completed tick count.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The script machine (dialogue state for the renderer).
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Mutable machine access (jumping to scene labels).
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// The terrain.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// All live persons.
    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    /// The binding table, for rebinding keys.
    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }
}

// =============================================================================
// TESTS
// =============================================================================
