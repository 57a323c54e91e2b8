//! Emberwood demo driver.
//!
//! Runs the simulation core headless against in-memory assets: a small
//! valley map, two scripted characters, and a short dialogue scene.
//! Input events are injected on a fixed schedule so the run is
//! reproducible.

use anyhow::{bail, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use emberwood::game::assets::{
    AssetError, AssetProvider, LevelData, ScriptData, SpawnPointData, SpriteCatalog, WorldData,
};
use emberwood::game::input::keys;
use emberwood::game::level::Level as GameLevel;
use emberwood::game::person::PART_COUNT;
use emberwood::game::script::Opcode;
use emberwood::{Game, GameConfig, TICK_RATE, VERSION};

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Emberwood core v{}", VERSION);
    info!("Tick rate: {} Hz", TICK_RATE);

    let provider = DemoAssets;
    let mut game = Game::load(&provider, GameConfig::default(), 20140817)?;

    let level = GameLevel::from_data(
        provider.level("village")?,
        &SpriteCatalog::new(provider.sprite_groups()?),
    )?;
    game.start_level(&level);

    if !game.machine_mut().jump("main") {
        bail!("script has no main label");
    }

    run_scene(&mut game);
    Ok(())
}

/// Drive ten seconds of the scene at 60 fps with scheduled input.
fn run_scene(game: &mut Game) {
    // (time, key, pressed): walk south toward the elder, greet, read
    // both lines, move the highlight down, decline the task.
    let script_events: &[(f64, u32, bool)] = &[
        (0.20, keys::KEY_S, true),
        (0.45, keys::KEY_S, false),
        (0.60, keys::KEY_SPACE, true),
        (0.70, keys::KEY_SPACE, false),
        (1.20, keys::KEY_SPACE, true),
        (1.30, keys::KEY_SPACE, false),
        (2.40, keys::KEY_SPACE, true),
        (2.50, keys::KEY_SPACE, false),
        (2.80, keys::KEY_S, true),
        (2.90, keys::KEY_S, false),
        (3.40, keys::KEY_SPACE, true),
        (3.50, keys::KEY_SPACE, false),
        (4.20, keys::KEY_SPACE, true),
        (4.30, keys::KEY_SPACE, false),
    ];

    let frame_dt = 1.0 / 60.0;
    let mut next_event = 0;
    let mut last_serial = game.machine().dialogue_serial();
    let mut last_report = 0.0;

    for frame in 0..600 {
        let time = frame as f64 * frame_dt;

        while next_event < script_events.len() && script_events[next_event].0 <= time {
            let (at, key, pressed) = script_events[next_event];
            game.handle_button(at, 0, key, pressed);
            next_event += 1;
        }

        game.update(time);

        let serial = game.machine().dialogue_serial();
        if serial != last_serial {
            last_serial = serial;
            if game.machine().dialogue_lines().is_empty() {
                info!("dialogue closed");
            } else {
                for line in game.machine().dialogue_lines() {
                    let marker = if line.selected { ">" } else { " " };
                    info!("dialogue {} {}", marker, line.text);
                }
            }
        }

        if time - last_report >= 1.0 {
            last_report = time;
            for person in game.persons() {
                let pos = person.position(game.frame_fraction());
                info!(
                    "t={:.1} person {} at ({:.2}, {:.2}, {:.2}) facing {:?}",
                    time,
                    person.identity(),
                    pos.x,
                    pos.y,
                    pos.z,
                    person.direction(),
                );
            }
        }
    }

    info!("=== Scene finished ===");
    info!("ticks run: {}", game.ticks());
    for person in game.persons() {
        let pos = person.position(1.0);
        info!(
            "person {} ({} sprites) ended at ({:.2}, {:.2})",
            person.identity(),
            person.sprites().len(),
            pos.x,
            pos.y,
        );
    }
}

// =============================================================================
// IN-MEMORY ASSETS
// =============================================================================

/// Demo asset provider: everything generated in memory.
struct DemoAssets;

const WORLD_SIZE: u32 = 24;

impl AssetProvider for DemoAssets {
    fn world(&self) -> Result<WorldData, AssetError> {
        let size = WORLD_SIZE as usize;
        let mut tiles = vec![0u8; size * size];
        let mut heights = vec![0u8; size * size];

        for y in 0..size {
            for x in 0..size {
                let idx = y * size + x;
                // Solid ring, open valley inside
                if x >= 2 && x < size - 2 && y >= 2 && y < size - 2 {
                    tiles[idx] = 1;
                }
                // Ground rises gently toward the north edge
                heights[idx] = (y * 8) as u8;
            }
        }
        // A ramped outcrop in the northeast corner of the valley
        tiles[18 * size + 18] = 5; // solid toward -X/-Y
        tiles[18 * size + 19] = 4; // solid toward +X/-Y
        tiles[17 * size + 18] = 0;
        tiles[17 * size + 19] = 0;

        Ok(WorldData {
            width: WORLD_SIZE,
            height: WORLD_SIZE,
            height_min: 0.0,
            height_max: 6.0,
            vertex_scale: [1.0, 1.0, 0.5],
            heightmap: heights,
            tiles,
        })
    }

    fn script(&self) -> Result<ScriptData, AssetError> {
        let mut asm = Asm::default();
        let greeting = asm.string("Ah, you came down the hill path.");
        let ask = asm.string("Will you help clear the orchard?");
        let yes_reply = asm.string("Good. Start with the south rows.");
        let no_reply = asm.string("Come back when you change your mind.");

        let accept = asm.string("I will.");
        let decline = asm.string("Not today.");

        // Elder's dialogue (entry address 0, stored in variable 2;
        // SAVE overwrites it with 1 once the task is accepted)
        asm.op(Opcode::Say).imm(greeting);
        asm.op(Opcode::Say).imm(ask);
        asm.op(Opcode::Input);
        asm.op(Opcode::Response).imm(accept);
        asm.op(Opcode::Say).imm(yes_reply);
        asm.op(Opcode::Save).imm(1);
        asm.op(Opcode::Response).imm(decline);
        asm.op(Opcode::Say).imm(no_reply);
        asm.op(Opcode::End);
        asm.op(Opcode::Exit);

        // Scene setup
        asm.label("main");
        asm.op(Opcode::Fade).imm(15);
        asm.op(Opcode::Spawn).imm(1).imm(12).imm(12);
        asm.op(Opcode::Spawn).imm(2).imm(12).imm(9);
        let hero_body = asm.string("hero_body");
        let hero_head = asm.string("hero_head");
        let elder_body = asm.string("elder_body");
        let elder_head = asm.string("elder_head");
        let straw_hat = asm.string("straw_hat");
        asm.op(Opcode::Sprite).imm(1).imm(2).imm(hero_body);
        asm.op(Opcode::Sprite).imm(1).imm(4).imm(hero_head);
        asm.op(Opcode::Sprite).imm(2).imm(2).imm(elder_body);
        asm.op(Opcode::Sprite).imm(2).imm(4).imm(elder_head);
        asm.op(Opcode::Sprite).imm(2).imm(6).imm(straw_hat);
        asm.op(Opcode::SetPlayer).imm(1);
        asm.op(Opcode::SetVar).imm(2).imm(0);
        asm.op(Opcode::Exit);

        Ok(asm.finish(8))
    }

    fn sprite_groups(&self) -> Result<Vec<String>, AssetError> {
        Ok([
            "hero_body",
            "hero_head",
            "elder_body",
            "elder_head",
            "straw_hat",
            "villager_body",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect())
    }

    fn level(&self, name: &str) -> Result<LevelData, AssetError> {
        if name != "village" {
            return Err(AssetError::NotFound(name.to_string()));
        }
        let mut villager = [-1i16; PART_COUNT];
        villager[2] = 0;
        Ok(LevelData {
            sprites: vec!["villager_body".to_string()],
            spawn_types: vec![villager],
            spawn_points: vec![
                SpawnPointData { x: 8, y: 14, kind: 0 },
                SpawnPointData { x: 16, y: 10, kind: 0 },
            ],
        })
    }
}

/// Minimal word-by-word script builder for the demo program.
#[derive(Default)]
struct Asm {
    words: Vec<u16>,
    labels: Vec<(String, u16)>,
    text: Vec<u8>,
}

impl Asm {
    fn label(&mut self, name: &str) -> u16 {
        let at = self.words.len() as u16;
        self.labels.push((name.to_string(), at));
        at
    }

    fn op(&mut self, op: Opcode) -> &mut Self {
        self.words.push(op.word());
        self
    }

    fn imm(&mut self, value: u16) -> &mut Self {
        self.words.push(value & 0x7fff);
        self
    }

    fn string(&mut self, s: &str) -> u16 {
        let offset = self.text.len() as u16;
        self.text.extend_from_slice(s.as_bytes());
        self.text.push(0);
        offset
    }

    fn finish(mut self, var_count: usize) -> ScriptData {
        if self.text.is_empty() {
            self.text.push(0);
        }
        ScriptData {
            labels: self.labels,
            text: self.text,
            program: self.words,
            var_count,
        }
    }
}
