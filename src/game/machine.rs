//! Script Virtual Machine
//!
//! Runs the dialogue/cutscene bytecode. The machine is either halted
//! (no program counter) or running; SAY and INPUT pause it with
//! dialogue on screen until the player responds, modeled as state
//! rather than blocking. Runtime faults (bad program counter, unknown
//! opcode, malformed operands) log an error and halt the machine; the
//! rest of the simulation keeps going.

use glam::Vec2;
use tracing::{debug, error, warn};

use crate::core::direction::Direction;
use crate::core::rng::GameRng;
use crate::game::assets::SpriteCatalog;
use crate::game::config::MachineConfig;
use crate::game::input::{Button, FrameInput};
use crate::game::person::{Part, Person};
use crate::game::script::{Opcode, ProgramReader, Script, OPCODE_BIT, OPERAND_NONE};
use crate::game::world::World;

/// One displayed dialogue line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueLine {
    /// The text to render.
    pub text: String,
    /// Is this line the highlighted choice?
    pub selected: bool,
}

/// What the machine is paused on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Waiting {
    /// Not paused.
    #[default]
    None,
    /// SAY text on screen, waiting for a confirm edge.
    Acknowledge,
    /// Response menu on screen, waiting for a selection.
    Choice,
}

/// Mutable machine state, kept apart from the immutable program so
/// the interpreter can borrow both at once.
#[derive(Debug, Default)]
struct MachineState {
    /// Program counter; None is halted.
    pc: Option<usize>,
    /// Identity whose script is running; resolves SAVE's target.
    speaker: Option<i32>,
    /// Script-visible variables.
    vars: Vec<i32>,

    /// Bumped on every visible dialogue change; the renderer re-reads
    /// only when it moves.
    serial: u32,
    lines: Vec<DialogueLine>,
    /// Seconds the current dialogue has been on screen.
    timer: f32,
    waiting: Waiting,
    /// Jump target per response option.
    option_targets: Vec<usize>,
    selected: usize,
}

impl MachineState {
    fn set_var(&mut self, var: i32, value: i32) {
        if var < 0 || var as usize >= self.vars.len() {
            error!("invalid variable: {}", var);
            return;
        }
        self.vars[var as usize] = value;
    }

    fn get_var(&self, var: i32) -> i32 {
        if var < 0 || var as usize >= self.vars.len() {
            error!("invalid variable: {}", var);
            return -1;
        }
        self.vars[var as usize]
    }

    /// Put dialogue on screen and start its persistence timer.
    fn show(&mut self, lines: Vec<DialogueLine>, waiting: Waiting) {
        self.lines = lines;
        self.timer = 0.0;
        self.waiting = waiting;
        self.serial += 1;
    }

    /// Take dialogue off screen.
    fn clear_dialogue(&mut self) {
        if self.lines.is_empty() && self.waiting == Waiting::None {
            return;
        }
        self.lines.clear();
        self.option_targets.clear();
        self.selected = 0;
        self.waiting = Waiting::None;
        self.serial += 1;
    }
}

/// Everything the machine may touch during one tick.
pub struct ScriptContext<'a> {
    /// Fixed tick duration.
    pub dt: f32,
    /// Aggregated input for this tick (dialogue confirm/selection).
    pub input: &'a FrameInput,
    /// The live roster; SETPLAYER and SPRITE mutate it.
    pub persons: &'a mut Vec<Person>,
    /// Staging queue for SPAWN; merged into the roster between ticks.
    pub spawn_queue: &'a mut Vec<Person>,
    /// Terrain, for the spawn coordinate translation.
    pub world: &'a World,
    /// Sprite-group name lookup for SPRITE.
    pub sprites: &'a SpriteCatalog,
    /// Spawn-position jitter source.
    pub rng: &'a mut GameRng,
    /// Machine constants.
    pub config: &'a MachineConfig,
}

/// The script virtual machine, bound to one loaded program.
#[derive(Debug)]
pub struct Machine {
    script: Script,
    state: MachineState,
}

impl Machine {
    /// Create a halted machine for a program, variables zeroed.
    pub fn new(script: Script) -> Self {
        let vars = vec![0; script.var_count()];
        Self {
            script,
            state: MachineState {
                vars,
                ..MachineState::default()
            },
        }
    }

    /// Halt and clear any pending dialogue. Variable values persist.
    pub fn reset(&mut self) {
        self.state.pc = None;
        self.state.speaker = None;
        self.state.clear_dialogue();
    }

    /// Start executing at a named label. Returns false if the label
    /// is unknown.
    pub fn jump(&mut self, label: &str) -> bool {
        match self.script.get_label(label) {
            Some(target) => {
                self.state.pc = Some(target);
                true
            }
            None => false,
        }
    }

    /// Begin running an entity's script, with that entity as the
    /// active speaker. The entry address is read from the entity's
    /// variable slot. No-op while a script is already running or when
    /// the identity is invalid.
    pub fn trigger_script(&mut self, identity: i32) {
        if self.is_running() {
            return;
        }
        if identity < 0 || identity as usize >= self.state.vars.len() {
            debug!("trigger for unscripted identity: {}", identity);
            return;
        }
        let addr = self.state.vars[identity as usize];
        if addr < 0 || addr as usize >= self.script.program().len() {
            error!("invalid script entry for identity {}: {}", identity, addr);
            return;
        }
        self.state.pc = Some(addr as usize);
        self.state.speaker = Some(identity);
    }

    /// Is a script in progress (executing or paused on dialogue)?
    pub fn is_running(&self) -> bool {
        self.state.pc.is_some() || self.state.waiting != Waiting::None
    }

    /// Identity of the active speaker.
    pub fn speaker(&self) -> Option<i32> {
        self.state.speaker
    }

    /// Read a variable; out-of-range reads log and return -1.
    pub fn get_var(&self, var: i32) -> i32 {
        self.state.get_var(var)
    }

    /// Write a variable; out-of-range writes log and do nothing.
    pub fn set_var(&mut self, var: i32, value: i32) {
        self.state.set_var(var, value)
    }

    /// Dialogue change counter for the renderer.
    pub fn dialogue_serial(&self) -> u32 {
        self.state.serial
    }

    /// Currently displayed dialogue lines.
    pub fn dialogue_lines(&self) -> &[DialogueLine] {
        &self.state.lines
    }

    /// Is a response menu waiting on the player?
    pub fn has_pending_choice(&self) -> bool {
        self.state.waiting == Waiting::Choice
    }

    /// Index of the highlighted option, while a choice is pending.
    pub fn selected_option(&self) -> Option<usize> {
        (self.state.waiting == Waiting::Choice).then_some(self.state.selected)
    }

    /// Advance the machine for one tick.
    ///
    /// Resolves pending dialogue first, then executes instructions up
    /// to the per-tick budget.
    pub fn run(&mut self, ctx: &mut ScriptContext) {
        let state = &mut self.state;
        let script = &self.script;

        match state.waiting {
            Waiting::Acknowledge => {
                state.timer += ctx.dt;
                if state.timer < ctx.config.min_dialogue_time
                    || !ctx.input.button_pressed(Button::Action1)
                {
                    return;
                }
                state.clear_dialogue();
            }
            Waiting::Choice => {
                state.timer += ctx.dt;
                if ctx.input.button_pressed(Button::MoveUp) && state.selected > 0 {
                    state.selected -= 1;
                    let sel = state.selected;
                    for (i, line) in state.lines.iter_mut().enumerate() {
                        line.selected = i == sel;
                    }
                    state.serial += 1;
                } else if ctx.input.button_pressed(Button::MoveDown)
                    && state.selected + 1 < state.option_targets.len()
                {
                    state.selected += 1;
                    let sel = state.selected;
                    for (i, line) in state.lines.iter_mut().enumerate() {
                        line.selected = i == sel;
                    }
                    state.serial += 1;
                }
                if state.timer < ctx.config.min_dialogue_time
                    || !ctx.input.button_pressed(Button::Action1)
                {
                    return;
                }
                let target = state.option_targets[state.selected];
                state.clear_dialogue();
                state.pc = Some(target);
            }
            Waiting::None => {}
        }

        let Some(pc) = state.pc else {
            return;
        };
        let mut reader = ProgramReader::new(script, pc);
        let mut icount = 0u32;

        while !reader.is_halted() {
            if icount >= ctx.config.instruction_budget {
                warn!("instruction limit hit... infinite loop?");
                reader.halt();
                break;
            }
            icount += 1;

            let Some(op) = reader.opcode() else {
                break;
            };
            match op {
                Opcode::End => {
                    debug!("END reached");
                    reader.halt();
                }

                Opcode::Exit => {
                    reader.halt();
                }

                Opcode::Fade => {
                    if let Some(data) = reader.imm() {
                        let dtime = crate::TICK_SECONDS * data as f64;
                        debug!("fade: {} s", dtime);
                    }
                }

                Opcode::Goto => {
                    if let Some(target) = reader.imm() {
                        reader.jump(target as usize);
                    }
                }

                Opcode::Input => {
                    let Some(start) = reader.pc() else {
                        break;
                    };
                    let Some(end) = reader.find_end() else {
                        reader.fault("INPUT without END");
                        break;
                    };
                    let program = script.program();
                    let mut lines = Vec::new();
                    let mut targets = Vec::new();
                    let mut i = start;
                    while i + 1 < end {
                        if program[i] != Opcode::Response.word() {
                            i += 1;
                            continue;
                        }
                        let text_idx = program[i + 1];
                        if text_idx & OPCODE_BIT != 0 {
                            i += 1;
                            continue;
                        }
                        if let Some(text) = script.get_text(text_idx as usize) {
                            lines.push(DialogueLine {
                                text: text.to_string(),
                                selected: lines.is_empty(),
                            });
                            targets.push(i + 2);
                        }
                        i += 2;
                    }
                    if targets.is_empty() {
                        reader.fault("INPUT with no responses");
                        break;
                    }
                    if targets.len() < 2 {
                        warn!("response menu with fewer than two options");
                    }
                    state.option_targets = targets;
                    state.selected = 0;
                    state.show(lines, Waiting::Choice);
                    state.pc = None;
                    return;
                }

                Opcode::Reset => {
                    reader.fault("RESET");
                }

                Opcode::Response => {
                    // Reached at the end of a chosen option's body:
                    // skip past the menu's END marker.
                    match reader.find_end() {
                        Some(end) => reader.jump(end + 1),
                        None => reader.fault("unexpected response"),
                    }
                }

                Opcode::Save => {
                    if let Some(value) = reader.imm() {
                        match state.speaker {
                            Some(speaker) => state.set_var(speaker, value as i32),
                            None => reader.fault("SAVE without a speaker"),
                        }
                    }
                }

                Opcode::Say => {
                    if let Some(text_idx) = reader.imm() {
                        match script.get_text(text_idx as usize) {
                            Some(text) => {
                                let line = DialogueLine {
                                    text: text.to_string(),
                                    selected: false,
                                };
                                state.show(vec![line], Waiting::Acknowledge);
                                state.pc = reader.pc();
                                return;
                            }
                            None => reader.fault("SAY with a bad text index"),
                        }
                    }
                }

                Opcode::SetPlayer => {
                    if let Some(name) = reader.imm() {
                        // Staged spawns count too, so a scene script
                        // can spawn its cast and hand over control in
                        // one run.
                        let mut name = name as i32;
                        for person in ctx
                            .persons
                            .iter_mut()
                            .chain(ctx.spawn_queue.iter_mut())
                        {
                            if person.identity() != name {
                                person.set_player(false);
                            } else {
                                person.set_player(true);
                                name = -1;
                            }
                        }
                    }
                }

                Opcode::SetVar => {
                    if let (Some(var), Some(value)) = (reader.imm(), reader.imm()) {
                        state.set_var(var as i32, value as i32);
                    }
                }

                Opcode::Spawn => {
                    if let (Some(name), Some(x), Some(y)) =
                        (reader.imm(), reader.imm(), reader.imm())
                    {
                        let mut pos = Vec2::new(x as f32, y as f32) - ctx.world.center();
                        let jitter = ctx.config.spawn_jitter;
                        if jitter > 0.0 {
                            pos += Vec2::new(
                                ctx.rng.next_f32_range(-jitter, jitter),
                                ctx.rng.next_f32_range(-jitter, jitter),
                            );
                        }
                        ctx.spawn_queue
                            .push(Person::new(name as i32, pos, Direction::Down));
                    }
                }

                Opcode::Sprite => {
                    if let (Some(name), Some(part_idx), Some(sprite_idx)) =
                        (reader.imm(), reader.imm(), reader.imm())
                    {
                        let Some(part) = Part::from_index(part_idx as usize) else {
                            error!("invalid sprite part: {}", part_idx);
                            continue;
                        };
                        let sprite = if sprite_idx == OPERAND_NONE {
                            -1
                        } else {
                            match script.get_text(sprite_idx as usize) {
                                Some(group) => {
                                    ctx.sprites.get_index(group).map_or(-1, |i| i as i32)
                                }
                                None => -1,
                            }
                        };
                        for person in ctx
                            .persons
                            .iter_mut()
                            .chain(ctx.spawn_queue.iter_mut())
                        {
                            if person.identity() == name as i32 {
                                person.set_part(part, sprite);
                            }
                        }
                    }
                }
            }
        }

        state.pc = reader.pc();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::assets::WorldData;
    use crate::game::config::TerrainConfig;
    use crate::game::script::testutil::Assembler;

    struct Harness {
        world: World,
        sprites: SpriteCatalog,
        persons: Vec<Person>,
        spawn_queue: Vec<Person>,
        rng: GameRng,
        config: MachineConfig,
        input: FrameInput,
        dt: f32,
    }

    impl Harness {
        fn new() -> Self {
            let n = 16 * 16;
            let world = World::from_data(
                WorldData {
                    width: 16,
                    height: 16,
                    height_min: 0.0,
                    height_max: 0.0,
                    vertex_scale: [1.0; 3],
                    heightmap: vec![0; n],
                    tiles: vec![1; n],
                },
                TerrainConfig::default(),
            )
            .unwrap();
            Self {
                world,
                sprites: SpriteCatalog::default(),
                persons: Vec::new(),
                spawn_queue: Vec::new(),
                rng: GameRng::new(7),
                config: MachineConfig::default(),
                input: FrameInput::default(),
                dt: 0.1,
            }
        }

        fn ctx(&mut self) -> ScriptContext<'_> {
            ScriptContext {
                dt: self.dt,
                input: &self.input,
                persons: &mut self.persons,
                spawn_queue: &mut self.spawn_queue,
                world: &self.world,
                sprites: &self.sprites,
                rng: &mut self.rng,
                config: &self.config,
            }
        }

        fn confirm(&mut self) {
            self.input = FrameInput {
                buttons: Button::Action1.mask(),
                pressed: Button::Action1.mask(),
                movement: Vec2::ZERO,
            };
        }

        fn press(&mut self, button: Button) {
            self.input = FrameInput {
                buttons: button.mask(),
                pressed: button.mask(),
                movement: Vec2::ZERO,
            };
        }

        fn idle(&mut self) {
            self.input = FrameInput::default();
        }
    }

    fn machine_for(asm: Assembler, var_count: usize) -> Machine {
        Machine::new(Script::from_data(asm.build(var_count)).unwrap())
    }

    #[test]
    fn test_say_dialogue_round_trip() {
        let mut asm = Assembler::new();
        let hello = asm.string("Well met, traveler.");
        asm.label("main");
        asm.op(Opcode::Say).imm(hello);
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 0);
        let mut harness = Harness::new();

        assert!(machine.jump("main"));
        let serial0 = machine.dialogue_serial();
        machine.run(&mut harness.ctx());

        // Paused with exactly the one line on screen
        assert!(machine.is_running());
        assert!(!machine.has_pending_choice());
        assert_eq!(machine.dialogue_lines().len(), 1);
        assert_eq!(machine.dialogue_lines()[0].text, "Well met, traveler.");
        assert_ne!(machine.dialogue_serial(), serial0);

        // A confirm edge before the persistence window is ignored
        harness.confirm();
        machine.run(&mut harness.ctx());
        assert_eq!(machine.dialogue_lines().len(), 1);

        // Once the window elapses the confirm resumes to EXIT
        machine.run(&mut harness.ctx());
        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());
        assert!(machine.dialogue_lines().is_empty());
        assert!(harness.persons.is_empty() && harness.spawn_queue.is_empty());
    }

    #[test]
    fn test_instruction_budget_halts_goto_loop() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Goto).imm(0);
        let mut machine = machine_for(asm, 0);
        let mut harness = Harness::new();

        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());

        // Halts instead of hanging; stays halted on later ticks
        assert!(!machine.is_running());
        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());
    }

    #[test]
    fn test_choice_menu_selection_and_branch() {
        let mut asm = Assembler::new();
        let yes = asm.string("Yes");
        let no = asm.string("No");
        asm.label("main");
        asm.op(Opcode::Input); // 0
        asm.op(Opcode::Response).imm(yes); // 1,2
        asm.op(Opcode::SetVar).imm(0).imm(1); // 3..6
        asm.op(Opcode::Response).imm(no); // 6,7
        asm.op(Opcode::SetVar).imm(0).imm(2); // 8..11
        asm.op(Opcode::End); // 11
        asm.op(Opcode::Exit); // 12
        let data = asm.build(1);

        // Take the second option
        let mut machine = Machine::new(Script::from_data(data.clone()).unwrap());
        let mut harness = Harness::new();
        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());

        assert!(machine.has_pending_choice());
        assert_eq!(machine.dialogue_lines().len(), 2);
        assert!(machine.dialogue_lines()[0].selected);
        assert_eq!(machine.selected_option(), Some(0));

        let serial_before = machine.dialogue_serial();
        harness.press(Button::MoveDown);
        machine.run(&mut harness.ctx());
        assert_eq!(machine.selected_option(), Some(1));
        assert!(machine.dialogue_lines()[1].selected);
        assert_ne!(machine.dialogue_serial(), serial_before);

        harness.confirm();
        machine.run(&mut harness.ctx());
        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());
        assert_eq!(machine.get_var(0), 2);

        // Take the first option: its body ends in a bare RESPONSE that
        // skips past END to the EXIT
        let mut machine = Machine::new(Script::from_data(data).unwrap());
        let mut harness = Harness::new();
        assert!(machine.jump("main"));
        harness.idle();
        machine.run(&mut harness.ctx());
        harness.confirm();
        machine.run(&mut harness.ctx());
        machine.run(&mut harness.ctx());
        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());
        assert_eq!(machine.get_var(0), 1);
    }

    #[test]
    fn test_trigger_script_runs_entry_from_variable() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Exit); // 0
        asm.label("npc");
        asm.op(Opcode::Save).imm(7); // 1,2
        asm.op(Opcode::Exit); // 3
        let mut machine = machine_for(asm, 4);
        let mut harness = Harness::new();

        machine.set_var(3, 1); // identity 3's entry address
        machine.trigger_script(3);
        assert_eq!(machine.speaker(), Some(3));

        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());
        // SAVE wrote through the speaker's slot
        assert_eq!(machine.get_var(3), 7);
    }

    #[test]
    fn test_trigger_script_noop_while_running() {
        let mut asm = Assembler::new();
        let text = asm.string("...");
        asm.label("main");
        asm.op(Opcode::Say).imm(text);
        asm.op(Opcode::Exit);
        asm.label("npc");
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 4);
        let mut harness = Harness::new();

        machine.set_var(2, 3);
        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());
        assert!(machine.is_running()); // paused on SAY

        machine.trigger_script(2);
        assert_eq!(machine.speaker(), None, "trigger while paused is a no-op");
    }

    #[test]
    fn test_trigger_script_invalid_identity() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 2);

        machine.trigger_script(-1);
        machine.trigger_script(99);
        assert!(!machine.is_running());

        // A slot holding an out-of-range address is also rejected
        machine.set_var(1, 999);
        machine.trigger_script(1);
        assert!(!machine.is_running());
    }

    #[test]
    fn test_setplayer_moves_control() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::SetPlayer).imm(2);
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 0);
        let mut harness = Harness::new();

        let mut hero = Person::new(1, Vec2::ZERO, Direction::Down);
        hero.set_player(true);
        harness.persons.push(hero);
        harness.persons.push(Person::new(2, Vec2::ZERO, Direction::Down));

        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());

        assert!(!harness.persons[0].is_player());
        assert!(harness.persons[1].is_player());
    }

    #[test]
    fn test_spawn_queues_person_relative_to_center() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Spawn).imm(5).imm(12).imm(4);
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 8);
        let mut harness = Harness::new();

        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());

        assert_eq!(harness.spawn_queue.len(), 1);
        let spawned = &harness.spawn_queue[0];
        assert_eq!(spawned.identity(), 5);
        // World is 16x16, so center is (8,8)
        let pos = spawned.position(1.0);
        assert_eq!((pos.x, pos.y), (4.0, -4.0));
        // Not yet in the live roster
        assert!(harness.persons.is_empty());
    }

    #[test]
    fn test_sprite_assigns_and_clears_parts() {
        let mut asm = Assembler::new();
        let hat = asm.string("straw_hat");
        asm.label("give");
        asm.op(Opcode::Sprite).imm(1).imm(Part::Hat as u16).imm(hat);
        asm.op(Opcode::Exit);
        asm.label("take");
        asm.op(Opcode::Sprite)
            .imm(1)
            .imm(Part::Hat as u16)
            .imm(OPERAND_NONE);
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 0);
        let mut harness = Harness::new();
        harness.sprites = SpriteCatalog::new(vec!["straw_hat".to_string()]);
        harness.persons.push(Person::new(1, Vec2::ZERO, Direction::Down));

        // Sprites compose on the person's next update
        fn composed(person: &Person, world: &World) -> Vec<crate::game::person::PartSprite> {
            let mut check = person.clone();
            check.initialize(world);
            let input = FrameInput::default();
            let config = crate::game::config::PersonConfig::default();
            let pctx = crate::game::person::PersonContext {
                abstime: 10.0,
                dt: 0.1,
                input: &input,
                world,
                neighbors: &[],
                config: &config,
            };
            check.update(&pctx);
            check.sprites().to_vec()
        }

        assert!(machine.jump("give"));
        machine.run(&mut harness.ctx());
        let sprites = composed(&harness.persons[0], &harness.world);
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].sprite, 0);

        assert!(machine.jump("take"));
        machine.run(&mut harness.ctx());
        assert!(composed(&harness.persons[0], &harness.world).is_empty());
    }

    #[test]
    fn test_malformed_operand_halts_without_panic() {
        let mut asm = Assembler::new();
        asm.label("main");
        // GOTO followed by an opcode where its operand belongs
        asm.op(Opcode::Goto).op(Opcode::Exit);
        let mut machine = machine_for(asm, 0);
        let mut harness = Harness::new();

        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());

        // The machine stays usable: a fresh jump runs again
        assert!(machine.jump("main"));
        assert!(machine.is_running());
    }

    #[test]
    fn test_reset_opcode_is_a_fault() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Reset);
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 0);
        let mut harness = Harness::new();

        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());
        assert!(!machine.is_running());
    }

    #[test]
    fn test_var_bounds_sentinel() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 2);

        machine.set_var(0, 5);
        assert_eq!(machine.get_var(0), 5);
        assert_eq!(machine.get_var(99), -1);
        assert_eq!(machine.get_var(-3), -1);
        machine.set_var(99, 1); // logged, ignored
        assert_eq!(machine.get_var(1), 0);
    }

    #[test]
    fn test_reset_clears_dialogue_keeps_vars() {
        let mut asm = Assembler::new();
        let text = asm.string("hold");
        asm.label("main");
        asm.op(Opcode::SetVar).imm(0).imm(9);
        asm.op(Opcode::Say).imm(text);
        asm.op(Opcode::Exit);
        let mut machine = machine_for(asm, 1);
        let mut harness = Harness::new();

        assert!(machine.jump("main"));
        machine.run(&mut harness.ctx());
        assert!(machine.is_running());
        assert_eq!(machine.dialogue_lines().len(), 1);

        machine.reset();
        assert!(!machine.is_running());
        assert!(machine.dialogue_lines().is_empty());
        assert_eq!(machine.get_var(0), 9);
    }
}
