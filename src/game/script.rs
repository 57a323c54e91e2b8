//! Script Program
//!
//! Immutable bytecode container for the dialogue/cutscene machine:
//! a label table, a text blob of NUL-terminated strings, and a packed
//! array of 16-bit words. Words with the top bit set are opcodes,
//! words with it clear are operands. The packed encoding is the wire
//! format; all access goes through [`ProgramReader`], a bounds-checked
//! cursor, never raw indexing.

use tracing::error;

use crate::game::assets::{AssetError, ScriptData};

/// Bit marking a word as an opcode rather than an operand.
pub const OPCODE_BIT: u16 = 0x8000;

/// Operand value standing in for "none".
pub const OPERAND_NONE: u16 = 0x7fff;

/// Script opcodes. The discriminants are the wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    /// Marker closing a response block; halts when executed directly.
    End = 0,
    /// Halt the machine.
    Exit = 1,
    /// Screen fade placeholder; operand is a duration in ticks.
    Fade = 2,
    /// Unconditional jump to an operand address.
    Goto = 3,
    /// Present the following response options as a choice.
    Input = 4,
    /// Reserved; executing it is a fault.
    Reset = 5,
    /// Response option marker; bare execution skips to the next END.
    Response = 6,
    /// Store an operand value into the active speaker's variable.
    Save = 7,
    /// Display a text string and wait for acknowledgment.
    Say = 8,
    /// Hand player control to the entity named by the operand.
    SetPlayer = 9,
    /// Store an operand value into an operand variable slot.
    SetVar = 10,
    /// Spawn a person at operand coordinates.
    Spawn = 11,
    /// Reassign one appearance slot of a named entity.
    Sprite = 12,
}

const OPCODE_COUNT: u16 = 13;

impl Opcode {
    /// Decode a wire code (the word with the opcode bit stripped).
    pub fn from_code(code: u16) -> Option<Opcode> {
        if code >= OPCODE_COUNT {
            return None;
        }
        Some(match code {
            0 => Opcode::End,
            1 => Opcode::Exit,
            2 => Opcode::Fade,
            3 => Opcode::Goto,
            4 => Opcode::Input,
            5 => Opcode::Reset,
            6 => Opcode::Response,
            7 => Opcode::Save,
            8 => Opcode::Say,
            9 => Opcode::SetPlayer,
            10 => Opcode::SetVar,
            11 => Opcode::Spawn,
            _ => Opcode::Sprite,
        })
    }

    /// The packed word encoding this opcode.
    #[inline]
    pub fn word(self) -> u16 {
        OPCODE_BIT | self as u16
    }
}

/// An immutable, validated script program.
#[derive(Clone, Debug, Default)]
pub struct Script {
    labels: Vec<(String, u16)>,
    text: Vec<u8>,
    program: Vec<u16>,
    var_count: usize,
}

impl Script {
    /// Validate decoded script tables and build the program.
    pub fn from_data(data: ScriptData) -> Result<Script, AssetError> {
        if data.labels.is_empty() {
            return Err(AssetError::Script("no labels"));
        }
        if data.program.is_empty() {
            return Err(AssetError::Script("empty program"));
        }
        if data
            .labels
            .iter()
            .any(|&(_, pos)| pos as usize >= data.program.len())
        {
            return Err(AssetError::Script("label out of range"));
        }
        if data.text.is_empty() || *data.text.last().unwrap_or(&1) != 0 {
            return Err(AssetError::Script("text blob not NUL-terminated"));
        }
        if std::str::from_utf8(&data.text).is_err() {
            return Err(AssetError::Script("text blob not UTF-8"));
        }

        Ok(Script {
            labels: data.labels,
            text: data.text,
            program: data.program,
            var_count: data.var_count,
        })
    }

    /// Program counter for a named label.
    pub fn get_label(&self, name: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|&(_, pos)| pos as usize)
    }

    /// String starting at a text-blob offset. Invalid offsets log an
    /// error and return None.
    pub fn get_text(&self, index: usize) -> Option<&str> {
        if index + 1 >= self.text.len() {
            error!("invalid text index: {}", index);
            return None;
        }
        let tail = &self.text[index..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).ok()
    }

    /// The packed instruction words.
    pub fn program(&self) -> &[u16] {
        &self.program
    }

    /// Number of script-visible variables.
    pub fn var_count(&self) -> usize {
        self.var_count
    }
}

/// Bounds-checked cursor over a script's instruction words.
///
/// Every fetch validates the program counter; a violation logs an
/// error and leaves the reader halted, which the machine observes as
/// a recoverable fault.
pub struct ProgramReader<'a> {
    program: &'a [u16],
    pc: Option<usize>,
    last_opcode: Option<Opcode>,
}

impl<'a> ProgramReader<'a> {
    /// Start a reader at the given program counter.
    pub fn new(script: &'a Script, pc: usize) -> Self {
        let program = script.program();
        if pc >= program.len() {
            error!("invalid program counter: ${:04x}", pc);
            return Self {
                program,
                pc: None,
                last_opcode: None,
            };
        }
        Self {
            program,
            pc: Some(pc),
            last_opcode: None,
        }
    }

    /// Has the reader stopped (end of program or fault)?
    pub fn is_halted(&self) -> bool {
        self.pc.is_none()
    }

    /// Current program counter, if not halted.
    pub fn pc(&self) -> Option<usize> {
        self.pc
    }

    /// Fetch the next word as an opcode.
    pub fn opcode(&mut self) -> Option<Opcode> {
        let word = self.fetch()?;
        if word & OPCODE_BIT == 0 {
            self.fault("expected opcode");
            return None;
        }
        match Opcode::from_code(word & !OPCODE_BIT) {
            Some(op) => {
                self.last_opcode = Some(op);
                Some(op)
            }
            None => {
                self.fault("invalid opcode");
                None
            }
        }
    }

    /// Fetch the next word as an operand.
    pub fn imm(&mut self) -> Option<u16> {
        let word = self.fetch()?;
        if word & OPCODE_BIT != 0 {
            self.fault("expected operand");
            return None;
        }
        Some(word)
    }

    /// Jump to an absolute address.
    pub fn jump(&mut self, addr: usize) {
        if addr >= self.program.len() {
            error!("invalid jump: ${:04x}", addr);
            self.pc = None;
        } else {
            self.pc = Some(addr);
        }
    }

    /// Stop executing.
    pub fn halt(&mut self) {
        self.pc = None;
    }

    /// Index of the next END marker word at or after the cursor.
    pub fn find_end(&self) -> Option<usize> {
        let pc = self.pc?;
        let end_word = Opcode::End.word();
        self.program[pc..]
            .iter()
            .position(|&w| w == end_word)
            .map(|offset| pc + offset)
    }

    /// Record a fault: log with context and halt the reader.
    pub fn fault(&mut self, msg: &str) {
        let at = self.pc.map_or(0, |pc| pc.saturating_sub(1));
        match self.last_opcode {
            Some(op) => error!("${:04x}: {} (after {:?})", at, msg, op),
            None => error!("${:04x}: {}", at, msg),
        }
        self.pc = None;
    }

    fn fetch(&mut self) -> Option<u16> {
        let pc = self.pc?;
        if pc >= self.program.len() {
            error!("invalid program counter: ${:04x}", pc);
            self.pc = None;
            return None;
        }
        self.pc = Some(pc + 1);
        Some(self.program[pc])
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================


// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::testutil::Assembler;
    use super::*;

    fn simple_script() -> Script {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Goto).imm(2);
        asm.label("tail");
        asm.op(Opcode::Exit);
        Script::from_data(asm.build(4)).unwrap()
    }

    #[test]
    fn test_label_lookup() {
        let script = simple_script();
        assert_eq!(script.get_label("main"), Some(0));
        assert_eq!(script.get_label("tail"), Some(2));
        assert_eq!(script.get_label("nope"), None);
    }

    #[test]
    fn test_text_lookup() {
        let mut asm = Assembler::new();
        asm.label("main");
        let hello = asm.string("Hello");
        let world = asm.string("world");
        asm.op(Opcode::Exit);
        let script = Script::from_data(asm.build(0)).unwrap();

        assert_eq!(script.get_text(hello as usize), Some("Hello"));
        assert_eq!(script.get_text(world as usize), Some("world"));
        // Mid-string offsets read the suffix
        assert_eq!(script.get_text(hello as usize + 1), Some("ello"));
        // Past the final NUL
        assert_eq!(script.get_text(1000), None);
    }

    #[test]
    fn test_from_data_rejects_bad_tables() {
        // Label past the end of the program
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Exit);
        let mut data = asm.build(0);
        data.labels.push(("bad".to_string(), 99));
        assert!(Script::from_data(data).is_err());

        // Missing terminator on the text blob
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Exit);
        let mut data = asm.build(0);
        data.text = b"unterminated".to_vec();
        assert!(Script::from_data(data).is_err());

        // No labels at all
        let asm = Assembler::new();
        let mut data = asm.build(0);
        data.program.push(Opcode::Exit.word());
        assert!(Script::from_data(data).is_err());
    }

    #[test]
    fn test_reader_fetch_sequence() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Fade).imm(30);
        asm.op(Opcode::Exit);
        let script = Script::from_data(asm.build(0)).unwrap();

        let mut reader = ProgramReader::new(&script, 0);
        assert_eq!(reader.opcode(), Some(Opcode::Fade));
        assert_eq!(reader.imm(), Some(30));
        assert_eq!(reader.opcode(), Some(Opcode::Exit));
        assert_eq!(reader.pc(), Some(3));
    }

    #[test]
    fn test_reader_rejects_operand_as_opcode() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.imm(5); // bare operand where an opcode belongs
        let script = Script::from_data(asm.build(0)).unwrap();

        let mut reader = ProgramReader::new(&script, 0);
        assert_eq!(reader.opcode(), None);
        assert!(reader.is_halted());
    }

    #[test]
    fn test_reader_rejects_opcode_as_operand() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Goto).op(Opcode::Exit);
        let script = Script::from_data(asm.build(0)).unwrap();

        let mut reader = ProgramReader::new(&script, 0);
        assert_eq!(reader.opcode(), Some(Opcode::Goto));
        assert_eq!(reader.imm(), None);
        assert!(reader.is_halted());
    }

    #[test]
    fn test_reader_rejects_unknown_opcode() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.raw(OPCODE_BIT | 999);
        let script = Script::from_data(asm.build(0)).unwrap();

        let mut reader = ProgramReader::new(&script, 0);
        assert_eq!(reader.opcode(), None);
        assert!(reader.is_halted());
    }

    #[test]
    fn test_reader_runs_off_end() {
        let mut asm = Assembler::new();
        asm.label("main");
        asm.op(Opcode::Fade).imm(1);
        let script = Script::from_data(asm.build(0)).unwrap();

        let mut reader = ProgramReader::new(&script, 0);
        reader.opcode();
        reader.imm();
        // Next fetch is past the end: fault, not panic
        assert_eq!(reader.opcode(), None);
        assert!(reader.is_halted());
    }

    #[test]
    fn test_reader_invalid_start_and_jump() {
        let script = simple_script();
        let reader = ProgramReader::new(&script, 999);
        assert!(reader.is_halted());

        let mut reader = ProgramReader::new(&script, 0);
        reader.jump(999);
        assert!(reader.is_halted());
    }

    #[test]
    fn test_find_end_scans_words_not_operands() {
        let mut asm = Assembler::new();
        asm.label("main");
        // An operand numerically equal to END's code must not match
        asm.op(Opcode::Fade).imm(Opcode::End as u16);
        asm.op(Opcode::End);
        let script = Script::from_data(asm.build(0)).unwrap();

        let reader = ProgramReader::new(&script, 0);
        assert_eq!(reader.find_end(), Some(2));
    }
}
