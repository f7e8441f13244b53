use std::io::Read;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{Chip8Error, LoadError};
use crate::instruction::{Instruction, ProgramCounter, decode};
use crate::state::{
    Address, Chip8State, DISPLAY_HEIGHT, DISPLAY_WIDTH, Key, MAX_PROGRAM_SIZE, MEM_SIZE,
    NUM_REGISTERS, Register, Timer,
};

/// What happened during one successful call to [`Interpreter::cycle`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cycle {
    /// The instruction that was executed.
    pub instruction: Instruction,
    /// The sound timer passed through 1 this cycle; the host should beep.
    pub tone: bool,
    /// The instruction is a key wait with no key held. It runs again next cycle.
    pub waiting_for_key: bool,
}

/// A CHIP-8 virtual machine.
///
/// The host loads a program, then calls [`cycle`](Interpreter::cycle) as often
/// as it likes. Between cycles it may update the key latch and read the pixel
/// buffer; when [`needs_redraw`](Interpreter::needs_redraw) reports true the
/// buffer changed and should be presented, after which the host calls
/// [`clear_redraw`](Interpreter::clear_redraw).
pub struct Interpreter {
    state: Chip8State,
    rng: StdRng,
    seed: Option<u64>,
}

impl Interpreter {
    /// An interpreter whose random-byte instruction draws from OS entropy.
    pub fn new() -> Self {
        Interpreter {
            state: Chip8State::new(),
            rng: seeded_rng(None),
            seed: None,
        }
    }

    /// An interpreter whose random-byte instruction replays the same sequence
    /// after every reset.
    pub fn with_seed(seed: u64) -> Self {
        Interpreter {
            state: Chip8State::new(),
            rng: seeded_rng(Some(seed)),
            seed: Some(seed),
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.rng = seeded_rng(self.seed);
    }

    /// Resets the machine and copies `program` to 0x200.
    ///
    /// An oversized program is rejected and the machine stays freshly reset.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.reset();
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::TooLarge {
                size: program.len(),
                max: MAX_PROGRAM_SIZE,
            }
            .into());
        }
        self.state.memory.load_program(program)?;
        log::info!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Like [`load_program`](Interpreter::load_program), reading the program
    /// from `reader` until it is exhausted.
    pub fn load_program_from<R: Read>(&mut self, reader: R) -> Result<(), Chip8Error> {
        self.reset();
        let mut program = Vec::with_capacity(MAX_PROGRAM_SIZE);
        reader
            .take(MAX_PROGRAM_SIZE as u64 + 1)
            .read_to_end(&mut program)
            .map_err(LoadError::from)?;
        self.load_program(&program)
    }

    fn fetch(&self) -> Result<u16, Chip8Error> {
        let pc = usize::from(self.state.pc);
        let high_byte = u16::from(self.state.memory.read(pc)?);
        let low_byte = u16::from(self.state.memory.read(pc + 1)?);

        Ok((high_byte << 8) | low_byte)
    }

    /// Fetches, decodes and executes one instruction, then ticks the timers.
    ///
    /// An unknown instruction leaves the program counter in place but still
    /// ticks the timers; the returned error carries the tone signal for that
    /// tick. Any other error leaves the machine untouched.
    pub fn cycle(&mut self) -> Result<Cycle, Chip8Error> {
        let pc = self.state.pc;
        let opcode = self.fetch().inspect_err(|err| log::error!("fetch at {pc:#05X}: {err}"))?;

        let instruction = match decode(opcode) {
            Ok(instruction) => instruction,
            Err(Chip8Error::Decode { opcode, .. }) => {
                log::warn!("unknown instruction {opcode:#06X} at {pc:#05X}");
                let tone = self.tick_timers();
                return Err(Chip8Error::Decode { opcode, tone });
            }
            Err(err) => return Err(err),
        };
        log::trace!("{pc:#05X}: {opcode:04X} {instruction:?}");

        let next = instruction
            .execute(&mut self.state, &mut self.rng)
            .inspect_err(|err| log::error!("{instruction:?} at {pc:#05X}: {err}"))?;

        self.state.pc = match next {
            ProgramCounter::Next => pc.wrapping_add(2),
            ProgramCounter::Skip => pc.wrapping_add(4),
            ProgramCounter::Jump(target) => target,
            ProgramCounter::Stay => pc,
        };
        let tone = self.tick_timers();

        Ok(Cycle {
            instruction,
            tone,
            waiting_for_key: next == ProgramCounter::Stay,
        })
    }

    /// Counts both timers down by one. Returns true when the sound timer
    /// expires on this tick.
    fn tick_timers(&mut self) -> bool {
        if self.state.delay_timer > 0 {
            self.state.delay_timer -= 1;
        }

        let mut tone = false;
        if self.state.sound_timer > 0 {
            if self.state.sound_timer == 1 {
                log::debug!("tone");
                tone = true;
            }
            self.state.sound_timer -= 1;
        }
        tone
    }

    /// Updates the key latch. Indices outside 0..16 are ignored.
    pub fn set_key(&mut self, index: usize, pressed: bool) {
        let Some(key) = Key::from_index(index) else {
            log::warn!("ignoring key index {index}");
            return;
        };
        if pressed {
            self.state.keypad.press_key(key);
        } else {
            self.state.keypad.release_key(key);
        }
    }

    pub fn release_all_keys(&mut self) {
        self.state.keypad.release_all();
    }

    pub fn is_key_pressed(&self, index: usize) -> bool {
        Key::from_index(index).is_some_and(|key| self.state.keypad.is_key_pressed(key))
    }

    pub fn needs_redraw(&self) -> bool {
        self.state.draw_flag
    }

    pub fn clear_redraw(&mut self) {
        self.state.draw_flag = false;
    }

    /// 1 if the pixel at `(x, y)` is lit, otherwise 0. Coordinates wrap.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        u8::from(self.state.pixel(x, y))
    }

    /// The whole display, row-major, one byte per pixel.
    pub fn frame_buffer(&self) -> Vec<u8> {
        self.state
            .display
            .iter()
            .by_vals()
            .take(DISPLAY_WIDTH * DISPLAY_HEIGHT)
            .map(u8::from)
            .collect()
    }

    pub fn pc(&self) -> Address {
        self.state.pc
    }

    pub fn index(&self) -> Address {
        self.state.index
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.state.registers.read(reg)
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        self.state.registers.as_array()
    }

    pub fn stack_pointer(&self) -> usize {
        self.state.stack.pointer()
    }

    pub fn delay_timer(&self) -> Timer {
        self.state.delay_timer
    }

    pub fn sound_timer(&self) -> Timer {
        self.state.sound_timer
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        self.state.memory.as_bytes()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
