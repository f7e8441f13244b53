//! A CHIP-8 interpreter core.
//!
//! [`Interpreter`] owns the whole machine: memory with the built-in font,
//! sixteen registers, the call stack, both timers, the 64x32 display and the
//! key latch. Hosts drive it one cycle at a time.

pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod state;

pub use error::{Chip8Error, LoadError};
pub use instruction::{Instruction, ProgramCounter, decode};
pub use interpreter::{Cycle, Interpreter};
pub use state::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_PROGRAM_SIZE, MEM_SIZE, NUM_KEYS, PC_START_ADDR, Register,
};
