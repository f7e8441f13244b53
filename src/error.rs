use thiserror::Error;

/// Failure to place a program into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program is too large ({size} bytes), at most {max} bytes fit above 0x200")]
    TooLarge { size: usize, max: usize },

    #[error("program source could not be read: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// Everything a single interpreter operation can report back to the host.
///
/// None of these are fatal to the process. `Decode` is informational: the
/// cycle still ticks the timers but leaves the program counter where it was,
/// and `tone` reports whether the sound timer expired on that tick.
/// The remaining variants reject the cycle without touching any state.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("unknown instruction: {opcode:#06X}")]
    Decode { opcode: u16, tone: bool },

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("stack overflow: more than 16 nested calls")]
    StackOverflow,

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },
}
