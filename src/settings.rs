use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u64 = 700;

/// Run a CHIP-8 program in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Settings {
    /// Path to the program image
    pub rom: PathBuf,

    /// Display refreshes per second
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE, value_parser = clap::value_parser!(u64).range(1..))]
    pub frame_rate: u64,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    pub ips: u64,

    /// Seed for the random-byte instruction, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Settings {
    pub fn instructions_per_frame(&self) -> u64 {
        (self.ips / self.frame_rate).max(1)
    }
}
