mod emulator;
mod settings;

use clap::Parser;

use crate::emulator::Emulator;
use crate::settings::Settings;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Off)
        .filter_module("chip8", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let settings = Settings::parse();
    let mut emulator = Emulator::new(settings);

    emulator.run()?;

    Ok(())
}
