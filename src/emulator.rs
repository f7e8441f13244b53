use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Flex, Layout},
    style::{Color, Style},
    widgets::{Block, Paragraph},
};
use rodio::{OutputStream, Sink, Source, source::SineWave};

use chip8::state::Key;
use chip8::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Interpreter, LoadError};

use crate::settings::Settings;

const DEFAULT_FREQUENCY: f32 = 440.0;
const BEEP_DURATION: Duration = Duration::from_millis(100);

/// Terminal lines used by the display; each line holds two pixel rows.
const SCREEN_ROWS: usize = DISPLAY_HEIGHT / 2;

const KEYPAD_HELP: &str = "\
1 2 3 4  ->  1 2 3 C
Q W E R  ->  4 5 6 D
A S D F  ->  7 8 9 E
Z X C V  ->  A 0 B F";

type Tui = Terminal<CrosstermBackend<std::io::Stdout>>;

/// Renders a row-major frame buffer as text, packing two pixel rows into
/// each line with half-block glyphs.
fn render_screen(pixels: &[u8]) -> String {
    let mut text = String::with_capacity(SCREEN_ROWS * (DISPLAY_WIDTH * 3 + 1));
    for (upper, lower) in pixels
        .chunks_exact(DISPLAY_WIDTH)
        .step_by(2)
        .zip(pixels.chunks_exact(DISPLAY_WIDTH).skip(1).step_by(2))
    {
        for (&top, &bottom) in upper.iter().zip(lower) {
            text.push(match (top, bottom) {
                (0, 0) => ' ',
                (_, 0) => '▀',
                (0, _) => '▄',
                _ => '█',
            });
        }
        text.push('\n');
    }
    text
}

pub struct Beep {
    sink: Sink,
    #[allow(dead_code)]
    stream: OutputStream,
    until: Option<Instant>,
}

impl Beep {
    pub fn new(freq: f32) -> anyhow::Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;
        let source = SineWave::new(freq).repeat_infinite();

        sink.append(source);
        sink.pause();

        Ok(Self {
            sink,
            stream,
            until: None,
        })
    }

    /// Sounds the tone for a short burst starting now.
    pub fn trigger(&mut self, now: Instant) {
        self.until = Some(now + BEEP_DURATION);
        self.sink.play();
    }

    pub fn update(&mut self, now: Instant) {
        if self.until.is_some_and(|until| now >= until) {
            self.until = None;
            self.sink.pause();
        }
    }
}

/// QWERTY layout of the hexadecimal keypad:
///
/// ```text
/// 1 2 3 4    1 2 3 C
/// Q W E R    4 5 6 D
/// A S D F    7 8 9 E
/// Z X C V    A 0 B F
/// ```
pub fn keymap(c: char) -> Option<Key> {
    match c.to_ascii_lowercase() {
        '1' => Some(Key::Key1),
        '2' => Some(Key::Key2),
        '3' => Some(Key::Key3),
        '4' => Some(Key::KeyC),
        'q' => Some(Key::Key4),
        'w' => Some(Key::Key5),
        'e' => Some(Key::Key6),
        'r' => Some(Key::KeyD),
        'a' => Some(Key::Key7),
        's' => Some(Key::Key8),
        'd' => Some(Key::Key9),
        'f' => Some(Key::KeyE),
        'z' => Some(Key::KeyA),
        'x' => Some(Key::Key0),
        'c' => Some(Key::KeyB),
        'v' => Some(Key::KeyF),
        _ => None,
    }
}

/// Leaves raw mode before anything else so the shell is usable even when
/// clearing the screen fails. The loop's own error takes precedence.
fn restore_terminal(
    result: anyhow::Result<()>,
    leave_raw_mode: impl FnOnce() -> std::io::Result<()>,
    clear: impl FnOnce() -> std::io::Result<()>,
) -> anyhow::Result<()> {
    let left_raw_mode = leave_raw_mode();
    if let Err(err) = clear() {
        log::warn!("could not clear the terminal: {err}");
    }
    result?;
    left_raw_mode.context("leaving raw mode")
}

/// Terminal host: renders the display, feeds the key latch and beeps.
pub struct Emulator {
    interpreter: Interpreter,
    beeper: Option<Beep>,
    settings: Settings,
}

impl Emulator {
    fn draw(&self, frame: &mut ratatui::Frame, rom_name: &str) {
        let [screen_row, keypad_row] = Layout::vertical([
            Constraint::Length(SCREEN_ROWS as u16 + 2),
            Constraint::Length(KEYPAD_HELP.lines().count() as u16 + 2),
        ])
        .areas(frame.area());
        let [screen_area] = Layout::horizontal([Constraint::Length(DISPLAY_WIDTH as u16 + 2)])
            .flex(Flex::Center)
            .areas(screen_row);

        let screen = Paragraph::new(render_screen(&self.interpreter.frame_buffer()))
            .block(Block::bordered().title(rom_name))
            .style(Style::default().fg(Color::White));
        frame.render_widget(screen, screen_area);

        let keypad = Paragraph::new(KEYPAD_HELP)
            .alignment(Alignment::Center)
            .block(Block::bordered().title("Keypad (Esc quits)"))
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(keypad, keypad_row);
    }

    pub fn new(settings: Settings) -> Self {
        let interpreter = match settings.seed {
            Some(seed) => Interpreter::with_seed(seed),
            None => Interpreter::new(),
        };
        let beeper = Beep::new(DEFAULT_FREQUENCY)
            .inspect_err(|err| log::warn!("audio unavailable, running silent: {err}"))
            .ok();

        Emulator {
            interpreter,
            beeper,
            settings,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let rom_stem: String = self
            .settings
            .rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown ROM".to_string());
        let rom_file = std::fs::File::open(&self.settings.rom)
            .map_err(LoadError::from)
            .with_context(|| format!("opening {}", self.settings.rom.display()))?;
        self.interpreter
            .load_program_from(std::io::BufReader::new(rom_file))
            .with_context(|| format!("loading {}", self.settings.rom.display()))?;

        enable_raw_mode()?;
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.main_loop(&mut terminal, &rom_stem);

        restore_terminal(result, disable_raw_mode, || terminal.clear())
    }

    fn main_loop(&mut self, terminal: &mut Tui, rom_stem: &str) -> anyhow::Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.settings.frame_rate as f64);
        let instructions_per_frame = self.settings.instructions_per_frame();

        // Always draw the first frame so the layout appears before the program does.
        terminal.draw(|frame| self.draw(frame, rom_stem))?;

        loop {
            let frame_start = Instant::now();

            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match key.code {
                    KeyCode::Esc => return Ok(()),
                    KeyCode::Char(c) => {
                        if let Some(key) = keymap(c) {
                            self.interpreter.set_key(key.index(), true);
                        }
                    }
                    _ => {}
                }
            }

            for _ in 0..instructions_per_frame {
                let cycle = self.interpreter.cycle().with_context(|| {
                    format!("program halted at {:#05X}", self.interpreter.pc())
                })?;
                if cycle.tone {
                    if let Some(beeper) = self.beeper.as_mut() {
                        beeper.trigger(Instant::now());
                    }
                }
            }
            if let Some(beeper) = self.beeper.as_mut() {
                beeper.update(Instant::now());
            }

            if self.interpreter.needs_redraw() {
                terminal.draw(|frame| self.draw(frame, rom_stem))?;
                self.interpreter.clear_redraw();
            }

            // Terminals do not report key releases reliably, so a key is held
            // for the frame in which it was reported.
            self.interpreter.release_all_keys();

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
    }
}
