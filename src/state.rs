use bitvec::{BitArr, array::BitArray};

use crate::error::Chip8Error;

pub type Timer = u8;
pub type Address = u16;

pub const MEM_SIZE: usize = 4096;
pub const FONT_ADDR: usize = 0x000;
pub const FONT_HEIGHT: usize = 5;
pub const PC_START_ADDR: Address = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - PC_START_ADDR as usize;
pub const NUM_REGISTERS: usize = 16;
pub const NUM_KEYS: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const TIMER_START: Timer = 60;

pub const FONT_SET: [u8; 16 * FONT_HEIGHT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub struct Memory {
    data: [u8; MEM_SIZE],
}
impl Memory {
    pub fn new() -> Self {
        let data = {
            let mut data = [0; MEM_SIZE];
            data[FONT_ADDR..FONT_ADDR + FONT_SET.len()].copy_from_slice(&FONT_SET);
            data
        };

        Memory { data }
    }

    pub fn read(&self, addr: usize) -> Result<u8, Chip8Error> {
        self.data
            .get(addr)
            .copied()
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), Chip8Error> {
        let cell = self
            .data
            .get_mut(addr)
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })?;
        *cell = value;
        Ok(())
    }

    /// Borrows `len` bytes starting at `addr`, failing if any of them lies past the end.
    pub fn read_slice(&self, addr: usize, len: usize) -> Result<&[u8], Chip8Error> {
        let end = Self::check_range(addr, len)?;
        Ok(&self.data[addr..end])
    }

    /// Copies `bytes` to `addr`. Nothing is written unless the whole range fits.
    pub fn write_slice(&mut self, addr: usize, bytes: &[u8]) -> Result<(), Chip8Error> {
        let end = Self::check_range(addr, bytes.len())?;
        self.data[addr..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Places a program at 0x200. The caller is expected to have checked the size.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.write_slice(usize::from(PC_START_ADDR), program)
    }

    pub fn as_bytes(&self) -> &[u8; MEM_SIZE] {
        &self.data
    }

    fn check_range(addr: usize, len: usize) -> Result<usize, Chip8Error> {
        let end = addr.saturating_add(len);
        if end > MEM_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds {
                address: addr.max(MEM_SIZE),
            });
        }
        Ok(end)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}
impl Register {
    /// The carry, borrow and collision flag.
    pub const FLAG: Register = Register::VF;

    /// Maps the low four bits of `nibble` onto a register.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x0 => Register::V0,
            0x1 => Register::V1,
            0x2 => Register::V2,
            0x3 => Register::V3,
            0x4 => Register::V4,
            0x5 => Register::V5,
            0x6 => Register::V6,
            0x7 => Register::V7,
            0x8 => Register::V8,
            0x9 => Register::V9,
            0xA => Register::VA,
            0xB => Register::VB,
            0xC => Register::VC,
            0xD => Register::VD,
            0xE => Register::VE,
            _ => Register::VF,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}
impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    /// Registers `V0` through `last`, inclusive.
    pub fn range(&self, last: Register) -> &[u8] {
        &self.registers[..=last.index()]
    }

    pub fn range_mut(&mut self, last: Register) -> &mut [u8] {
        &mut self.registers[..=last.index()]
    }

    pub fn as_array(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Return addresses of active subroutine calls. Holds at most `STACK_DEPTH` entries.
pub struct CallStack {
    slots: [Address; STACK_DEPTH],
    sp: usize,
}
impl CallStack {
    pub fn new() -> Self {
        CallStack {
            slots: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn push(&mut self, addr: Address) -> Result<(), Chip8Error> {
        let slot = self.slots.get_mut(self.sp).ok_or(Chip8Error::StackOverflow)?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Address, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.slots[self.sp])
    }

    pub fn is_full(&self) -> bool {
        self.sp == STACK_DEPTH
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    pub fn pointer(&self) -> usize {
        self.sp
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
}
impl Key {
    pub const ALL: [Key; NUM_KEYS] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
        Key::KeyA,
        Key::KeyB,
        Key::KeyC,
        Key::KeyD,
        Key::KeyE,
        Key::KeyF,
    ];

    pub fn from_index(index: usize) -> Option<Key> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The 16-key latch. Written by the host, only read by instructions.
pub struct Keypad {
    pressed: [bool; NUM_KEYS],
}
impl Keypad {
    pub fn new() -> Self {
        Keypad {
            pressed: [false; NUM_KEYS],
        }
    }

    pub fn press_key(&mut self, key: Key) {
        self.pressed[key.index()] = true;
    }

    pub fn release_key(&mut self, key: Key) {
        self.pressed[key.index()] = false;
    }

    pub fn release_all(&mut self) {
        self.pressed = [false; NUM_KEYS];
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed[key.index()]
    }

    /// Lowest-indexed key currently held down.
    pub fn first_pressed(&self) -> Option<Key> {
        Key::ALL.into_iter().find(|&key| self.is_key_pressed(key))
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Chip8State {
    pub memory: Memory,
    pub registers: RegisterBank,
    pub pc: Address,
    pub index: Address,
    pub stack: CallStack,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    pub display: BitArr!(for DISPLAY_WIDTH * DISPLAY_HEIGHT),
    pub keypad: Keypad,
    pub draw_flag: bool,
}
impl Chip8State {
    pub fn new() -> Self {
        Chip8State {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PC_START_ADDR,
            index: 0,
            stack: CallStack::new(),
            delay_timer: TIMER_START,
            sound_timer: TIMER_START,
            display: BitArray::ZERO,
            keypad: Keypad::new(),
            draw_flag: false,
        }
    }

    /// Reinitialises memory, registers, stack, display and timers. The key
    /// latch belongs to the host and is left alone.
    pub fn reset(&mut self) {
        self.memory = Memory::new();
        self.registers = RegisterBank::new();
        self.pc = PC_START_ADDR;
        self.index = 0;
        self.stack = CallStack::new();
        self.delay_timer = TIMER_START;
        self.sound_timer = TIMER_START;
        self.display = BitArray::ZERO;
        self.draw_flag = false;
    }

    pub fn clear_display(&mut self) {
        self.display.fill(false);
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.display[(y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)]
    }

    /// XORs the `rows`-byte sprite at the index register onto the display with
    /// its top-left corner at `(x, y)`. Coordinates wrap around both edges.
    /// Returns whether any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: u8) -> Result<bool, Chip8Error> {
        let mut collision = false;
        let sprite = self
            .memory
            .read_slice(usize::from(self.index), usize::from(rows))?;

        for (row, &byte) in sprite.iter().enumerate() {
            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }

                let pixel_x = (x + bit) % DISPLAY_WIDTH;
                let pixel_y = (y + row) % DISPLAY_HEIGHT;
                let index = pixel_y * DISPLAY_WIDTH + pixel_x;
                let current_pixel = self.display[index];

                if current_pixel {
                    collision = true;
                }
                self.display.set(index, !current_pixel);
            }
        }
        Ok(collision)
    }
}

impl Default for Chip8State {
    fn default() -> Self {
        Self::new()
    }
}
