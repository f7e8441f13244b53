use rand::Rng;

use crate::error::Chip8Error;
use crate::state::{
    Address, Chip8State, DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_ADDR, FONT_HEIGHT, Key, Register,
};

/// How the program counter moves once an instruction has executed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProgramCounter {
    /// Advance to the following instruction.
    Next,
    /// Step over the following instruction.
    Skip,
    /// Continue at an absolute address.
    Jump(Address),
    /// Execute the same instruction again on the next cycle.
    Stay,
}

impl ProgramCounter {
    fn skip_if(condition: bool) -> Self {
        if condition {
            ProgramCounter::Skip
        } else {
            ProgramCounter::Next
        }
    }
}

/// Every instruction form the interpreter understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump { nnn: Address },
    /// 2NNN
    Call { nnn: Address },
    /// 3XNN
    SkipEqImm { x: Register, nn: u8 },
    /// 4XNN
    SkipNeqImm { x: Register, nn: u8 },
    /// 5XY0
    SkipEqReg { x: Register, y: Register },
    /// 6XNN
    SetImm { x: Register, nn: u8 },
    /// 7XNN
    AddImm { x: Register, nn: u8 },
    /// 8XY0
    Assign { x: Register, y: Register },
    /// 8XY1
    Or { x: Register, y: Register },
    /// 8XY2
    And { x: Register, y: Register },
    /// 8XY3
    Xor { x: Register, y: Register },
    /// 8XY4
    AddReg { x: Register, y: Register },
    /// 8XY5
    SubReg { x: Register, y: Register },
    /// 8XY6
    ShiftRight { x: Register },
    /// 8XY7
    SubRegReversed { x: Register, y: Register },
    /// 8XYE
    ShiftLeft { x: Register },
    /// 9XY0
    SkipNeqReg { x: Register, y: Register },
    /// ANNN
    SetIndex { nnn: Address },
    /// BNNN
    JumpOffset { nnn: Address },
    /// CXNN
    Random { x: Register, nn: u8 },
    /// DXYN
    Draw { x: Register, y: Register, n: u8 },
    /// EX9E
    SkipIfKey { x: Register },
    /// EXA1
    SkipIfNotKey { x: Register },
    /// FX07
    GetDelay { x: Register },
    /// FX0A
    WaitKey { x: Register },
    /// FX15
    SetDelay { x: Register },
    /// FX18
    SetSound { x: Register },
    /// FX1E
    AddIndex { x: Register },
    /// FX29
    FontAddress { x: Register },
    /// FX33
    BcdStore { x: Register },
    /// FX55
    RegDump { x: Register },
    /// FX65
    RegLoad { x: Register },
}

struct Operands {
    /// First nibble. Selects the instruction group.
    opcode: u8,
    /// Second nibble. Used to look up one of the 16 registers.
    x: Register,
    /// Third nibble. Used to look up one of the 16 registers.
    y: Register,
    /// Fourth nibble. A 4-bit number.
    n: u8,
    /// The second byte (third and fourth nibbles). An 8-bit immediate number.
    nn: u8,
    /// The second, third, and fourth nibbles. A 12-bit immediate address.
    nnn: Address,
}
impl Operands {
    fn new(raw: u16) -> Self {
        Operands {
            opcode: (raw >> 12) as u8,
            x: Register::from_nibble((raw >> 8) as u8),
            y: Register::from_nibble((raw >> 4) as u8),
            n: (raw & 0x0F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}

pub fn decode(raw: u16) -> Result<Instruction, Chip8Error> {
    let Operands {
        opcode,
        x,
        y,
        n,
        nn,
        nnn,
    } = Operands::new(raw);
    let unknown = Chip8Error::Decode {
        opcode: raw,
        tone: false,
    };

    let instruction = match opcode {
        0x0 => match nnn {
            0x0E0 => Instruction::ClearScreen,
            0x0EE => Instruction::Return,
            _ => return Err(unknown),
        },
        0x1 => Instruction::Jump { nnn },
        0x2 => Instruction::Call { nnn },
        0x3 => Instruction::SkipEqImm { x, nn },
        0x4 => Instruction::SkipNeqImm { x, nn },
        0x5 => Instruction::SkipEqReg { x, y },
        0x6 => Instruction::SetImm { x, nn },
        0x7 => Instruction::AddImm { x, nn },
        0x8 => match n {
            0x0 => Instruction::Assign { x, y },
            0x1 => Instruction::Or { x, y },
            0x2 => Instruction::And { x, y },
            0x3 => Instruction::Xor { x, y },
            0x4 => Instruction::AddReg { x, y },
            0x5 => Instruction::SubReg { x, y },
            0x6 => Instruction::ShiftRight { x },
            0x7 => Instruction::SubRegReversed { x, y },
            0xE => Instruction::ShiftLeft { x },
            _ => return Err(unknown),
        },
        0x9 => Instruction::SkipNeqReg { x, y },
        0xA => Instruction::SetIndex { nnn },
        0xB => Instruction::JumpOffset { nnn },
        0xC => Instruction::Random { x, nn },
        0xD => Instruction::Draw { x, y, n },
        0xE => match nn {
            0x9E => Instruction::SkipIfKey { x },
            0xA1 => Instruction::SkipIfNotKey { x },
            _ => return Err(unknown),
        },
        _ => match nn {
            0x07 => Instruction::GetDelay { x },
            0x0A => Instruction::WaitKey { x },
            0x15 => Instruction::SetDelay { x },
            0x18 => Instruction::SetSound { x },
            0x1E => Instruction::AddIndex { x },
            0x29 => Instruction::FontAddress { x },
            0x33 => Instruction::BcdStore { x },
            0x55 => Instruction::RegDump { x },
            0x65 => Instruction::RegLoad { x },
            _ => return Err(unknown),
        },
    };
    Ok(instruction)
}

impl Instruction {
    /// Applies the instruction to `state` and reports where the program counter
    /// goes next. The program counter itself is left for the caller to move.
    ///
    /// On error nothing in `state` has been modified.
    pub fn execute<R: Rng>(
        &self,
        state: &mut Chip8State,
        rng: &mut R,
    ) -> Result<ProgramCounter, Chip8Error> {
        let regs = &mut state.registers;

        match *self {
            Instruction::ClearScreen => {
                state.clear_display();
                state.draw_flag = true;
            }
            Instruction::Return => {
                let return_address = state.stack.pop()?;
                return Ok(ProgramCounter::Jump(return_address.wrapping_add(2)));
            }
            Instruction::Jump { nnn } => return Ok(ProgramCounter::Jump(nnn)),
            Instruction::Call { nnn } => {
                state.stack.push(state.pc)?;
                return Ok(ProgramCounter::Jump(nnn));
            }
            Instruction::SkipEqImm { x, nn } => {
                return Ok(ProgramCounter::skip_if(regs.read(x) == nn));
            }
            Instruction::SkipNeqImm { x, nn } => {
                return Ok(ProgramCounter::skip_if(regs.read(x) != nn));
            }
            Instruction::SkipEqReg { x, y } => {
                return Ok(ProgramCounter::skip_if(regs.read(x) == regs.read(y)));
            }
            Instruction::SkipNeqReg { x, y } => {
                return Ok(ProgramCounter::skip_if(regs.read(x) != regs.read(y)));
            }
            Instruction::SetImm { x, nn } => regs.write(x, nn),
            Instruction::AddImm { x, nn } => regs.write(x, regs.read(x).wrapping_add(nn)),
            Instruction::Assign { x, y } => regs.write(x, regs.read(y)),
            Instruction::Or { x, y } => regs.write(x, regs.read(x) | regs.read(y)),
            Instruction::And { x, y } => regs.write(x, regs.read(x) & regs.read(y)),
            Instruction::Xor { x, y } => regs.write(x, regs.read(x) ^ regs.read(y)),
            Instruction::AddReg { x, y } => {
                let (sum, carry) = regs.read(x).overflowing_add(regs.read(y));
                regs.write(x, sum);
                regs.write(Register::FLAG, u8::from(carry));
            }
            Instruction::SubReg { x, y } => {
                let (difference, borrow) = regs.read(x).overflowing_sub(regs.read(y));
                regs.write(x, difference);
                regs.write(Register::FLAG, u8::from(!borrow));
            }
            Instruction::SubRegReversed { x, y } => {
                let (difference, borrow) = regs.read(y).overflowing_sub(regs.read(x));
                regs.write(x, difference);
                regs.write(Register::FLAG, u8::from(!borrow));
            }
            Instruction::ShiftRight { x } => {
                let value_x = regs.read(x);
                regs.write(x, value_x >> 1);
                regs.write(Register::FLAG, value_x & 0x01);
            }
            Instruction::ShiftLeft { x } => {
                let value_x = regs.read(x);
                regs.write(x, value_x << 1);
                regs.write(Register::FLAG, value_x >> 7);
            }
            Instruction::SetIndex { nnn } => state.index = nnn,
            Instruction::JumpOffset { nnn } => {
                let target = nnn.wrapping_add(u16::from(regs.read(Register::V0)));
                return Ok(ProgramCounter::Jump(target));
            }
            Instruction::Random { x, nn } => regs.write(x, rng.random::<u8>() & nn),
            Instruction::Draw { x, y, n } => {
                let pos_x = usize::from(regs.read(x)) % DISPLAY_WIDTH;
                let pos_y = usize::from(regs.read(y)) % DISPLAY_HEIGHT;
                let collision = state.draw_sprite(pos_x, pos_y, n)?;
                state.registers.write(Register::FLAG, u8::from(collision));
                state.draw_flag = true;
            }
            Instruction::SkipIfKey { x } => {
                return Ok(ProgramCounter::skip_if(is_key_down(state, x)));
            }
            Instruction::SkipIfNotKey { x } => {
                return Ok(ProgramCounter::skip_if(!is_key_down(state, x)));
            }
            Instruction::GetDelay { x } => regs.write(x, state.delay_timer),
            Instruction::WaitKey { x } => match state.keypad.first_pressed() {
                Some(key) => regs.write(x, key.index() as u8),
                None => return Ok(ProgramCounter::Stay),
            },
            Instruction::SetDelay { x } => state.delay_timer = regs.read(x),
            Instruction::SetSound { x } => state.sound_timer = regs.read(x),
            Instruction::AddIndex { x } => {
                state.index = state.index.wrapping_add(u16::from(regs.read(x)));
            }
            Instruction::FontAddress { x } => {
                state.index = (FONT_ADDR + usize::from(regs.read(x)) * FONT_HEIGHT) as Address;
            }
            Instruction::BcdStore { x } => {
                let value_x = regs.read(x);
                let bcd = [value_x / 100, (value_x / 10) % 10, value_x % 10];
                state.memory.write_slice(usize::from(state.index), &bcd)?;
            }
            Instruction::RegDump { x } => {
                state
                    .memory
                    .write_slice(usize::from(state.index), regs.range(x))?;
                state.index = state.index.wrapping_add(x.index() as u16 + 1);
            }
            Instruction::RegLoad { x } => {
                let stored = state
                    .memory
                    .read_slice(usize::from(state.index), x.index() + 1)?;
                regs.range_mut(x).copy_from_slice(stored);
                state.index = state.index.wrapping_add(x.index() as u16 + 1);
            }
        }
        Ok(ProgramCounter::Next)
    }
}

fn is_key_down(state: &Chip8State, x: Register) -> bool {
    Key::from_index(usize::from(state.registers.read(x)))
        .is_some_and(|key| state.keypad.is_key_pressed(key))
}
