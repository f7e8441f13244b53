use chip8::{Chip8Error, Interpreter, PC_START_ADDR, Register};

fn boot(program: &[u8]) -> Interpreter {
    let mut interpreter = Interpreter::with_seed(0x5EED);
    interpreter.load_program(program).unwrap();
    interpreter
}

#[test]
fn add_two_registers() {
    let mut interpreter = boot(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x14]);
    for _ in 0..3 {
        interpreter.cycle().unwrap();
    }
    assert_eq!(interpreter.register(Register::V0), 8);
    assert_eq!(interpreter.register(Register::VF), 0);
    assert_eq!(interpreter.pc(), 0x206);
}

#[test]
fn call_then_return() {
    let mut program = vec![0u8; 10];
    program[..2].copy_from_slice(&[0x22, 0x08]);
    program[8..].copy_from_slice(&[0x00, 0xEE]);
    let mut interpreter = boot(&program);

    interpreter.cycle().unwrap();
    assert_eq!(interpreter.pc(), 0x208);
    assert_eq!(interpreter.stack_pointer(), 1);

    interpreter.cycle().unwrap();
    assert_eq!(interpreter.stack_pointer(), 0);
    // return resumes after the call instruction
    assert_eq!(interpreter.pc(), PC_START_ADDR + 2);
}

#[test]
fn bcd_of_157() {
    // V3 = 157, I = 0x300, BCD V3, load V0..V2
    let mut interpreter = boot(&[0x63, 157, 0xA3, 0x00, 0xF3, 0x33, 0xF2, 0x65]);
    for _ in 0..4 {
        interpreter.cycle().unwrap();
    }
    assert_eq!(&interpreter.memory()[0x300..0x303], &[1, 5, 7]);
    assert_eq!(&interpreter.registers()[..3], &[1, 5, 7]);
    assert_eq!(interpreter.index(), 0x303);
}

#[test]
fn dump_then_load_keeps_registers() {
    let mut interpreter = boot(&[
        0x60, 0x11, // V0 = 0x11
        0x61, 0x22, // V1 = 0x22
        0x62, 0x33, // V2 = 0x33
        0xA4, 0x00, // I = 0x400
        0xF2, 0x55, // dump V0..V2
        0xA4, 0x00, // I = 0x400
        0xF2, 0x65, // load V0..V2
    ]);
    for _ in 0..7 {
        interpreter.cycle().unwrap();
    }
    assert_eq!(&interpreter.registers()[..3], &[0x11, 0x22, 0x33]);
    assert_eq!(interpreter.index(), 0x403);
}

#[test]
fn drawing_twice_erases_and_reports_collision() {
    // I = glyph "8", draw at (V0, V1) twice
    let mut interpreter = boot(&[0x60, 0x0A, 0x61, 0x04, 0xA0, 0x28, 0xD0, 0x15, 0xD0, 0x15]);
    for _ in 0..4 {
        interpreter.cycle().unwrap();
    }
    assert_eq!(interpreter.register(Register::VF), 0);
    assert!(interpreter.frame_buffer().contains(&1));
    interpreter.clear_redraw();

    interpreter.cycle().unwrap();
    assert_eq!(interpreter.register(Register::VF), 1);
    assert!(interpreter.needs_redraw());
    assert!(interpreter.frame_buffer().iter().all(|&p| p == 0));
}

#[test]
fn key_wait_blocks_until_a_key_arrives() {
    let mut interpreter = boot(&[0xF4, 0x0A, 0x12, 0x02]);
    for _ in 0..10 {
        let cycle = interpreter.cycle().unwrap();
        assert!(cycle.waiting_for_key);
        assert_eq!(interpreter.pc(), PC_START_ADDR);
    }

    interpreter.set_key(0xA, true);
    interpreter.cycle().unwrap();
    assert_eq!(interpreter.pc(), PC_START_ADDR + 2);
    assert_eq!(interpreter.register(Register::V4), 0xA);

    interpreter.cycle().unwrap();
    assert_eq!(interpreter.pc(), PC_START_ADDR + 2);
}

#[test]
fn host_can_continue_after_a_decode_error() {
    let mut interpreter = boot(&[0xE0, 0x00, 0x60, 0x01]);
    assert!(matches!(
        interpreter.cycle(),
        Err(Chip8Error::Decode { opcode: 0xE000, .. })
    ));
    assert_eq!(interpreter.pc(), PC_START_ADDR);

    interpreter.reset();
    interpreter.load_program(&[0x60, 0x01]).unwrap();
    interpreter.cycle().unwrap();
    assert_eq!(interpreter.register(Register::V0), 1);
}
