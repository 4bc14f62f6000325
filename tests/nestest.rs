//! Replays the canonical processor test ROM against its reference log.
//!
//! The ROM exercises every official opcode and the common unofficial ones,
//! and the log records {PC, A, X, Y, P, SP, CYC} before each instruction
//! from a known-good emulator. The harness starts the ROM headlessly (the
//! automated entry point at $C000 rather than the reset vector) and asserts
//! field-for-field equality for the first 5003 instructions, which cover
//! everything up to the opcodes this core stubs out.
//!
//! The fixtures are not redistributable, so the test skips itself when
//! `tests/data/` is empty.

mod util;

use famicore::devices::cartridge::Rom;
use famicore::devices::cpu::Status;
use famicore::devices::nes::Nes;
use util::{logparse, provider};

const CHECKED_LINES: usize = 5003;

#[test]
fn nestest_reference_log() {
    let Some((rom_bytes, log)) = provider::load_fixtures() else {
        eprintln!(
            "skipping: place nestest.nes and nestest.log under tests/data/ to run the conformance test"
        );
        return;
    };
    let rom = Rom::parse(&rom_bytes).expect("nestest.nes did not parse");
    let mut nes = Nes::from_rom(&rom).expect("nestest.nes did not boot");

    // headless entry: the log starts with the CPU in test mode
    let cpu = nes.cpu_mut();
    cpu.state.pc = 0xC000;
    cpu.state.sp = 0xFD;
    cpu.state.status = Status::from_bits_truncate(0x24);
    cpu.state.cycles = 7;

    for (index, line) in log.lines().take(CHECKED_LINES).enumerate() {
        let number = index + 1;
        let expected = logparse::parse_line(line)
            .unwrap_or_else(|| panic!("unparseable log line {number}: {line:?}"));
        let snap = nes.snapshot();
        assert_eq!(snap.pc, expected.pc, "PC mismatch at line {number}");
        assert_eq!(snap.a, expected.a, "A mismatch at line {number}");
        assert_eq!(snap.x, expected.x, "X mismatch at line {number}");
        assert_eq!(snap.y, expected.y, "Y mismatch at line {number}");
        assert_eq!(snap.f, expected.f, "P mismatch at line {number}");
        assert_eq!(snap.sp, expected.sp, "SP mismatch at line {number}");
        assert_eq!(snap.cyc, expected.cyc, "CYC mismatch at line {number}");
        nes.step().expect("bus fault while replaying nestest");
    }
}
