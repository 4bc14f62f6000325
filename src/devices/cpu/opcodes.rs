//! The 256-entry instruction table.
//!
//! One row per opcode value: mnemonic, addressing mode, base cycle count and
//! the handler, stored as plain data so decode is a single index. Base
//! counts for stores and read-modify-write forms already include their
//! worst-case bus activity; pure reads pay page-cross penalties on top.
//! Every slot is populated, so decoding can never fault: the halt-class and
//! analog-quirk opcodes point at the no-op stub handler.

use super::cpu::Cpu;
use super::structs::{AddrMode, Mnemonic};
use crate::error::EmuError;

/// Handler signature. The return value reports a taken branch.
pub type Handler = fn(&mut Cpu) -> Result<bool, EmuError>;

pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
    pub cycles: u32,
    pub exec: Handler,
}

macro_rules! op {
    ($mnemonic:ident, $mode:ident, $cycles:expr, $handler:ident) => {
        Opcode {
            mnemonic: Mnemonic::$mnemonic,
            mode: AddrMode::$mode,
            cycles: $cycles,
            exec: Cpu::$handler,
        }
    };
}

#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // $0x
    op!(BRK, Implied, 7, brk),
    op!(ORA, IndexedIndirectX, 6, ora),
    op!(KIL, Implied, 6, unmodelled),
    op!(SLO, IndexedIndirectX, 8, slo),
    op!(NOP, ZeroPage, 3, nop),
    op!(ORA, ZeroPage, 3, ora),
    op!(ASL, ZeroPage, 5, asl),
    op!(SLO, ZeroPage, 5, slo),
    op!(PHP, Implied, 3, php),
    op!(ORA, Immediate, 2, ora),
    op!(ASL, Accumulator, 2, asl),
    op!(ANC, Immediate, 2, unmodelled),
    op!(NOP, Absolute, 4, nop),
    op!(ORA, Absolute, 4, ora),
    op!(ASL, Absolute, 6, asl),
    op!(SLO, Absolute, 6, slo),
    // $1x
    op!(BPL, Relative, 2, bpl),
    op!(ORA, IndirectIndexedY, 5, ora),
    op!(KIL, Implied, 6, unmodelled),
    op!(SLO, IndirectIndexedY, 8, slo),
    op!(NOP, ZeroPageX, 4, nop),
    op!(ORA, ZeroPageX, 4, ora),
    op!(ASL, ZeroPageX, 6, asl),
    op!(SLO, ZeroPageX, 6, slo),
    op!(CLC, Implied, 2, clc),
    op!(ORA, AbsoluteY, 4, ora),
    op!(NOP, Implied, 2, nop),
    op!(SLO, AbsoluteY, 7, slo),
    op!(NOP, AbsoluteX, 4, nop),
    op!(ORA, AbsoluteX, 4, ora),
    op!(ASL, AbsoluteX, 7, asl),
    op!(SLO, AbsoluteX, 7, slo),
    // $2x
    op!(JSR, Absolute, 6, jsr),
    op!(AND, IndexedIndirectX, 6, and),
    op!(KIL, Implied, 6, unmodelled),
    op!(RLA, IndexedIndirectX, 8, rla),
    op!(BIT, ZeroPage, 3, bit),
    op!(AND, ZeroPage, 3, and),
    op!(ROL, ZeroPage, 5, rol),
    op!(RLA, ZeroPage, 5, rla),
    op!(PLP, Implied, 4, plp),
    op!(AND, Immediate, 2, and),
    op!(ROL, Accumulator, 2, rol),
    op!(ANC, Immediate, 2, unmodelled),
    op!(BIT, Absolute, 4, bit),
    op!(AND, Absolute, 4, and),
    op!(ROL, Absolute, 6, rol),
    op!(RLA, Absolute, 6, rla),
    // $3x
    op!(BMI, Relative, 2, bmi),
    op!(AND, IndirectIndexedY, 5, and),
    op!(KIL, Implied, 6, unmodelled),
    op!(RLA, IndirectIndexedY, 8, rla),
    op!(NOP, ZeroPageX, 4, nop),
    op!(AND, ZeroPageX, 4, and),
    op!(ROL, ZeroPageX, 6, rol),
    op!(RLA, ZeroPageX, 6, rla),
    op!(SEC, Implied, 2, sec),
    op!(AND, AbsoluteY, 4, and),
    op!(NOP, Implied, 2, nop),
    op!(RLA, AbsoluteY, 7, rla),
    op!(NOP, AbsoluteX, 4, nop),
    op!(AND, AbsoluteX, 4, and),
    op!(ROL, AbsoluteX, 7, rol),
    op!(RLA, AbsoluteX, 7, rla),
    // $4x
    op!(RTI, Implied, 6, rti),
    op!(EOR, IndexedIndirectX, 6, eor),
    op!(KIL, Implied, 6, unmodelled),
    op!(SRE, IndexedIndirectX, 8, sre),
    op!(NOP, ZeroPage, 3, nop),
    op!(EOR, ZeroPage, 3, eor),
    op!(LSR, ZeroPage, 5, lsr),
    op!(SRE, ZeroPage, 5, sre),
    op!(PHA, Implied, 3, pha),
    op!(EOR, Immediate, 2, eor),
    op!(LSR, Accumulator, 2, lsr),
    op!(ALR, Immediate, 2, unmodelled),
    op!(JMP, Absolute, 3, jmp),
    op!(EOR, Absolute, 4, eor),
    op!(LSR, Absolute, 6, lsr),
    op!(SRE, Absolute, 6, sre),
    // $5x
    op!(BVC, Relative, 2, bvc),
    op!(EOR, IndirectIndexedY, 5, eor),
    op!(KIL, Implied, 6, unmodelled),
    op!(SRE, IndirectIndexedY, 8, sre),
    op!(NOP, ZeroPageX, 4, nop),
    op!(EOR, ZeroPageX, 4, eor),
    op!(LSR, ZeroPageX, 6, lsr),
    op!(SRE, ZeroPageX, 6, sre),
    op!(CLI, Implied, 2, cli),
    op!(EOR, AbsoluteY, 4, eor),
    op!(NOP, Implied, 2, nop),
    op!(SRE, AbsoluteY, 7, sre),
    op!(NOP, AbsoluteX, 4, nop),
    op!(EOR, AbsoluteX, 4, eor),
    op!(LSR, AbsoluteX, 7, lsr),
    op!(SRE, AbsoluteX, 7, sre),
    // $6x
    op!(RTS, Implied, 6, rts),
    op!(ADC, IndexedIndirectX, 6, adc),
    op!(KIL, Implied, 6, unmodelled),
    op!(RRA, IndexedIndirectX, 8, rra),
    op!(NOP, ZeroPage, 3, nop),
    op!(ADC, ZeroPage, 3, adc),
    op!(ROR, ZeroPage, 5, ror),
    op!(RRA, ZeroPage, 5, rra),
    op!(PLA, Implied, 4, pla),
    op!(ADC, Immediate, 2, adc),
    op!(ROR, Accumulator, 2, ror),
    op!(ARR, Immediate, 2, unmodelled),
    op!(JMP, AbsoluteIndirect, 5, jmp),
    op!(ADC, Absolute, 4, adc),
    op!(ROR, Absolute, 6, ror),
    op!(RRA, Absolute, 6, rra),
    // $7x
    op!(BVS, Relative, 2, bvs),
    op!(ADC, IndirectIndexedY, 5, adc),
    op!(KIL, Implied, 6, unmodelled),
    op!(RRA, IndirectIndexedY, 8, rra),
    op!(NOP, ZeroPageX, 4, nop),
    op!(ADC, ZeroPageX, 4, adc),
    op!(ROR, ZeroPageX, 6, ror),
    op!(RRA, ZeroPageX, 6, rra),
    op!(SEI, Implied, 2, sei),
    op!(ADC, AbsoluteY, 4, adc),
    op!(NOP, Implied, 2, nop),
    op!(RRA, AbsoluteY, 7, rra),
    op!(NOP, AbsoluteX, 4, nop),
    op!(ADC, AbsoluteX, 4, adc),
    op!(ROR, AbsoluteX, 7, ror),
    op!(RRA, AbsoluteX, 7, rra),
    // $8x
    op!(NOP, Immediate, 2, nop),
    op!(STA, IndexedIndirectX, 6, sta),
    op!(NOP, Immediate, 2, nop),
    op!(SAX, IndexedIndirectX, 6, sax),
    op!(STY, ZeroPage, 3, sty),
    op!(STA, ZeroPage, 3, sta),
    op!(STX, ZeroPage, 3, stx),
    op!(SAX, ZeroPage, 3, sax),
    op!(DEY, Implied, 2, dey),
    op!(NOP, Immediate, 2, nop),
    op!(TXA, Implied, 2, txa),
    op!(XAA, Immediate, 2, unmodelled),
    op!(STY, Absolute, 4, sty),
    op!(STA, Absolute, 4, sta),
    op!(STX, Absolute, 4, stx),
    op!(SAX, Absolute, 4, sax),
    // $9x
    op!(BCC, Relative, 2, bcc),
    op!(STA, IndirectIndexedY, 6, sta),
    op!(KIL, Implied, 6, unmodelled),
    op!(AHX, IndirectIndexedY, 6, unmodelled),
    op!(STY, ZeroPageX, 4, sty),
    op!(STA, ZeroPageX, 4, sta),
    op!(STX, ZeroPageY, 4, stx),
    op!(SAX, ZeroPageY, 4, sax),
    op!(TYA, Implied, 2, tya),
    op!(STA, AbsoluteY, 5, sta),
    op!(TXS, Implied, 2, txs),
    op!(TAS, AbsoluteY, 5, unmodelled),
    op!(SHY, AbsoluteX, 5, unmodelled),
    op!(STA, AbsoluteX, 5, sta),
    op!(SHX, AbsoluteY, 5, unmodelled),
    op!(AHX, AbsoluteY, 5, unmodelled),
    // $Ax
    op!(LDY, Immediate, 2, ldy),
    op!(LDA, IndexedIndirectX, 6, lda),
    op!(LDX, Immediate, 2, ldx),
    op!(LAX, IndexedIndirectX, 6, lax),
    op!(LDY, ZeroPage, 3, ldy),
    op!(LDA, ZeroPage, 3, lda),
    op!(LDX, ZeroPage, 3, ldx),
    op!(LAX, ZeroPage, 3, lax),
    op!(TAY, Implied, 2, tay),
    op!(LDA, Immediate, 2, lda),
    op!(TAX, Implied, 2, tax),
    op!(LAX, Immediate, 2, lax),
    op!(LDY, Absolute, 4, ldy),
    op!(LDA, Absolute, 4, lda),
    op!(LDX, Absolute, 4, ldx),
    op!(LAX, Absolute, 4, lax),
    // $Bx
    op!(BCS, Relative, 2, bcs),
    op!(LDA, IndirectIndexedY, 5, lda),
    op!(KIL, Implied, 6, unmodelled),
    op!(LAX, IndirectIndexedY, 5, lax),
    op!(LDY, ZeroPageX, 4, ldy),
    op!(LDA, ZeroPageX, 4, lda),
    op!(LDX, ZeroPageY, 4, ldx),
    op!(LAX, ZeroPageY, 4, lax),
    op!(CLV, Implied, 2, clv),
    op!(LDA, AbsoluteY, 4, lda),
    op!(TSX, Implied, 2, tsx),
    op!(LAS, AbsoluteY, 4, unmodelled),
    op!(LDY, AbsoluteX, 4, ldy),
    op!(LDA, AbsoluteX, 4, lda),
    op!(LDX, AbsoluteY, 4, ldx),
    op!(LAX, AbsoluteY, 4, lax),
    // $Cx
    op!(CPY, Immediate, 2, cpy),
    op!(CMP, IndexedIndirectX, 6, cmp),
    op!(NOP, Immediate, 2, nop),
    op!(DCP, IndexedIndirectX, 8, dcp),
    op!(CPY, ZeroPage, 3, cpy),
    op!(CMP, ZeroPage, 3, cmp),
    op!(DEC, ZeroPage, 5, dec),
    op!(DCP, ZeroPage, 5, dcp),
    op!(INY, Implied, 2, iny),
    op!(CMP, Immediate, 2, cmp),
    op!(DEX, Implied, 2, dex),
    op!(AXS, Immediate, 2, unmodelled),
    op!(CPY, Absolute, 4, cpy),
    op!(CMP, Absolute, 4, cmp),
    op!(DEC, Absolute, 6, dec),
    op!(DCP, Absolute, 6, dcp),
    // $Dx
    op!(BNE, Relative, 2, bne),
    op!(CMP, IndirectIndexedY, 5, cmp),
    op!(KIL, Implied, 6, unmodelled),
    op!(DCP, IndirectIndexedY, 8, dcp),
    op!(NOP, ZeroPageX, 4, nop),
    op!(CMP, ZeroPageX, 4, cmp),
    op!(DEC, ZeroPageX, 6, dec),
    op!(DCP, ZeroPageX, 6, dcp),
    op!(CLD, Implied, 2, cld),
    op!(CMP, AbsoluteY, 4, cmp),
    op!(NOP, Implied, 2, nop),
    op!(DCP, AbsoluteY, 7, dcp),
    op!(NOP, AbsoluteX, 4, nop),
    op!(CMP, AbsoluteX, 4, cmp),
    op!(DEC, AbsoluteX, 7, dec),
    op!(DCP, AbsoluteX, 7, dcp),
    // $Ex
    op!(CPX, Immediate, 2, cpx),
    op!(SBC, IndexedIndirectX, 6, sbc),
    op!(NOP, Immediate, 2, nop),
    op!(ISC, IndexedIndirectX, 8, isc),
    op!(CPX, ZeroPage, 3, cpx),
    op!(SBC, ZeroPage, 3, sbc),
    op!(INC, ZeroPage, 5, inc),
    op!(ISC, ZeroPage, 5, isc),
    op!(INX, Implied, 2, inx),
    op!(SBC, Immediate, 2, sbc),
    op!(NOP, Implied, 2, nop),
    op!(SBC, Immediate, 2, sbc),
    op!(CPX, Absolute, 4, cpx),
    op!(SBC, Absolute, 4, sbc),
    op!(INC, Absolute, 6, inc),
    op!(ISC, Absolute, 6, isc),
    // $Fx
    op!(BEQ, Relative, 2, beq),
    op!(SBC, IndirectIndexedY, 5, sbc),
    op!(KIL, Implied, 6, unmodelled),
    op!(ISC, IndirectIndexedY, 8, isc),
    op!(NOP, ZeroPageX, 4, nop),
    op!(SBC, ZeroPageX, 4, sbc),
    op!(INC, ZeroPageX, 6, inc),
    op!(ISC, ZeroPageX, 6, isc),
    op!(SED, Implied, 2, sed),
    op!(SBC, AbsoluteY, 4, sbc),
    op!(NOP, Implied, 2, nop),
    op!(ISC, AbsoluteY, 7, isc),
    op!(NOP, AbsoluteX, 4, nop),
    op!(SBC, AbsoluteX, 4, sbc),
    op!(INC, AbsoluteX, 7, inc),
    op!(ISC, AbsoluteX, 7, isc),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_fully_populated() {
        assert_eq!(OPCODES.len(), 256);
    }

    #[test]
    fn decodes_known_rows() {
        assert_eq!(OPCODES[0xEA].mnemonic, Mnemonic::NOP);
        assert_eq!(OPCODES[0xEA].mode, AddrMode::Implied);
        assert_eq!(OPCODES[0xEA].cycles, 2);

        assert_eq!(OPCODES[0xA9].mnemonic, Mnemonic::LDA);
        assert_eq!(OPCODES[0xA9].mode, AddrMode::Immediate);

        assert_eq!(OPCODES[0x6C].mnemonic, Mnemonic::JMP);
        assert_eq!(OPCODES[0x6C].mode, AddrMode::AbsoluteIndirect);
        assert_eq!(OPCODES[0x6C].cycles, 5);

        // the SBC mirror
        assert_eq!(OPCODES[0xEB].mnemonic, Mnemonic::SBC);
        assert_eq!(OPCODES[0xEB].mode, AddrMode::Immediate);
    }

    #[test]
    fn halt_class_opcodes_decode_to_stubs() {
        for code in [0x02u8, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
            assert_eq!(OPCODES[code as usize].mnemonic, Mnemonic::KIL);
            assert_eq!(OPCODES[code as usize].cycles, 6);
        }
    }

    #[test]
    fn instruction_lengths_follow_the_mode() {
        assert_eq!(OPCODES[0xEA].mode.length(), 1);
        assert_eq!(OPCODES[0xA9].mode.length(), 2);
        assert_eq!(OPCODES[0xAD].mode.length(), 3);
        assert_eq!(OPCODES[0x6C].mode.length(), 3);
    }
}
