//! Execution engine for the 6502.
//!
//! No binary-coded-decimal support: the console's CPU ties the D flag to
//! nothing, and `adc`/`sbc` here ignore it the same way.

use tracing::{debug, warn};

use super::super::bus::Bus;
use super::super::nes::NmiLine;
use super::opcodes::OPCODES;
use super::structs::{AddrMode, CpuState, Mnemonic, Status, POWERON_CPU_STATE};
use crate::error::EmuError;

pub struct Cpu {
    pub state: CpuState,
    bus: Bus,
    nmi: NmiLine,
    /// Resolved operand address of the current instruction. `None` for
    /// implied, accumulator and immediate forms.
    addr: Option<u16>,
    /// Operand byte fetched (or synthesized) during address resolution.
    data: u8,
    /// Set once any unmodelled opcode stub has executed.
    unmodelled_hit: bool,
}

impl Cpu {
    pub fn new(bus: Bus, nmi: NmiLine) -> Cpu {
        Cpu {
            state: POWERON_CPU_STATE,
            bus,
            nmi,
            addr: None,
            data: 0,
            unmodelled_hit: false,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// A handle to the pending-NMI latch this CPU samples at instruction
    /// boundaries.
    pub fn nmi_line(&self) -> NmiLine {
        self.nmi.clone()
    }

    /// Whether any of the unmodelled opcode stubs has ever executed.
    pub fn hit_unmodelled_opcode(&self) -> bool {
        self.unmodelled_hit
    }

    /// Hardware reset: reload PC from $FFFC/$FFFD, reload SP, mask IRQs and
    /// charge the seven-cycle reset sequence. RAM is left alone.
    pub fn reset(&mut self) -> Result<(), EmuError> {
        let lo = self.bus.read(0xFFFC)?;
        let hi = self.bus.read(0xFFFD)?;
        self.state.pc = u16::from_le_bytes([lo, hi]);
        self.state.sp = 0xFD;
        self.state.status.insert(Status::IRQ_DISABLE);
        self.state.cycles += 7;
        self.nmi.clear();
        Ok(())
    }

    /// Run one instruction (or service a pending NMI) and return the cycles
    /// it consumed.
    pub fn step(&mut self) -> Result<u32, EmuError> {
        if self.nmi.take() {
            return self.service_nmi();
        }
        let opcode = self.bus.read(self.state.pc)?;
        let op = &OPCODES[opcode as usize];
        let crossed = self.resolve(op.mnemonic, op.mode)?;
        let taken = (op.exec)(self)?;
        if !matches!(
            op.mnemonic,
            Mnemonic::JMP | Mnemonic::JSR | Mnemonic::RTS | Mnemonic::RTI
        ) {
            self.state.pc = self.state.pc.wrapping_add(op.mode.length());
        }
        let mut cycles = op.cycles;
        if op.mnemonic.is_branch() {
            if taken {
                cycles += 1;
                if crossed {
                    cycles += 1;
                }
            }
        } else if crossed && op.mnemonic.pays_cross_penalty() {
            cycles += 1;
        }
        self.state.cycles += u64::from(cycles);
        Ok(cycles)
    }

    /// Interrupt entry for the non-maskable line. The pushed status byte has
    /// B clear, which is how handlers tell interrupts from BRK.
    fn service_nmi(&mut self) -> Result<u32, EmuError> {
        debug!(pc = self.state.pc, "entering NMI handler");
        let [lo, hi] = self.state.pc.to_le_bytes();
        self.push(hi)?;
        self.push(lo)?;
        let pushed = (self.state.status | Status::UNUSED) - Status::BREAK;
        self.push(pushed.bits())?;
        self.state.status.insert(Status::IRQ_DISABLE);
        let lo = self.bus.read(0xFFFA)?;
        let hi = self.bus.read(0xFFFB)?;
        self.state.pc = u16::from_le_bytes([lo, hi]);
        self.state.cycles += 7;
        Ok(7)
    }

    /// Work out the operand address, detect page crossings, and prefetch the
    /// operand byte for every form that reads it. Store-class instructions
    /// skip the prefetch so that I/O registers never see a phantom read.
    fn resolve(&mut self, mnemonic: Mnemonic, mode: AddrMode) -> Result<bool, EmuError> {
        let pc = self.state.pc;
        let prefetch = !mnemonic.skips_prefetch();
        self.addr = None;
        self.data = 0;
        let mut crossed = false;
        match mode {
            AddrMode::Implied => {}
            AddrMode::Accumulator => {
                self.data = self.state.a;
            }
            AddrMode::Immediate | AddrMode::Relative => {
                self.data = self.bus.read(pc.wrapping_add(1))?;
                if mode == AddrMode::Relative {
                    let next = pc.wrapping_add(2);
                    let target = next.wrapping_add(self.data as i8 as u16);
                    crossed = next & 0xFF00 != target & 0xFF00;
                }
            }
            AddrMode::Absolute => {
                let lo = self.bus.read(pc.wrapping_add(1))?;
                let hi = self.bus.read(pc.wrapping_add(2))?;
                let addr = u16::from_le_bytes([lo, hi]);
                self.addr = Some(addr);
                if prefetch {
                    self.data = self.bus.read(addr)?;
                }
            }
            AddrMode::AbsoluteX | AddrMode::AbsoluteY => {
                let lo = self.bus.read(pc.wrapping_add(1))?;
                let hi = self.bus.read(pc.wrapping_add(2))?;
                let index = if mode == AddrMode::AbsoluteX {
                    self.state.x
                } else {
                    self.state.y
                };
                let addr = u16::from_le_bytes([lo, hi]).wrapping_add(u16::from(index));
                crossed = u16::from(lo) + u16::from(index) > 0xFF;
                self.addr = Some(addr);
                if prefetch {
                    self.data = self.bus.read(addr)?;
                }
            }
            AddrMode::ZeroPage => {
                let addr = u16::from(self.bus.read(pc.wrapping_add(1))?);
                self.addr = Some(addr);
                if prefetch {
                    self.data = self.bus.read(addr)?;
                }
            }
            AddrMode::ZeroPageX | AddrMode::ZeroPageY => {
                let base = self.bus.read(pc.wrapping_add(1))?;
                let index = if mode == AddrMode::ZeroPageX {
                    self.state.x
                } else {
                    self.state.y
                };
                let addr = u16::from(base.wrapping_add(index));
                self.addr = Some(addr);
                if prefetch {
                    self.data = self.bus.read(addr)?;
                }
            }
            AddrMode::IndexedIndirectX => {
                let ptr = self.bus.read(pc.wrapping_add(1))?.wrapping_add(self.state.x);
                let lo = self.bus.read(u16::from(ptr))?;
                let hi = self.bus.read(u16::from(ptr.wrapping_add(1)))?;
                let addr = u16::from_le_bytes([lo, hi]);
                self.addr = Some(addr);
                if prefetch {
                    self.data = self.bus.read(addr)?;
                }
            }
            AddrMode::IndirectIndexedY => {
                let ptr = self.bus.read(pc.wrapping_add(1))?;
                let lo = self.bus.read(u16::from(ptr))?;
                let hi = self.bus.read(u16::from(ptr.wrapping_add(1)))?;
                let addr = u16::from_le_bytes([lo, hi]).wrapping_add(u16::from(self.state.y));
                crossed = u16::from(lo) + u16::from(self.state.y) > 0xFF;
                self.addr = Some(addr);
                if prefetch {
                    self.data = self.bus.read(addr)?;
                }
            }
            AddrMode::AbsoluteIndirect => {
                let lo = self.bus.read(pc.wrapping_add(1))?;
                let hi = self.bus.read(pc.wrapping_add(2))?;
                let ptr = u16::from_le_bytes([lo, hi]);
                // the famous fetch bug: the high byte never leaves the
                // pointer's page
                let ptr_hi = (ptr & 0xFF00) | u16::from((ptr as u8).wrapping_add(1));
                let target_lo = self.bus.read(ptr)?;
                let target_hi = self.bus.read(ptr_hi)?;
                self.addr = Some(u16::from_le_bytes([target_lo, target_hi]));
            }
        }
        Ok(crossed)
    }

    //region shared plumbing

    fn push(&mut self, value: u8) -> Result<(), EmuError> {
        self.bus.write(0x0100 | u16::from(self.state.sp), value)?;
        self.state.sp = self.state.sp.wrapping_sub(1);
        Ok(())
    }

    fn pop(&mut self) -> Result<u8, EmuError> {
        self.state.sp = self.state.sp.wrapping_add(1);
        self.bus.read(0x0100 | u16::from(self.state.sp))
    }

    fn set_zn(&mut self, value: u8) {
        self.state.status.set(Status::ZERO, value == 0);
        self.state.status.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Write a shift/rotate result either back to memory or to A, depending
    /// on the addressing form that produced it.
    fn write_back(&mut self, value: u8) -> Result<(), EmuError> {
        match self.addr {
            Some(addr) => {
                self.bus.write(addr, value)?;
            }
            None => self.state.a = value,
        }
        Ok(())
    }

    fn store(&mut self, value: u8) -> Result<bool, EmuError> {
        let Some(addr) = self.addr else {
            return Ok(false);
        };
        self.bus.write(addr, value)?;
        Ok(false)
    }

    fn branch_if(&mut self, condition: bool) -> Result<bool, EmuError> {
        if condition {
            // PC still points at the opcode here; the engine adds the
            // instruction length afterwards
            self.state.pc = self.state.pc.wrapping_add(self.data as i8 as u16);
        }
        Ok(condition)
    }

    fn compare(&mut self, register: u8) {
        let operand = self.data;
        self.state.status.set(Status::CARRY, register >= operand);
        self.set_zn(register.wrapping_sub(operand));
    }

    /// The adder. ADC uses it directly; SBC and the composite illegals feed
    /// it the complemented operand, which yields exactly the borrow and
    /// overflow behaviour of the subtract path.
    fn add_to_a(&mut self, operand: u8) {
        let carry_in = u16::from(self.state.status.contains(Status::CARRY));
        let sum = u16::from(self.state.a) + u16::from(operand) + carry_in;
        let result = sum as u8;
        self.state.status.set(Status::CARRY, sum > 0xFF);
        self.state.status.set(
            Status::OVERFLOW,
            (self.state.a ^ result) & (operand ^ result) & 0x80 != 0,
        );
        self.state.a = result;
        self.set_zn(result);
    }

    //endregion

    //region loads and stores

    pub(super) fn lda(&mut self) -> Result<bool, EmuError> {
        self.state.a = self.data;
        self.set_zn(self.state.a);
        Ok(false)
    }

    pub(super) fn ldx(&mut self) -> Result<bool, EmuError> {
        self.state.x = self.data;
        self.set_zn(self.state.x);
        Ok(false)
    }

    pub(super) fn ldy(&mut self) -> Result<bool, EmuError> {
        self.state.y = self.data;
        self.set_zn(self.state.y);
        Ok(false)
    }

    pub(super) fn sta(&mut self) -> Result<bool, EmuError> {
        self.store(self.state.a)
    }

    pub(super) fn stx(&mut self) -> Result<bool, EmuError> {
        self.store(self.state.x)
    }

    pub(super) fn sty(&mut self) -> Result<bool, EmuError> {
        self.store(self.state.y)
    }

    //endregion

    //region register transfers

    pub(super) fn tax(&mut self) -> Result<bool, EmuError> {
        self.state.x = self.state.a;
        self.set_zn(self.state.x);
        Ok(false)
    }

    pub(super) fn tay(&mut self) -> Result<bool, EmuError> {
        self.state.y = self.state.a;
        self.set_zn(self.state.y);
        Ok(false)
    }

    pub(super) fn txa(&mut self) -> Result<bool, EmuError> {
        self.state.a = self.state.x;
        self.set_zn(self.state.a);
        Ok(false)
    }

    pub(super) fn tya(&mut self) -> Result<bool, EmuError> {
        self.state.a = self.state.y;
        self.set_zn(self.state.a);
        Ok(false)
    }

    pub(super) fn tsx(&mut self) -> Result<bool, EmuError> {
        self.state.x = self.state.sp;
        self.set_zn(self.state.x);
        Ok(false)
    }

    pub(super) fn txs(&mut self) -> Result<bool, EmuError> {
        self.state.sp = self.state.x;
        Ok(false)
    }

    //endregion

    //region arithmetic

    /// Decimal mode is ignored: the console's CPU has the D flag wired to
    /// nothing.
    pub(super) fn adc(&mut self) -> Result<bool, EmuError> {
        self.add_to_a(self.data);
        Ok(false)
    }

    /// Subtract is add of the complement; D is ignored here too.
    pub(super) fn sbc(&mut self) -> Result<bool, EmuError> {
        self.add_to_a(!self.data);
        Ok(false)
    }

    pub(super) fn cmp(&mut self) -> Result<bool, EmuError> {
        self.compare(self.state.a);
        Ok(false)
    }

    pub(super) fn cpx(&mut self) -> Result<bool, EmuError> {
        self.compare(self.state.x);
        Ok(false)
    }

    pub(super) fn cpy(&mut self) -> Result<bool, EmuError> {
        self.compare(self.state.y);
        Ok(false)
    }

    pub(super) fn inc(&mut self) -> Result<bool, EmuError> {
        let value = self.data.wrapping_add(1);
        self.write_back(value)?;
        self.set_zn(value);
        Ok(false)
    }

    pub(super) fn dec(&mut self) -> Result<bool, EmuError> {
        let value = self.data.wrapping_sub(1);
        self.write_back(value)?;
        self.set_zn(value);
        Ok(false)
    }

    pub(super) fn inx(&mut self) -> Result<bool, EmuError> {
        self.state.x = self.state.x.wrapping_add(1);
        self.set_zn(self.state.x);
        Ok(false)
    }

    pub(super) fn iny(&mut self) -> Result<bool, EmuError> {
        self.state.y = self.state.y.wrapping_add(1);
        self.set_zn(self.state.y);
        Ok(false)
    }

    pub(super) fn dex(&mut self) -> Result<bool, EmuError> {
        self.state.x = self.state.x.wrapping_sub(1);
        self.set_zn(self.state.x);
        Ok(false)
    }

    pub(super) fn dey(&mut self) -> Result<bool, EmuError> {
        self.state.y = self.state.y.wrapping_sub(1);
        self.set_zn(self.state.y);
        Ok(false)
    }

    //endregion

    //region bitwise

    pub(super) fn and(&mut self) -> Result<bool, EmuError> {
        self.state.a &= self.data;
        self.set_zn(self.state.a);
        Ok(false)
    }

    pub(super) fn ora(&mut self) -> Result<bool, EmuError> {
        self.state.a |= self.data;
        self.set_zn(self.state.a);
        Ok(false)
    }

    pub(super) fn eor(&mut self) -> Result<bool, EmuError> {
        self.state.a ^= self.data;
        self.set_zn(self.state.a);
        Ok(false)
    }

    pub(super) fn bit(&mut self) -> Result<bool, EmuError> {
        self.state.status.set(Status::NEGATIVE, self.data & 0x80 != 0);
        self.state.status.set(Status::OVERFLOW, self.data & 0x40 != 0);
        self.state.status.set(Status::ZERO, self.data & self.state.a == 0);
        Ok(false)
    }

    //endregion

    //region shifts and rotates

    pub(super) fn asl(&mut self) -> Result<bool, EmuError> {
        let value = self.data << 1;
        self.state.status.set(Status::CARRY, self.data & 0x80 != 0);
        self.set_zn(value);
        self.write_back(value)?;
        Ok(false)
    }

    pub(super) fn lsr(&mut self) -> Result<bool, EmuError> {
        let value = self.data >> 1;
        self.state.status.set(Status::CARRY, self.data & 0x01 != 0);
        self.set_zn(value);
        self.write_back(value)?;
        Ok(false)
    }

    pub(super) fn rol(&mut self) -> Result<bool, EmuError> {
        let carry_in = u8::from(self.state.status.contains(Status::CARRY));
        let value = self.data << 1 | carry_in;
        self.state.status.set(Status::CARRY, self.data & 0x80 != 0);
        self.set_zn(value);
        self.write_back(value)?;
        Ok(false)
    }

    pub(super) fn ror(&mut self) -> Result<bool, EmuError> {
        let carry_in = u8::from(self.state.status.contains(Status::CARRY));
        let value = self.data >> 1 | carry_in << 7;
        self.state.status.set(Status::CARRY, self.data & 0x01 != 0);
        self.set_zn(value);
        self.write_back(value)?;
        Ok(false)
    }

    //endregion

    //region flag operations

    pub(super) fn clc(&mut self) -> Result<bool, EmuError> {
        self.state.status.remove(Status::CARRY);
        Ok(false)
    }

    pub(super) fn sec(&mut self) -> Result<bool, EmuError> {
        self.state.status.insert(Status::CARRY);
        Ok(false)
    }

    pub(super) fn cli(&mut self) -> Result<bool, EmuError> {
        self.state.status.remove(Status::IRQ_DISABLE);
        Ok(false)
    }

    pub(super) fn sei(&mut self) -> Result<bool, EmuError> {
        self.state.status.insert(Status::IRQ_DISABLE);
        Ok(false)
    }

    pub(super) fn clv(&mut self) -> Result<bool, EmuError> {
        self.state.status.remove(Status::OVERFLOW);
        Ok(false)
    }

    pub(super) fn cld(&mut self) -> Result<bool, EmuError> {
        self.state.status.remove(Status::DECIMAL);
        Ok(false)
    }

    pub(super) fn sed(&mut self) -> Result<bool, EmuError> {
        self.state.status.insert(Status::DECIMAL);
        Ok(false)
    }

    //endregion

    //region stack

    pub(super) fn pha(&mut self) -> Result<bool, EmuError> {
        self.push(self.state.a)?;
        Ok(false)
    }

    pub(super) fn pla(&mut self) -> Result<bool, EmuError> {
        let value = self.pop()?;
        self.state.a = value;
        self.set_zn(value);
        Ok(false)
    }

    /// The pushed byte carries B set; only PHP and BRK do that.
    pub(super) fn php(&mut self) -> Result<bool, EmuError> {
        let pushed = self.state.status | Status::BREAK | Status::UNUSED;
        self.push(pushed.bits())?;
        Ok(false)
    }

    /// B never lands in the live register, and bit 5 stays high.
    pub(super) fn plp(&mut self) -> Result<bool, EmuError> {
        let value = self.pop()?;
        self.state.status = (Status::from_bits_truncate(value) - Status::BREAK) | Status::UNUSED;
        Ok(false)
    }

    //endregion

    //region jumps and returns

    pub(super) fn jmp(&mut self) -> Result<bool, EmuError> {
        let Some(target) = self.addr else {
            return Ok(false);
        };
        self.state.pc = target;
        Ok(false)
    }

    /// Pushes the address of the last operand byte, one short of the return
    /// address; RTS compensates.
    pub(super) fn jsr(&mut self) -> Result<bool, EmuError> {
        let Some(target) = self.addr else {
            return Ok(false);
        };
        let [lo, hi] = self.state.pc.wrapping_add(2).to_le_bytes();
        self.push(hi)?;
        self.push(lo)?;
        self.state.pc = target;
        Ok(false)
    }

    pub(super) fn rts(&mut self) -> Result<bool, EmuError> {
        let lo = self.pop()?;
        let hi = self.pop()?;
        self.state.pc = u16::from_le_bytes([lo, hi]).wrapping_add(1);
        Ok(false)
    }

    pub(super) fn rti(&mut self) -> Result<bool, EmuError> {
        let flags = self.pop()?;
        self.state.status = (Status::from_bits_truncate(flags) - Status::BREAK) | Status::UNUSED;
        let lo = self.pop()?;
        let hi = self.pop()?;
        self.state.pc = u16::from_le_bytes([lo, hi]);
        Ok(false)
    }

    //endregion

    //region branches

    pub(super) fn bpl(&mut self) -> Result<bool, EmuError> {
        self.branch_if(!self.state.status.contains(Status::NEGATIVE))
    }

    pub(super) fn bmi(&mut self) -> Result<bool, EmuError> {
        self.branch_if(self.state.status.contains(Status::NEGATIVE))
    }

    pub(super) fn bvc(&mut self) -> Result<bool, EmuError> {
        self.branch_if(!self.state.status.contains(Status::OVERFLOW))
    }

    pub(super) fn bvs(&mut self) -> Result<bool, EmuError> {
        self.branch_if(self.state.status.contains(Status::OVERFLOW))
    }

    pub(super) fn bcc(&mut self) -> Result<bool, EmuError> {
        self.branch_if(!self.state.status.contains(Status::CARRY))
    }

    pub(super) fn bcs(&mut self) -> Result<bool, EmuError> {
        self.branch_if(self.state.status.contains(Status::CARRY))
    }

    pub(super) fn bne(&mut self) -> Result<bool, EmuError> {
        self.branch_if(!self.state.status.contains(Status::ZERO))
    }

    pub(super) fn beq(&mut self) -> Result<bool, EmuError> {
        self.branch_if(self.state.status.contains(Status::ZERO))
    }

    //endregion

    //region unofficial opcodes

    pub(super) fn lax(&mut self) -> Result<bool, EmuError> {
        self.state.a = self.data;
        self.state.x = self.data;
        self.set_zn(self.data);
        Ok(false)
    }

    pub(super) fn sax(&mut self) -> Result<bool, EmuError> {
        self.store(self.state.a & self.state.x)
    }

    /// DEC then CMP against A.
    pub(super) fn dcp(&mut self) -> Result<bool, EmuError> {
        let value = self.data.wrapping_sub(1);
        self.write_back(value)?;
        self.data = value;
        self.compare(self.state.a);
        Ok(false)
    }

    /// INC then SBC. Flags come from the subtraction result, matching the
    /// official half of the operation.
    pub(super) fn isc(&mut self) -> Result<bool, EmuError> {
        let value = self.data.wrapping_add(1);
        self.write_back(value)?;
        self.add_to_a(!value);
        Ok(false)
    }

    /// ASL then ORA.
    pub(super) fn slo(&mut self) -> Result<bool, EmuError> {
        let value = self.data << 1;
        self.state.status.set(Status::CARRY, self.data & 0x80 != 0);
        self.write_back(value)?;
        self.state.a |= value;
        self.set_zn(self.state.a);
        Ok(false)
    }

    /// ROL then AND.
    pub(super) fn rla(&mut self) -> Result<bool, EmuError> {
        let carry_in = u8::from(self.state.status.contains(Status::CARRY));
        let value = self.data << 1 | carry_in;
        self.state.status.set(Status::CARRY, self.data & 0x80 != 0);
        self.write_back(value)?;
        self.state.a &= value;
        self.set_zn(self.state.a);
        Ok(false)
    }

    /// LSR then EOR.
    pub(super) fn sre(&mut self) -> Result<bool, EmuError> {
        let value = self.data >> 1;
        self.state.status.set(Status::CARRY, self.data & 0x01 != 0);
        self.write_back(value)?;
        self.state.a ^= value;
        self.set_zn(self.state.a);
        Ok(false)
    }

    /// ROR then ADC, with the rotate's carry feeding the add.
    pub(super) fn rra(&mut self) -> Result<bool, EmuError> {
        let carry_in = u8::from(self.state.status.contains(Status::CARRY));
        let value = self.data >> 1 | carry_in << 7;
        self.state.status.set(Status::CARRY, self.data & 0x01 != 0);
        self.write_back(value)?;
        self.add_to_a(value);
        Ok(false)
    }

    //endregion

    pub(super) fn nop(&mut self) -> Result<bool, EmuError> {
        Ok(false)
    }

    /// BRK is a stub in this core: it decodes, advances and charges its
    /// seven cycles, but no interrupt entry happens.
    pub(super) fn brk(&mut self) -> Result<bool, EmuError> {
        debug!(pc = self.state.pc, "BRK executed (stubbed)");
        Ok(false)
    }

    /// The catch-all for KIL and the analog-quirk opcodes: a no-op at the
    /// tabled cycle cost, with a diagnostic breadcrumb.
    pub(super) fn unmodelled(&mut self) -> Result<bool, EmuError> {
        warn!(pc = self.state.pc, "unmodelled opcode executed as NOP");
        self.unmodelled_hit = true;
        Ok(false)
    }
}
