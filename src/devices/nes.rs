//! The machine as a whole: bus wiring, the system clock and the surface the
//! host shell drives.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use super::bus::{Bus, Device};
use super::cartridge::Rom;
use super::cpu::Cpu;
use super::mem::{ApuStub, PrgRom, WorkRam};
use super::ppu::vram::{NameTable, PaletteRam, PatternTable};
use super::ppu::{Frame, Ppu};
use crate::error::EmuError;

/// NTSC CPU clock rate.
pub const CPU_CLOCK_HZ: u64 = 1_789_773;

/// PPU dots per CPU cycle on NTSC machines.
const DOTS_PER_CPU_CYCLE: u32 = 3;

/// The pending-NMI latch.
///
/// The only cross-component signal in the machine: the PPU raises it on its
/// transition into vertical blank, the CPU consumes it at the next
/// instruction boundary. Sharing one small cell keeps the ownership graph
/// acyclic.
#[derive(Clone)]
pub struct NmiLine(Rc<Cell<bool>>);

impl NmiLine {
    pub fn new() -> NmiLine {
        NmiLine(Rc::new(Cell::new(false)))
    }

    pub fn raise(&self) {
        self.0.set(true);
    }

    pub fn pending(&self) -> bool {
        self.0.get()
    }

    /// Consume the pending edge, clearing the latch.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    pub fn clear(&self) {
        self.0.set(false);
    }
}

impl Default for NmiLine {
    fn default() -> NmiLine {
        NmiLine::new()
    }
}

/// The read-only register snapshot the shell's HUD and the reference-log
/// harness consume.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CpuSnapshot {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// The flag byte, bit 5 high.
    pub f: u8,
    pub sp: u8,
    pub cyc: u64,
}

/// The wired-up console.
pub struct Nes {
    cpu: Cpu,
    ppu: Ppu,
}

impl Nes {
    /// Wire both buses around a parsed ROM and reset the CPU.
    ///
    /// PPU side: pattern table (CHR ROM, or CHR RAM when the image carries
    /// none), nametables, palette. CPU side: PRG, work RAM, the APU stub and
    /// the PPU register window.
    pub fn from_rom(rom: &Rom) -> Result<Nes, EmuError> {
        let nmi = NmiLine::new();

        let mut ppu_bus = Bus::new();
        let pattern = if rom.chr.is_empty() {
            PatternTable::ram()
        } else {
            PatternTable::rom(&rom.chr)?
        };
        ppu_bus.attach(Device::PatternTable(pattern))?;
        ppu_bus.attach(Device::NameTable(NameTable::new()))?;
        ppu_bus.attach(Device::PaletteRam(PaletteRam::new()))?;
        let ppu = Ppu::new(Rc::new(RefCell::new(ppu_bus)), nmi.clone());

        let mut cpu_bus = Bus::new();
        cpu_bus.attach(Device::PrgRom(PrgRom::load(&rom.prg)?))?;
        cpu_bus.attach(Device::WorkRam(WorkRam::new()))?;
        cpu_bus.attach(Device::ApuStub(ApuStub::new()))?;
        cpu_bus.attach(Device::PpuPorts(ppu.registers()))?;
        let mut cpu = Cpu::new(cpu_bus, nmi);
        cpu.reset()?;

        Ok(Nes { cpu, ppu })
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    /// One shell step event: run a single CPU instruction, then advance the
    /// PPU three dots for every cycle the instruction consumed. Returns the
    /// CPU cycle count.
    pub fn step(&mut self) -> Result<u32, EmuError> {
        let cycles = self.cpu.step()?;
        for _ in 0..cycles * DOTS_PER_CPU_CYCLE {
            self.ppu.step();
        }
        Ok(cycles)
    }

    /// Run as much emulated time as the host frame delta covers at the NTSC
    /// clock rate. The last instruction may overshoot slightly; the debt is
    /// not carried.
    pub fn run_for(&mut self, delta: Duration) -> Result<(), EmuError> {
        let budget = (delta.as_secs_f64() * CPU_CLOCK_HZ as f64) as u64;
        let mut spent = 0u64;
        while spent < budget {
            spent += u64::from(self.step()?);
        }
        Ok(())
    }

    /// The shell's reset event. RAM survives; PC and SP reload.
    pub fn reset(&mut self) -> Result<(), EmuError> {
        debug!("machine reset");
        self.cpu.reset()
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        let state = &self.cpu.state;
        CpuSnapshot {
            pc: state.pc,
            a: state.a,
            x: state.x,
            y: state.y,
            f: state.status.bits(),
            sp: state.sp,
            cyc: state.cycles,
        }
    }

    /// Compose the background for one of the four nametables.
    pub fn render_background(&self, nametable: usize) -> Result<Frame, EmuError> {
        self.ppu.render_background(nametable)
    }
}

#[cfg(test)]
mod tests {
    use super::super::cartridge::{InesFlags6, InesFlags7, InesHeader};
    use super::*;

    /// A mapper-0 ROM with the program at $C000, the NMI handler (an RTI) at
    /// $C050 and CHR RAM.
    fn test_rom(program: &[u8]) -> Rom {
        let mut prg = vec![0u8; 0x4000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x50] = 0x40; // RTI
        prg[0x3FFA] = 0x50;
        prg[0x3FFB] = 0xC0;
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0xC0;
        Rom {
            header: InesHeader {
                prg_banks: 1,
                chr_banks: 0,
                flags_6: InesFlags6::empty(),
                flags_7: InesFlags7::empty(),
            },
            prg,
            chr: Vec::new(),
        }
    }

    #[test]
    fn boots_to_the_reset_vector() {
        let nes = Nes::from_rom(&test_rom(&[0xEA])).unwrap();
        let snap = nes.snapshot();
        assert_eq!(snap.pc, 0xC000);
        assert_eq!(snap.sp, 0xFD);
        assert_eq!(snap.f, 0x24);
        assert_eq!(snap.cyc, 7);
    }

    #[test]
    fn ppu_advances_three_dots_per_cpu_cycle() {
        let mut nes = Nes::from_rom(&test_rom(&[0xEA])).unwrap();
        let cycles = nes.step().unwrap(); // NOP, 2 cycles
        assert_eq!(cycles, 2);
        assert_eq!(nes.ppu().dot(), 6);
        assert_eq!(nes.ppu().row(), 0);
    }

    #[test]
    fn reset_preserves_ram_and_reloads_pc() {
        let mut nes = Nes::from_rom(&test_rom(&[0xA9, 0x80])).unwrap();
        nes.cpu_mut().bus_mut().write(0x0033, 0x77).unwrap();
        nes.step().unwrap();
        nes.reset().unwrap();
        let snap = nes.snapshot();
        assert_eq!(snap.pc, 0xC000);
        assert_eq!(snap.sp, 0xFD);
        assert_eq!(nes.cpu_mut().bus_mut().read(0x0033).unwrap(), 0x77);
    }

    /// The full VBlank chain: the program enables NMI-on-VBlank, the PPU
    /// reaches (row 241, dot 1), and the CPU lands in the handler with the
    /// interrupt frame on the stack. The status register reports VBlank
    /// exactly once.
    #[test]
    fn vblank_nmi_reaches_the_handler() {
        // LDA #$80, STA $2000, then spin
        let mut nes = Nes::from_rom(&test_rom(&[
            0xA9, 0x80, // LDA #$80
            0x8D, 0x00, 0x20, // STA $2000
            0x4C, 0x05, 0xC0, // JMP $C005
        ]))
        .unwrap();
        let mut entered = false;
        for _ in 0..100_000 {
            nes.step().unwrap();
            if nes.snapshot().pc == 0xC050 {
                entered = true;
                break;
            }
        }
        assert!(entered, "NMI never reached its handler");
        let snap = nes.snapshot();
        assert!(snap.f & 0x04 != 0, "I must be set on entry");
        // the pushed frame: return address into the spin loop, then flags
        // with B clear and bit 5 set
        assert_eq!(nes.cpu_mut().bus_mut().read(0x01FD).unwrap(), 0xC0);
        let pushed_flags = nes.cpu_mut().bus_mut().read(0x01FB).unwrap();
        assert_eq!(pushed_flags & 0x30, 0x20);
        // VBlank reads as set exactly once
        assert_eq!(nes.cpu_mut().bus_mut().read(0x2002).unwrap() & 0x80, 0x80);
        assert_eq!(nes.cpu_mut().bus_mut().read(0x2002).unwrap() & 0x80, 0x00);
    }

    /// Stores must not prefetch their target: a STA at $2002 would otherwise
    /// fire the read side effect and eat the VBlank flag.
    #[test]
    fn stores_skip_the_phantom_read() {
        let mut nes = Nes::from_rom(&test_rom(&[
            0x8D, 0x02, 0x20, // STA $2002
            0xAD, 0x02, 0x20, // LDA $2002
            0xAD, 0x02, 0x20, // LDA $2002
        ]))
        .unwrap();
        nes.ppu().registers().borrow_mut().set_vblank();
        nes.step().unwrap(); // the store: no read side effect
        nes.step().unwrap();
        assert_eq!(nes.snapshot().a & 0x80, 0x80, "VBlank was eaten by a phantom read");
        nes.step().unwrap();
        assert_eq!(nes.snapshot().a & 0x80, 0x00);
    }

    /// A CPU write to $2007 must land on the PPU bus (the aliasing question
    /// from the ownership model).
    #[test]
    fn cpu_writes_reach_ppu_memory_through_2007() {
        let mut nes = Nes::from_rom(&test_rom(&[
            0xA9, 0x21, // LDA #$21
            0x8D, 0x06, 0x20, // STA $2006
            0xA9, 0x55, // LDA #$55
            0x8D, 0x06, 0x20, // STA $2006
            0xA9, 0x42, // LDA #$42
            0x8D, 0x07, 0x20, // STA $2007
        ]))
        .unwrap();
        for _ in 0..6 {
            nes.step().unwrap();
        }
        let regs = nes.ppu().registers();
        // the write post-incremented the latch past $2155
        assert_eq!(regs.borrow().vram_addr(), 0x2156);
        // and the byte landed in nametable memory at $2155
        let mut regs = regs.borrow_mut();
        regs.write(0x2006, 0x21).unwrap();
        regs.write(0x2006, 0x55).unwrap();
        regs.read(0x2007).unwrap(); // prime the buffer
        assert_eq!(regs.read(0x2007).unwrap(), 0x42);
    }

    #[test]
    fn run_for_spends_at_least_the_budget() {
        let mut nes = Nes::from_rom(&test_rom(&[0x4C, 0x00, 0xC0])).unwrap();
        let before = nes.snapshot().cyc;
        // one millisecond of emulated time is ~1790 cycles
        nes.run_for(Duration::from_millis(1)).unwrap();
        let spent = nes.snapshot().cyc - before;
        assert!(spent >= 1_789, "only {spent} cycles ran");
        assert!(spent < 1_900, "{spent} cycles is far past the budget");
    }
}
