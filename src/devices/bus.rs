//! The address-dispatch fabric connecting a processor to its devices.
//!
//! A [`Bus`] owns an ordered set of [`Device`]s, each claiming one inclusive
//! range of the 16-bit address space. Dispatch goes through a table keyed by
//! the high byte of the address, so the hot path is an index and a match
//! rather than a scan. Claims are checked when a device is attached: every
//! page belongs to at most one device, and a claim must cover whole pages.

use std::cell::RefCell;
use std::rc::Rc;

use super::mem::{ApuStub, PrgRom, WorkRam};
use super::ppu::registers::PpuRegisters;
use super::ppu::vram::{NameTable, PaletteRam, PatternTable};
use crate::error::EmuError;

/// An inclusive range of bus addresses a device answers for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AddrRange {
    pub start: u16,
    pub end: u16,
}

impl AddrRange {
    pub const fn new(start: u16, end: u16) -> AddrRange {
        AddrRange { start, end }
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.start <= addr && addr <= self.end
    }
}

/// The closed set of devices this machine can mount.
///
/// The hardware device list is fixed, so the bus dispatches over an enum
/// instead of trait objects. The PPU register file is shared with the PPU
/// core and therefore mounts as a cell.
pub enum Device {
    WorkRam(WorkRam),
    PrgRom(PrgRom),
    ApuStub(ApuStub),
    PpuPorts(Rc<RefCell<PpuRegisters>>),
    PatternTable(PatternTable),
    NameTable(NameTable),
    PaletteRam(PaletteRam),
}

impl Device {
    /// The address range this device claims on its bus.
    pub fn claim(&self) -> AddrRange {
        match self {
            Device::WorkRam(dev) => dev.claim(),
            Device::PrgRom(dev) => dev.claim(),
            Device::ApuStub(dev) => dev.claim(),
            Device::PpuPorts(ports) => ports.borrow().claim(),
            Device::PatternTable(dev) => dev.claim(),
            Device::NameTable(dev) => dev.claim(),
            Device::PaletteRam(dev) => dev.claim(),
        }
    }

    fn read(&mut self, addr: u16) -> Result<u8, EmuError> {
        match self {
            Device::WorkRam(dev) => Ok(dev.read(addr)),
            Device::PrgRom(dev) => Ok(dev.read(addr)),
            Device::ApuStub(dev) => Ok(dev.read(addr)),
            Device::PpuPorts(ports) => ports.borrow_mut().read(addr),
            Device::PatternTable(dev) => Ok(dev.read(addr)),
            Device::NameTable(dev) => Ok(dev.read(addr)),
            Device::PaletteRam(dev) => Ok(dev.read(addr)),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<bool, EmuError> {
        match self {
            Device::WorkRam(dev) => Ok(dev.write(addr, value)),
            Device::PrgRom(dev) => Ok(dev.write(addr, value)),
            Device::ApuStub(dev) => Ok(dev.write(addr, value)),
            Device::PpuPorts(ports) => ports.borrow_mut().write(addr, value),
            Device::PatternTable(dev) => Ok(dev.write(addr, value)),
            Device::NameTable(dev) => Ok(dev.write(addr, value)),
            Device::PaletteRam(dev) => Ok(dev.write(addr, value)),
        }
    }
}

/// A 16-bit address bus with page-granular dispatch.
pub struct Bus {
    devices: Vec<Device>,
    /// Page number (address high byte) to index into `devices`.
    pages: [Option<u8>; 256],
}

impl Bus {
    pub fn new() -> Bus {
        Bus {
            devices: Vec::new(),
            pages: [None; 256],
        }
    }

    /// Mount a device, claiming its address range.
    ///
    /// Fails eagerly if the claim is not page aligned or any page in it is
    /// already taken; the bus is left unchanged on failure.
    pub fn attach(&mut self, device: Device) -> Result<(), EmuError> {
        let claim = device.claim();
        if claim.start & 0x00FF != 0 || claim.end & 0x00FF != 0xFF || claim.start > claim.end {
            return Err(EmuError::UnalignedClaim {
                start: claim.start,
                end: claim.end,
            });
        }
        let first = (claim.start >> 8) as usize;
        let last = (claim.end >> 8) as usize;
        for page in first..=last {
            if self.pages[page].is_some() {
                return Err(EmuError::OverlappingClaim(page as u8));
            }
        }
        let index = self.devices.len() as u8;
        for page in first..=last {
            self.pages[page] = Some(index);
        }
        self.devices.push(device);
        Ok(())
    }

    /// Read a byte, triggering any device side effects.
    pub fn read(&mut self, addr: u16) -> Result<u8, EmuError> {
        match self.pages[(addr >> 8) as usize] {
            Some(index) => self.devices[index as usize].read(addr),
            None => Err(EmuError::UnmappedAddress(addr)),
        }
    }

    /// Write a byte. Returns whether the device accepted it (ROMs refuse).
    pub fn write(&mut self, addr: u16, value: u8) -> Result<bool, EmuError> {
        match self.pages[(addr >> 8) as usize] {
            Some(index) => self.devices[index as usize].write(addr, value),
            None => Err(EmuError::UnmappedAddress(addr)),
        }
    }
}

impl Default for Bus {
    fn default() -> Bus {
        Bus::new()
    }
}
