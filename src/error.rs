//! Error kinds surfaced by the emulator core.
//!
//! Arithmetic inside instruction handlers is never an error: byte and word
//! math wraps modulo 256/65536 by contract. The variants here cover the
//! genuinely fatal conditions (a bus access nothing claims) and the
//! before-run configuration failures (a bad ROM image, a misconfigured bus).

use thiserror::Error;

/// Errors produced while parsing an iNES container image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RomError {
    #[error("not an iNES image (bad magic)")]
    BadMagic,

    #[error("truncated image: {section} wants {expected} bytes, {found} remain")]
    Truncated {
        section: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{section} size {found} is not a whole number of banks")]
    BadSize {
        section: &'static str,
        found: usize,
    },

    #[error("mapper {0} is not supported (only mapper 0 is wired)")]
    UnsupportedMapper(u8),
}

/// Fatal runtime and configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmuError {
    /// A bus access hit an address that no attached device claims.
    #[error("no device claims address ${0:04X}")]
    UnmappedAddress(u16),

    /// Two devices claimed the same 256-byte page. Caught when the second
    /// device is attached, before the machine ever runs.
    #[error("two devices claim page ${0:02X}xx")]
    OverlappingClaim(u8),

    /// A device claim does not start and end on a page boundary.
    #[error("device claim ${start:04X}..=${end:04X} is not page aligned")]
    UnalignedClaim { start: u16, end: u16 },

    #[error(transparent)]
    Rom(#[from] RomError),
}
