//! Parser for the iNES container format.
//!
//! A 16 byte header, an optional 512 byte trainer, then PRG in 16 KiB units
//! and CHR in 8 KiB units. Only mapper 0 is accepted; everything the header
//! says is kept on the [`InesHeader`] even when this core does not act on it.

use tracing::info;

use crate::error::RomError;

bitflags! {
    /// Header byte 6: mirroring, battery, trainer, four-screen and the low
    /// mapper nibble.
    pub struct InesFlags6: u8 {
        /// 0 = horizontal mirroring, 1 = vertical.
        const MIRRORING = 0x01;
        /// Battery-backed RAM at $6000-$7FFF.
        const HAS_BATTERY = 0x02;
        /// A 512 byte trainer sits between the header and PRG.
        const HAS_TRAINER = 0x04;
        /// Four-screen VRAM instead of mirroring.
        const FOUR_SCREEN_VRAM = 0x08;
        /// Low nibble of the mapper number.
        const LOWER_MAPPER_NIBBLE = 0xF0;
    }
}

bitflags! {
    /// Header byte 7: console variant flags and the high mapper nibble.
    pub struct InesFlags7: u8 {
        const VS_UNISYSTEM = 0x01;
        const PLAYCHOICE_10 = 0x02;
        /// Equal to 2 when the rest of the header is iNES 2.0.
        const INES_2_0 = 0x0C;
        /// High nibble of the mapper number.
        const UPPER_MAPPER_NIBBLE = 0xF0;
    }
}

/// The decoded 16 byte header.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InesHeader {
    /// PRG size in 16 KiB banks.
    pub prg_banks: usize,
    /// CHR size in 8 KiB banks. Zero means the cartridge supplies CHR RAM.
    pub chr_banks: usize,
    pub flags_6: InesFlags6,
    pub flags_7: InesFlags7,
}

impl InesHeader {
    /// The mapper number assembled from both header nibbles.
    pub fn mapper(&self) -> u8 {
        (self.flags_7 & InesFlags7::UPPER_MAPPER_NIBBLE).bits()
            | (self.flags_6 & InesFlags6::LOWER_MAPPER_NIBBLE).bits() >> 4
    }

    pub fn has_trainer(&self) -> bool {
        self.flags_6.contains(InesFlags6::HAS_TRAINER)
    }
}

/// A parsed ROM image: the header plus the raw PRG and CHR blocks.
#[derive(Debug)]
pub struct Rom {
    pub header: InesHeader,
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
}

const MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];

impl Rom {
    /// Parse a complete image. The trainer, when present, is skipped.
    pub fn parse(buf: &[u8]) -> Result<Rom, RomError> {
        if buf.len() < 16 {
            return Err(RomError::Truncated {
                section: "header",
                expected: 16,
                found: buf.len(),
            });
        }
        if buf[0..4] != MAGIC {
            return Err(RomError::BadMagic);
        }
        let header = InesHeader {
            prg_banks: buf[4] as usize,
            chr_banks: buf[5] as usize,
            flags_6: InesFlags6::from_bits_truncate(buf[6]),
            flags_7: InesFlags7::from_bits_truncate(buf[7]),
        };
        if header.mapper() != 0 {
            return Err(RomError::UnsupportedMapper(header.mapper()));
        }
        // mapper 0 hardware decodes at most two PRG banks and one CHR bank
        if header.prg_banks == 0 || header.prg_banks > 2 {
            return Err(RomError::BadSize {
                section: "PRG",
                found: header.prg_banks * 0x4000,
            });
        }
        if header.chr_banks > 1 {
            return Err(RomError::BadSize {
                section: "CHR",
                found: header.chr_banks * 0x2000,
            });
        }

        let mut offset = 16;
        if header.has_trainer() {
            offset += 512;
        }
        let prg_len = header.prg_banks * 0x4000;
        let chr_len = header.chr_banks * 0x2000;
        let expected = offset + prg_len + chr_len;
        if buf.len() < expected {
            return Err(RomError::Truncated {
                section: "PRG/CHR data",
                expected,
                found: buf.len(),
            });
        }
        let prg = buf[offset..offset + prg_len].to_vec();
        let chr = buf[offset + prg_len..offset + prg_len + chr_len].to_vec();

        info!(
            prg_bytes = prg.len(),
            chr_bytes = chr.len(),
            mapper = header.mapper(),
            trainer = header.has_trainer(),
            "loaded iNES image"
        );
        Ok(Rom { header, prg, chr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_banks: u8, chr_banks: u8, flags_6: u8, flags_7: u8) -> Vec<u8> {
        let mut buf = vec![b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags_6, flags_7];
        buf.resize(16, 0);
        if flags_6 & 0x04 != 0 {
            buf.resize(buf.len() + 512, 0xDD);
        }
        buf.resize(buf.len() + prg_banks as usize * 0x4000, 0xAA);
        buf.resize(buf.len() + chr_banks as usize * 0x2000, 0xBB);
        buf
    }

    #[test]
    fn parses_a_plain_image() {
        let rom = Rom::parse(&image(1, 1, 0x01, 0x00)).unwrap();
        assert_eq!(rom.header.prg_banks, 1);
        assert_eq!(rom.header.chr_banks, 1);
        assert_eq!(rom.header.mapper(), 0);
        assert!(rom.header.flags_6.contains(InesFlags6::MIRRORING));
        assert_eq!(rom.prg.len(), 0x4000);
        assert_eq!(rom.chr.len(), 0x2000);
        assert!(rom.prg.iter().all(|&b| b == 0xAA));
        assert!(rom.chr.iter().all(|&b| b == 0xBB));
    }

    #[test]
    fn skips_the_trainer() {
        let rom = Rom::parse(&image(1, 1, 0x05, 0x00)).unwrap();
        assert!(rom.header.has_trainer());
        // the trainer's 0xDD filler must not leak into PRG
        assert!(rom.prg.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = image(1, 1, 0, 0);
        buf[3] = 0x00;
        assert_eq!(Rom::parse(&buf).unwrap_err(), RomError::BadMagic);
    }

    #[test]
    fn rejects_nonzero_mappers() {
        // mapper 66: high nibble 4 in flags 7, low nibble 2 in flags 6
        let buf = image(1, 1, 0x20, 0x40);
        assert_eq!(Rom::parse(&buf).unwrap_err(), RomError::UnsupportedMapper(66));
    }

    #[test]
    fn rejects_short_data() {
        let mut buf = image(2, 1, 0, 0);
        buf.truncate(16 + 0x4000);
        assert!(matches!(
            Rom::parse(&buf).unwrap_err(),
            RomError::Truncated { .. }
        ));
    }

    #[test]
    fn rejects_headerless_input() {
        assert!(matches!(
            Rom::parse(&[0x4E, 0x45]).unwrap_err(),
            RomError::Truncated { .. }
        ));
    }

    #[test]
    fn chr_ram_images_have_no_chr_block() {
        let rom = Rom::parse(&image(1, 0, 0, 0)).unwrap();
        assert!(rom.chr.is_empty());
    }
}
