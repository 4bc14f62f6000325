//! Register bit assignments and the fixed output palette.

bitflags! {
    /// Fields of the control register ($2000).
    pub struct CtrlFlags: u8 {
        /// Which nametable the background comes from.
        const NAMETABLE_SELECT = 0x03;
        /// $2007 access step: 0 adds 1, 1 adds 32.
        const VRAM_INCREMENT_32 = 0x04;
        /// Pattern bank for sprite tiles.
        const SPRITE_TILE_BANK = 0x08;
        /// Pattern bank for background tiles.
        const BG_TILE_BANK = 0x10;
        /// 8x16 sprites when set.
        const TALL_SPRITES = 0x20;
        /// Grounded EXT-pin mode select. Never set by well-behaved programs.
        const EXT_MASTER = 0x40;
        /// Raise the NMI line on entering vertical blank.
        const NMI_ON_VBLANK = 0x80;
    }
}

bitflags! {
    /// Fields of the mask register ($2001). Stored but not acted on by the
    /// background renderer.
    pub struct MaskFlags: u8 {
        const GRAYSCALE = 0x01;
        const BG_LEFT_COLUMN = 0x02;
        const SPRITE_LEFT_COLUMN = 0x04;
        const BG_ENABLE = 0x08;
        const SPRITE_ENABLE = 0x10;
        const EMPHASIZE_RED = 0x20;
        const EMPHASIZE_GREEN = 0x40;
        const EMPHASIZE_BLUE = 0x80;
    }
}

bitflags! {
    /// Fields of the status register ($2002). Only the top three bits are
    /// real; reads return the rest as zero.
    pub struct StatusFlags: u8 {
        const SPRITE_OVERFLOW = 0x20;
        const SPRITE_0_HIT = 0x40;
        const VBLANK = 0x80;
    }
}

/// The 64-colour composite output palette, as RGB triples.
#[rustfmt::skip]
pub const PALETTE: [[u8; 3]; 64] = [
    // $0x
    [101, 101, 101], [0, 45, 105],    [19, 31, 127],   [60, 19, 124],
    [96, 11, 98],    [115, 10, 55],   [113, 15, 7],    [90, 26, 0],
    [52, 40, 0],     [11, 52, 0],     [0, 60, 0],      [0, 61, 16],
    [0, 56, 64],     [0, 0, 0],       [0, 0, 0],       [0, 0, 0],
    // $1x
    [174, 174, 174], [15, 99, 179],   [64, 81, 208],   [120, 65, 204],
    [167, 54, 169],  [192, 52, 112],  [189, 60, 48],   [159, 74, 0],
    [109, 92, 0],    [54, 109, 0],    [7, 119, 4],     [0, 121, 61],
    [0, 114, 125],   [0, 0, 0],       [0, 0, 0],       [0, 0, 0],
    // $2x
    [254, 254, 255], [93, 179, 255],  [143, 161, 255], [200, 144, 255],
    [247, 133, 250], [255, 131, 192], [255, 139, 127], [239, 154, 73],
    [189, 172, 44],  [133, 188, 47],  [85, 199, 83],   [60, 201, 140],
    [62, 194, 205],  [78, 78, 78],    [0, 0, 0],       [0, 0, 0],
    // $3x
    [254, 254, 255], [188, 223, 255], [209, 216, 255], [232, 209, 255],
    [251, 205, 253], [255, 204, 229], [255, 207, 202], [248, 213, 180],
    [228, 220, 168], [204, 227, 169], [185, 232, 184], [174, 232, 208],
    [175, 229, 234], [182, 182, 182], [0, 0, 0],       [0, 0, 0],
];
