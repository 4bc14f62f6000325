//! The picture processing unit: register file, video memories and the
//! scanline state machine.

#[allow(clippy::module_inception)]
mod ppu;
pub mod registers;
mod structs;
pub mod vram;

pub use ppu::{Frame, Ppu, FRAME_HEIGHT, FRAME_WIDTH};
pub use structs::{CtrlFlags, MaskFlags, StatusFlags, PALETTE};
