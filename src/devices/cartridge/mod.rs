//! The ROM container format and the fixed PRG/CHR mapping this core supports.

mod ines;

pub use ines::{InesFlags6, InesFlags7, InesHeader, Rom};
