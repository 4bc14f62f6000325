use std::fs;
use std::path::Path;

pub const ROM_PATH: &str = "tests/data/nestest.nes";
pub const LOG_PATH: &str = "tests/data/nestest.log";

/// The test ROM and its reference log, or `None` when the checkout does not
/// carry the fixtures (they are not redistributable with the source).
pub fn load_fixtures() -> Option<(Vec<u8>, String)> {
    if !Path::new(ROM_PATH).exists() || !Path::new(LOG_PATH).exists() {
        return None;
    }
    let rom = fs::read(ROM_PATH).ok()?;
    let log = fs::read_to_string(LOG_PATH).ok()?;
    Some((rom, log))
}
