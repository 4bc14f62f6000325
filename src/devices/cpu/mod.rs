//! The 6502 interpreter: register file, opcode table and execution engine.

#[allow(clippy::module_inception)]
mod cpu;
mod opcodes;
mod structs;

pub use cpu::Cpu;
pub use opcodes::{Handler, Opcode, OPCODES};
pub use structs::{AddrMode, CpuState, Mnemonic, Status, POWERON_CPU_STATE};
