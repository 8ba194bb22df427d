//! 65816 architecture tables.

mod opcodes;
mod registers;

pub use opcodes::{argument_size, AddressMode, Op, OPCODE_TABLE};
pub use registers::hardware_register;
