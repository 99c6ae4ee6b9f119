//! Dalvik opcode metadata: formats, sizes, register shapes and the opcode table.

pub mod opcode_format;
pub mod opcodes;

pub use opcode_format::{Format, Opcode, OpcodeClass, OpcodeFlags, ReferenceType, RegisterShape};
pub use opcodes::Op;
