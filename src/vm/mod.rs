pub mod bytecode;
pub mod disasm;
pub mod machine;
pub mod value;

pub use bytecode::{Chunk, DecodeError, Instruction, OpCode};
pub use machine::{InterpretResult, Vm, VmConfig, VmError, VmErrorKind, VmResult};
pub use value::Value;
