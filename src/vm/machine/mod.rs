// machine module - the bytecode execution engine.
//
// One `Vm` owns an operand stack and a global table; the table survives
// across `interpret` calls so a REPL session keeps its variables.

use crate::compiler;
use crate::runtime_io::{RuntimeIo, StdIo};
use crate::vm::bytecode::{Chunk, DecodeError};
use crate::vm::disasm;
use crate::vm::value::Value;
use std::collections::HashMap;

mod instruction;


use instruction::ExecutionFlow;

// ========== Types ==========

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmErrorKind {
    #[error("Operand must be a number.")]
    OperandNotNumber,
    #[error("Operands must be numbers.")]
    OperandsNotNumbers,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("constant index {0} is out of range")]
    InvalidConstant(u8),
    #[error("global name must be a string, found {0}")]
    InvalidGlobalName(&'static str),
    #[error("malformed bytecode: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Runtime Error: {kind} at line {line}")]
pub struct VmError {
    pub kind: VmErrorKind,
    /// Source line of the failing instruction (0 if the chunk has no entry).
    pub line: usize,
}

pub type VmResult<T> = Result<T, VmError>;

/// Per-instruction result before a line number is attached.
type ExecResult<T> = Result<T, VmErrorKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum operand stack depth.
    pub max_stack: usize,
    /// Write the stack and each instruction to the error channel before executing it.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_stack: 1024,
            trace: false,
        }
    }
}

pub struct Vm {
    stack: Vec<Value>,
    globals: HashMap<String, Value>,
    pub config: VmConfig,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

// ========== VM ==========

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::with_capacity(128),
            globals: HashMap::new(),
            config,
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Compiles and runs `source`, printing to stdout and diagnostics to stderr.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        self.interpret_with_io(source, &mut StdIo)
    }

    pub fn interpret_with_io<IO: RuntimeIo>(&mut self, source: &str, io: &mut IO) -> InterpretResult {
        let compiled = compiler::compile(source);
        if !compiled.is_ok() {
            for diagnostic in &compiled.diagnostics {
                io.write_error(&diagnostic.to_string());
            }
            return InterpretResult::CompileError;
        }
        self.interpret_chunk_with_io(&compiled.chunk, io)
    }

    pub fn interpret_chunk(&mut self, chunk: &Chunk) -> InterpretResult {
        self.interpret_chunk_with_io(chunk, &mut StdIo)
    }

    pub fn interpret_chunk_with_io<IO: RuntimeIo>(
        &mut self,
        chunk: &Chunk,
        io: &mut IO,
    ) -> InterpretResult {
        match self.run(chunk, io) {
            Ok(()) => InterpretResult::Ok,
            Err(e) => {
                io.write_error(&e.to_string());
                InterpretResult::RuntimeError
            }
        }
    }

    /// Executes `chunk` until `RETURN`, the end of the code, or the first
    /// runtime error. On error the operand stack is emptied.
    pub fn run<IO: RuntimeIo>(&mut self, chunk: &Chunk, io: &mut IO) -> VmResult<()> {
        let mut ip = 0;
        while ip < chunk.len() {
            match self.step(chunk, ip, io) {
                Ok((ExecutionFlow::Continue, width)) => ip += width,
                Ok((ExecutionFlow::Return, _)) => return Ok(()),
                Err(kind) => {
                    self.reset_stack();
                    return Err(VmError {
                        kind,
                        line: chunk.line(ip).unwrap_or(0),
                    });
                }
            }
        }
        Ok(())
    }

    fn step<IO: RuntimeIo>(
        &mut self,
        chunk: &Chunk,
        ip: usize,
        io: &mut IO,
    ) -> ExecResult<(ExecutionFlow, usize)> {
        let (ins, width) = chunk.decode(ip)?;
        if self.config.trace {
            self.trace(chunk, ip, io);
        }
        let flow = self.execute_instruction(ins, chunk, io)?;
        Ok((flow, width))
    }

    fn trace<IO: RuntimeIo>(&self, chunk: &Chunk, ip: usize, io: &mut IO) {
        let slots: String = self.stack.iter().map(|v| format!("[ {} ]", v)).collect();
        io.write_error(&format!("          {}", slots));
        io.write_error(&disasm::disassemble_instruction_to_string(chunk, ip));
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    // ========== Stack operations ==========

    fn push(&mut self, v: Value) -> ExecResult<()> {
        if self.stack.len() >= self.config.max_stack {
            return Err(VmErrorKind::StackOverflow);
        }
        self.stack.push(v);
        Ok(())
    }

    fn pop(&mut self) -> ExecResult<Value> {
        self.stack.pop().ok_or(VmErrorKind::StackUnderflow)
    }

    fn peek(&self, distance: usize) -> ExecResult<&Value> {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .and_then(|ix| self.stack.get(ix))
            .ok_or(VmErrorKind::StackUnderflow)
    }
}
