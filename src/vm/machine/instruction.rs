use super::{ExecResult, Vm, VmErrorKind};
use crate::runtime_io::RuntimeIo;
use crate::vm::bytecode::{Chunk, Instruction as I};
use crate::vm::value::Value;

/// What the dispatch loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExecutionFlow {
    /// Continue with the next instruction.
    Continue,
    /// Stop; the chunk finished normally.
    Return,
}

/// Name operand of a global-variable instruction.
fn global_name(chunk: &Chunk, ix: u8) -> ExecResult<&str> {
    let constant = chunk.constant(ix).ok_or(VmErrorKind::InvalidConstant(ix))?;
    constant
        .as_str()
        .ok_or(VmErrorKind::InvalidGlobalName(constant.type_name()))
}

impl Vm {
    /// Executes one decoded instruction (dispatcher).
    pub(super) fn execute_instruction<IO: RuntimeIo>(
        &mut self,
        ins: I,
        chunk: &Chunk,
        io: &mut IO,
    ) -> ExecResult<ExecutionFlow> {
        match ins {
            // ===== constants =====
            I::Constant(ix) => self.handle_constant(ix, chunk),
            I::Nil => self.handle_literal(Value::Nil),
            I::True => self.handle_literal(Value::Bool(true)),
            I::False => self.handle_literal(Value::Bool(false)),

            // ===== arithmetic =====
            I::Negate => self.handle_negate(),
            I::Add => self.handle_arithmetic(|a, b| a + b),
            I::Subtract => self.handle_arithmetic(|a, b| a - b),
            I::Multiply => self.handle_arithmetic(|a, b| a * b),
            // IEEE-754 division: x/0 is ±inf or NaN, never an error.
            I::Divide => self.handle_arithmetic(|a, b| a / b),

            // ===== comparison / logic =====
            I::Not => self.handle_not(),
            I::Equal => self.handle_equal(),
            I::Greater => self.handle_comparison(|a, b| a > b),
            I::Lesser => self.handle_comparison(|a, b| a < b),

            // ===== globals =====
            I::DefineGlobal(ix) => self.handle_define_global(ix, chunk),
            I::GetGlobal(ix) => self.handle_get_global(ix, chunk),
            I::SetGlobal(ix) => self.handle_set_global(ix, chunk),

            // ===== statements =====
            I::Print => self.handle_print(io),
            I::Pop => self.handle_pop(),
            I::Return => Ok(ExecutionFlow::Return),
        }
    }

    // ==================== constants ====================

    fn handle_constant(&mut self, ix: u8, chunk: &Chunk) -> ExecResult<ExecutionFlow> {
        let v = chunk
            .constant(ix)
            .cloned()
            .ok_or(VmErrorKind::InvalidConstant(ix))?;
        self.push(v)?;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_literal(&mut self, v: Value) -> ExecResult<ExecutionFlow> {
        self.push(v)?;
        Ok(ExecutionFlow::Continue)
    }

    // ==================== arithmetic ====================

    fn handle_negate(&mut self) -> ExecResult<ExecutionFlow> {
        match self.stack.last_mut() {
            Some(Value::Number(n)) => {
                *n = -*n;
                Ok(ExecutionFlow::Continue)
            }
            Some(_) => Err(VmErrorKind::OperandNotNumber),
            None => Err(VmErrorKind::StackUnderflow),
        }
    }

    fn handle_arithmetic(&mut self, op: fn(f64, f64) -> f64) -> ExecResult<ExecutionFlow> {
        let (b, a) = (self.pop()?, self.pop()?);
        let result = a
            .numeric_binary(&b, |x, y| Value::Number(op(x, y)))
            .ok_or(VmErrorKind::OperandsNotNumbers)?;
        self.push(result)?;
        Ok(ExecutionFlow::Continue)
    }

    // ==================== comparison / logic ====================

    fn handle_comparison(&mut self, op: fn(f64, f64) -> bool) -> ExecResult<ExecutionFlow> {
        let (b, a) = (self.pop()?, self.pop()?);
        let result = a
            .numeric_binary(&b, |x, y| Value::Bool(op(x, y)))
            .ok_or(VmErrorKind::OperandsNotNumbers)?;
        self.push(result)?;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_not(&mut self) -> ExecResult<ExecutionFlow> {
        let v = self.pop()?;
        self.push(Value::Bool(v.is_falsey()))?;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_equal(&mut self) -> ExecResult<ExecutionFlow> {
        let (b, a) = (self.pop()?, self.pop()?);
        self.push(Value::Bool(a == b))?;
        Ok(ExecutionFlow::Continue)
    }

    // ==================== globals ====================

    fn handle_define_global(&mut self, ix: u8, chunk: &Chunk) -> ExecResult<ExecutionFlow> {
        let name = global_name(chunk, ix)?;
        let v = self.peek(0)?.clone();
        self.globals.insert(name.to_string(), v);
        self.pop()?;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_get_global(&mut self, ix: u8, chunk: &Chunk) -> ExecResult<ExecutionFlow> {
        let name = global_name(chunk, ix)?;
        let v = self
            .globals
            .get(name)
            .cloned()
            .ok_or_else(|| VmErrorKind::UndefinedVariable(name.to_string()))?;
        self.push(v)?;
        Ok(ExecutionFlow::Continue)
    }

    /// Assignment is an expression: the value stays on the stack.
    fn handle_set_global(&mut self, ix: u8, chunk: &Chunk) -> ExecResult<ExecutionFlow> {
        let name = global_name(chunk, ix)?;
        let v = self.peek(0)?.clone();
        let slot = self
            .globals
            .get_mut(name)
            .ok_or_else(|| VmErrorKind::UndefinedVariable(name.to_string()))?;
        *slot = v;
        Ok(ExecutionFlow::Continue)
    }

    // ==================== statements ====================

    fn handle_print<IO: RuntimeIo>(&mut self, io: &mut IO) -> ExecResult<ExecutionFlow> {
        let v = self.pop()?;
        io.write_line(&v.to_string());
        Ok(ExecutionFlow::Continue)
    }

    fn handle_pop(&mut self) -> ExecResult<ExecutionFlow> {
        self.pop()?;
        Ok(ExecutionFlow::Continue)
    }
}
