use super::value::Value;
use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr};

/// One-byte opcodes. The discriminants are the on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum OpCode {
    Return = 0,
    Negate = 1,
    /// Followed by a constant-pool index byte.
    Constant = 2,
    Add = 3,
    Subtract = 4,
    Multiply = 5,
    Divide = 6,
    Nil = 7,
    True = 8,
    False = 9,
    Not = 10,
    Equal = 11,
    Greater = 12,
    Lesser = 13,
    /// Followed by the constant index of the variable name.
    DefineGlobal = 14,
    GetGlobal = 15,
    SetGlobal = 16,
    Pop = 17,
    Print = 18,
}

/// A decoded instruction with its inline operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Return,
    Negate,
    Constant(u8),
    Add,
    Subtract,
    Multiply,
    Divide,
    Nil,
    True,
    False,
    Not,
    Equal,
    Greater,
    Lesser,
    DefineGlobal(u8),
    GetGlobal(u8),
    SetGlobal(u8),
    Pop,
    Print,
}

impl Instruction {
    pub fn opcode(self) -> OpCode {
        match self {
            Instruction::Return => OpCode::Return,
            Instruction::Negate => OpCode::Negate,
            Instruction::Constant(_) => OpCode::Constant,
            Instruction::Add => OpCode::Add,
            Instruction::Subtract => OpCode::Subtract,
            Instruction::Multiply => OpCode::Multiply,
            Instruction::Divide => OpCode::Divide,
            Instruction::Nil => OpCode::Nil,
            Instruction::True => OpCode::True,
            Instruction::False => OpCode::False,
            Instruction::Not => OpCode::Not,
            Instruction::Equal => OpCode::Equal,
            Instruction::Greater => OpCode::Greater,
            Instruction::Lesser => OpCode::Lesser,
            Instruction::DefineGlobal(_) => OpCode::DefineGlobal,
            Instruction::GetGlobal(_) => OpCode::GetGlobal,
            Instruction::SetGlobal(_) => OpCode::SetGlobal,
            Instruction::Pop => OpCode::Pop,
            Instruction::Print => OpCode::Print,
        }
    }

    pub fn operand(self) -> Option<u8> {
        match self {
            Instruction::Constant(ix)
            | Instruction::DefineGlobal(ix)
            | Instruction::GetGlobal(ix)
            | Instruction::SetGlobal(ix) => Some(ix),
            _ => None,
        }
    }

    /// Encoded size in bytes.
    pub fn width(self) -> usize {
        1 + usize::from(self.operand().is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("{0} is missing its operand byte")]
    MissingOperand(OpCode),
    #[error("offset {0} is past the end of the chunk")]
    OutOfBounds(usize),
}

/// One compiled unit: code bytes, a parallel line table and a constant pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    code: Vec<u8>,
    /// Source line of every byte in `code`.
    lines: Vec<usize>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op as u8, line);
    }

    /// Appends to the constant pool and returns the new index. Callers must
    /// reject indices that do not fit in an operand byte.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn constant(&self, index: u8) -> Option<&Value> {
        self.constants.get(index as usize)
    }

    pub fn line(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// False only for chunks built outside `write` (e.g. a corrupt file).
    pub fn is_well_formed(&self) -> bool {
        self.code.len() == self.lines.len()
    }

    /// Decodes the instruction at `offset`, returning it with its width.
    pub fn decode(&self, offset: usize) -> Result<(Instruction, usize), DecodeError> {
        let byte = *self
            .code
            .get(offset)
            .ok_or(DecodeError::OutOfBounds(offset))?;
        let op = OpCode::from_repr(byte).ok_or(DecodeError::UnknownOpcode(byte))?;
        let operand = || {
            self.code
                .get(offset + 1)
                .copied()
                .ok_or(DecodeError::MissingOperand(op))
        };
        let ins = match op {
            OpCode::Return => Instruction::Return,
            OpCode::Negate => Instruction::Negate,
            OpCode::Constant => Instruction::Constant(operand()?),
            OpCode::Add => Instruction::Add,
            OpCode::Subtract => Instruction::Subtract,
            OpCode::Multiply => Instruction::Multiply,
            OpCode::Divide => Instruction::Divide,
            OpCode::Nil => Instruction::Nil,
            OpCode::True => Instruction::True,
            OpCode::False => Instruction::False,
            OpCode::Not => Instruction::Not,
            OpCode::Equal => Instruction::Equal,
            OpCode::Greater => Instruction::Greater,
            OpCode::Lesser => Instruction::Lesser,
            OpCode::DefineGlobal => Instruction::DefineGlobal(operand()?),
            OpCode::GetGlobal => Instruction::GetGlobal(operand()?),
            OpCode::SetGlobal => Instruction::SetGlobal(operand()?),
            OpCode::Pop => Instruction::Pop,
            OpCode::Print => Instruction::Print,
        };
        Ok((ins, ins.width()))
    }

    /// Iterates over `(offset, decoded)` pairs; stops after the first decode error.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            chunk: self,
            offset: 0,
            failed: false,
        }
    }
}

pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = (usize, Result<Instruction, DecodeError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.chunk.len() {
            return None;
        }
        let offset = self.offset;
        match self.chunk.decode(offset) {
            Ok((ins, width)) => {
                self.offset += width;
                Some((offset, Ok(ins)))
            }
            Err(e) => {
                self.failed = true;
                Some((offset, Err(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_keeps_lines_parallel() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 1);
        chunk.write_op(OpCode::Constant, 2);
        chunk.write(0, 2);
        chunk.write_op(OpCode::Return, 3);
        assert_eq!(chunk.len(), 4);
        assert_eq!(chunk.lines(), &[1, 2, 2, 3]);
        assert!(chunk.is_well_formed());
        assert_eq!(chunk.line(3), Some(3));
        assert_eq!(chunk.line(4), None);
    }

    #[test]
    fn test_add_constant_returns_index() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::from("x")), 1);
        assert_eq!(chunk.constant(1), Some(&Value::from("x")));
        assert_eq!(chunk.constant(2), None);
    }

    #[test]
    fn test_decode_reports_width() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::GetGlobal, 1);
        chunk.write(7, 1);
        chunk.write_op(OpCode::Negate, 1);
        assert_eq!(chunk.decode(0), Ok((Instruction::GetGlobal(7), 2)));
        assert_eq!(chunk.decode(2), Ok((Instruction::Negate, 1)));
        assert_eq!(chunk.decode(3), Err(DecodeError::OutOfBounds(3)));
    }

    #[test]
    fn test_decode_rejects_bad_bytes() {
        let mut chunk = Chunk::new();
        chunk.write(200, 1);
        assert_eq!(chunk.decode(0), Err(DecodeError::UnknownOpcode(200)));

        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        assert_eq!(
            chunk.decode(0),
            Err(DecodeError::MissingOperand(OpCode::Constant))
        );
    }

    #[test]
    fn test_only_name_and_constant_ops_are_two_bytes() {
        let mut wide = vec![];
        for byte in 0..=u8::MAX {
            let mut chunk = Chunk::new();
            chunk.write(byte, 1);
            chunk.write(0, 1);
            if let Ok((ins, width)) = chunk.decode(0) {
                assert_eq!(width, 1 + usize::from(ins.operand().is_some()));
                if width == 2 {
                    wide.push(ins.opcode());
                }
            }
        }
        assert_eq!(
            wide,
            vec![
                OpCode::Constant,
                OpCode::DefineGlobal,
                OpCode::GetGlobal,
                OpCode::SetGlobal
            ]
        );
    }

    #[test]
    fn test_opcode_bytes_are_stable() {
        assert_eq!(OpCode::Return as u8, 0);
        assert_eq!(OpCode::Constant as u8, 2);
        assert_eq!(OpCode::Print as u8, 18);
        assert_eq!(OpCode::from_repr(16), Some(OpCode::SetGlobal));
        assert_eq!(OpCode::from_repr(19), None);
        assert_eq!(OpCode::DefineGlobal.to_string(), "DEFINE_GLOBAL");
    }

    #[test]
    fn test_instructions_iterator_walks_operands() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(0, 1);
        chunk.write_op(OpCode::Print, 1);
        chunk.write_op(OpCode::Return, 1);
        let offsets: Vec<_> = chunk.instructions().map(|(offset, _)| offset).collect();
        assert_eq!(offsets, vec![0, 2, 3]);
    }
}
