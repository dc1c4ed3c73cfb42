use super::bytecode::{Chunk, DecodeError, Instruction};
use super::value::Value;
use std::fmt::{self, Write};

pub fn disassemble_chunk_to_string(chunk: &Chunk, name: &str) -> String {
    let mut output = String::new();
    let _ = disassemble_chunk(chunk, name, &mut output);
    output
}

pub fn disassemble_chunk(chunk: &Chunk, name: &str, w: &mut impl Write) -> fmt::Result {
    writeln!(w, "=== {} ===", name)?;
    writeln!(w)?;

    writeln!(w, "Code ({} bytes):", chunk.len())?;
    for (offset, ins) in chunk.instructions() {
        write!(w, "  ")?;
        write_instruction(chunk, offset, ins, w)?;
        writeln!(w)?;
    }
    writeln!(w)?;

    writeln!(w, "Constants ({}):", chunk.constants().len())?;
    for (i, c) in chunk.constants().iter().enumerate() {
        writeln!(w, "  {:3}: {}", i, literal(c))?;
    }

    Ok(())
}

/// One-line listing of the instruction at `offset`.
pub fn disassemble_instruction_to_string(chunk: &Chunk, offset: usize) -> String {
    let mut output = String::new();
    let ins = chunk.decode(offset).map(|(ins, _)| ins);
    let _ = write_instruction(chunk, offset, ins, &mut output);
    output
}

fn write_instruction(
    chunk: &Chunk,
    offset: usize,
    ins: Result<Instruction, DecodeError>,
    w: &mut impl Write,
) -> fmt::Result {
    match chunk.line(offset) {
        Some(line) => write!(w, "{:04} {:4} ", offset, line)?,
        None => write!(w, "{:04}    ? ", offset)?,
    }
    let ins = match ins {
        Ok(ins) => ins,
        Err(e) => return write!(w, "<{}>", e),
    };
    let name = format!("OP_{}", ins.opcode());
    match ins.operand() {
        Some(ix) => {
            let shown = chunk
                .constant(ix)
                .map(literal)
                .unwrap_or_else(|| "<missing>".to_string());
            write!(w, "{:<18} {:3} ({})", name, ix, shown)
        }
        None => write!(w, "{}", name),
    }
}

/// Constants as they would appear in source: strings quoted.
fn literal(v: &Value) -> String {
    match v {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}
