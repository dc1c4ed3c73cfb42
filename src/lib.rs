pub mod compiler;
pub mod lexer;
pub mod repl;
pub mod runtime_io;
pub mod vm;

pub use compiler::{Compiled, compile};
pub use vm::{Chunk, InterpretResult, Value, Vm, VmConfig, VmError};

use ariadne::{Color, Label, Report, ReportKind, Source};
use std::fmt;
use std::io;
use std::ops::Range;
use std::path::Path;

/// A compile error: message, source line and byte span of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub span: Range<usize>,
}

impl Diagnostic {
    pub fn format(&self, path: &str, src: &str, kind: &str, code: usize) -> String {
        let mut buffer = Vec::new();
        Report::build(ReportKind::Error, (path, self.span.clone()))
            .with_config(ariadne::Config::new().with_index_type(ariadne::IndexType::Byte))
            .with_code(code)
            .with_message(kind)
            .with_label(
                Label::new((path, self.span.clone()))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((path, Source::from(src)), &mut buffer)
            .ok();
        String::from_utf8_lossy(&buffer).to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Writes a compiled chunk to `path` (bincode).
pub fn save_chunk(chunk: &Chunk, path: impl AsRef<Path>) -> io::Result<()> {
    let cfg = bincode::config::standard();
    let bytes = bincode::serde::encode_to_vec(chunk, cfg).map_err(io::Error::other)?;
    std::fs::write(path, bytes)
}

/// Reads a chunk written by [`save_chunk`]. Corrupt files yield `InvalidData`.
pub fn load_chunk(path: impl AsRef<Path>) -> io::Result<Chunk> {
    let bytes = std::fs::read(path)?;
    let cfg = bincode::config::standard();
    let (chunk, _consumed): (Chunk, usize) = bincode::serde::decode_from_slice(&bytes, cfg)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if !chunk.is_well_formed() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "line table does not match code length",
        ));
    }
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            message: "Expect expression.".to_string(),
            line: 3,
            span: 10..11,
        };
        assert_eq!(d.to_string(), "Line 3: Expect expression.");
    }

    #[test]
    fn test_diagnostic_report_mentions_message() {
        let src = "print ;\n";
        let compiled = compile(src);
        let report = compiled.diagnostics[0].format("<mem>", src, "Compile error", 65);
        assert!(report.contains("Expect expression."));
        assert!(report.contains("Compile error"));
    }

    #[test]
    fn test_chunk_file_roundtrip_runs() {
        let path = std::env::temp_dir().join(format!("lolvm-chunk-{}.lolc", std::process::id()));
        let chunk = compile("var x = 2; print x * 21;").chunk;
        save_chunk(&chunk, &path).unwrap();
        let loaded = load_chunk(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, chunk);

        let mut io = runtime_io::BufferIo::new();
        let mut vm = Vm::new();
        assert_eq!(vm.interpret_chunk_with_io(&loaded, &mut io), InterpretResult::Ok);
        assert_eq!(io.get_output(), "42\n");
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = std::env::temp_dir().join(format!("lolvm-garbage-{}.lolc", std::process::id()));
        std::fs::write(&path, [0xff, 0xff, 0xff]).unwrap();
        let err = load_chunk(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
