/// Abstraction over runtime I/O so the VM can remain pure w.r.t. environment.
///
/// `write_line`/`write` carry program output (`print`); `write_error` is the
/// diagnostic channel used for compile errors, runtime errors and traces.
pub trait RuntimeIo {
    fn write_line(&mut self, s: &str);
    fn write(&mut self, s: &str);
    fn write_error(&mut self, s: &str);
}

/// Default I/O that talks to process stdout/stderr (CLI use).
pub struct StdIo;

impl RuntimeIo for StdIo {
    fn write_line(&mut self, s: &str) {
        println!("{}", s);
    }
    fn write(&mut self, s: &str) {
        use std::io::Write;
        print!("{}", s);
        let _ = std::io::stdout().flush();
    }
    fn write_error(&mut self, s: &str) {
        eprintln!("{}", s);
    }
}

/// Buffer-based I/O for tests and embedding: output and diagnostics are
/// accumulated separately.
#[derive(Debug, Default)]
pub struct BufferIo {
    output: String,
    errors: Vec<String>,
}

impl BufferIo {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn take_output(self) -> String {
        self.output
    }
    pub fn get_output(&self) -> &str {
        &self.output
    }
    pub fn drain_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
    pub fn get_errors(&self) -> &[String] {
        &self.errors
    }
    pub fn drain_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}

impl RuntimeIo for BufferIo {
    fn write_line(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }
    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }
    fn write_error(&mut self, s: &str) {
        self.errors.push(s.to_string());
    }
}
