//! Interactive session.
//!
//! Each line is compiled into its own chunk and run on one long-lived `Vm`,
//! so globals defined earlier stay visible.

use crate::compiler::compile;
use crate::runtime_io::RuntimeIo;
use crate::vm::Vm;
use crate::vm::disasm::disassemble_chunk_to_string;

/// REPL 세션 상태
pub struct ReplState {
    pub vm: Vm,
    /// Print each line's bytecode listing before running it.
    pub show_disassembly: bool,
}

impl ReplState {
    pub fn new() -> Self {
        Self {
            vm: Vm::new(),
            show_disassembly: false,
        }
    }

    /// Compiles and runs one line. Program output goes to `io`; a compile or
    /// runtime failure comes back as rendered text and leaves the session usable.
    pub fn eval_line<IO: RuntimeIo>(&mut self, input: &str, io: &mut IO) -> Result<(), String> {
        if input.trim().is_empty() {
            return Ok(());
        }

        let compiled = compile(input);
        if !compiled.is_ok() {
            let mut error_msg = String::new();
            for diag in &compiled.diagnostics {
                error_msg.push_str(&diag.format("<repl>", input, "Compile error", 65));
            }
            return Err(error_msg);
        }

        if self.show_disassembly {
            io.write(&disassemble_chunk_to_string(&compiled.chunk, "<repl>"));
        }

        self.vm.run(&compiled.chunk, io).map_err(|e| e.to_string())
    }

    /// Defined globals, sorted by name, one `name = value` per line.
    pub fn list_globals(&self) -> Vec<String> {
        let mut globals: Vec<_> = self.vm.globals().iter().collect();
        globals.sort_by(|a, b| a.0.cmp(b.0));
        globals
            .into_iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect()
    }
}

impl Default for ReplState {
    fn default() -> Self {
        Self::new()
    }
}

/// 특수 명령어 처리
///
/// Returns `Ok(true)` when the session should end.
pub fn handle_command<IO: RuntimeIo>(
    cmd: &str,
    state: &mut ReplState,
    io: &mut IO,
) -> Result<bool, String> {
    let Some(name) = cmd.split_whitespace().next() else {
        return Ok(false);
    };

    match name {
        ":quit" | ":exit" | ":q" => Ok(true),
        ":help" | ":h" => {
            io.write(HELP);
            Ok(false)
        }
        ":globals" | ":g" => {
            let globals = state.list_globals();
            if globals.is_empty() {
                io.write_line("No globals defined.");
            }
            for line in globals {
                io.write_line(&format!("  {}", line));
            }
            Ok(false)
        }
        ":trace" => {
            state.vm.config.trace = !state.vm.config.trace;
            io.write_line(&format!("trace {}", on_off(state.vm.config.trace)));
            Ok(false)
        }
        ":dis" => {
            state.show_disassembly = !state.show_disassembly;
            io.write_line(&format!("disassembly {}", on_off(state.show_disassembly)));
            Ok(false)
        }
        _ => Err(format!("Unknown command: {}", name)),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

const HELP: &str = "\
REPL commands:
  :help, :h          Show this help
  :quit, :exit, :q   Leave the REPL
  :globals, :g       List defined globals
  :trace             Toggle instruction tracing
  :dis               Toggle bytecode listing for each line

Statements end with ';'. Globals persist between lines.
";

/// Runs the line-editor loop until EOF, Ctrl-C or `:quit`.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_repl(trace: bool) -> rustyline::Result<()> {
    use crate::runtime_io::StdIo;
    use rustyline::error::ReadlineError;

    let mut rl = rustyline::DefaultEditor::new()?;
    let history_path = history_path();
    if let Some(path) = history_path.as_ref() {
        let _ = rl.load_history(path);
    }

    let mut state = ReplState::new();
    state.vm.config.trace = trace;
    let mut io = StdIo;
    println!("lolvm REPL. Type :help for commands.");

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        if trimmed.starts_with(':') {
            match handle_command(trimmed, &mut state, &mut io) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => eprintln!("{}", e),
            }
            continue;
        }

        if let Err(e) = state.eval_line(&line, &mut io) {
            eprintln!("{}", e.trim_end());
        }
    }

    if let Some(path) = history_path.as_ref() {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let _ = rl.save_history(path);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn history_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("lolvm").join("history.txt"))
}
