use anyhow::Context;
use clap::{Parser, Subcommand};
use lolvm as lib;
use lolvm::vm::disasm::disassemble_chunk_to_string;
use lolvm::{Chunk, InterpretResult, Vm, VmConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_COMPILE: u8 = 65;
const EXIT_RUNTIME: u8 = 70;
const EXIT_IO: u8 = 74;

#[derive(Parser)]
#[command(name = "lol", version, about = "Bytecode compiler and VM for a small scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and run a source file
    Run {
        file: PathBuf,
        /// Trace every instruction to stderr
        #[arg(long)]
        trace: bool,
        /// Also write the bytecode listing to this path
        #[arg(long, value_name = "PATH")]
        dump: Option<PathBuf>,
        #[arg(long, default_value_t = VmConfig::default().max_stack)]
        max_stack: usize,
    },
    /// Start the interactive prompt
    Repl {
        #[arg(long)]
        trace: bool,
    },
    /// Compile a source file to a bytecode file
    Compile {
        file: PathBuf,
        #[arg(short, long, default_value = "out.lolc")]
        output: PathBuf,
    },
    /// Run a bytecode file produced by `compile`
    Exec {
        file: PathBuf,
        #[arg(long)]
        trace: bool,
    },
    /// Print the bytecode listing of a source or bytecode file
    Disasm {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// A failure already reported to the user, carrying its exit status.
enum Failure {
    Compile,
    Runtime,
    Io(anyhow::Error),
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Io(e)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        None => repl(false),
        Some(Command::Repl { trace }) => repl(trace),
        Some(Command::Run {
            file,
            trace,
            dump,
            max_stack,
        }) => run(&file, VmConfig { max_stack, trace }, dump.as_deref()),
        Some(Command::Compile { file, output }) => compile_to_file(&file, &output),
        Some(Command::Exec { file, trace }) => exec(&file, trace),
        Some(Command::Disasm { file, output }) => disasm(&file, output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Compile) => ExitCode::from(EXIT_COMPILE),
        Err(Failure::Runtime) => ExitCode::from(EXIT_RUNTIME),
        Err(Failure::Io(e)) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_IO)
        }
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
}

/// Compiles `src`, rendering every diagnostic to stderr on failure.
fn compile_source(path: &Path, src: &str) -> Result<Chunk, Failure> {
    let compiled = lib::compile(src);
    let name = path.display().to_string();
    compiled.into_result().map_err(|diagnostics| {
        for diag in &diagnostics {
            eprint!("{}", diag.format(&name, src, "Compile error", EXIT_COMPILE.into()));
        }
        Failure::Compile
    })
}

fn execute(chunk: &Chunk, config: VmConfig) -> Result<(), Failure> {
    let mut vm = Vm::with_config(config);
    match vm.interpret_chunk(chunk) {
        InterpretResult::Ok => Ok(()),
        InterpretResult::CompileError => Err(Failure::Compile),
        InterpretResult::RuntimeError => Err(Failure::Runtime),
    }
}

fn run(path: &Path, config: VmConfig, dump: Option<&Path>) -> Result<(), Failure> {
    let src = read_source(path)?;
    let chunk = compile_source(path, &src)?;
    if let Some(dump) = dump {
        let listing = disassemble_chunk_to_string(&chunk, &path.display().to_string());
        std::fs::write(dump, listing)
            .with_context(|| format!("could not write {}", dump.display()))?;
    }
    execute(&chunk, config)
}

fn compile_to_file(path: &Path, output: &Path) -> Result<(), Failure> {
    let src = read_source(path)?;
    let chunk = compile_source(path, &src)?;
    lib::save_chunk(&chunk, output)
        .with_context(|| format!("could not write {}", output.display()))?;
    println!("wrote {}", output.display());
    Ok(())
}

fn exec(path: &Path, trace: bool) -> Result<(), Failure> {
    let chunk = lib::load_chunk(path)
        .with_context(|| format!("could not load {}", path.display()))?;
    execute(
        &chunk,
        VmConfig {
            trace,
            ..VmConfig::default()
        },
    )
}

fn disasm(path: &Path, output: Option<&Path>) -> Result<(), Failure> {
    let is_bytecode = path.extension().is_some_and(|ext| ext == "lolc");
    let chunk = if is_bytecode {
        lib::load_chunk(path).with_context(|| format!("could not load {}", path.display()))?
    } else {
        let src = read_source(path)?;
        compile_source(path, &src)?
    };
    let listing = disassemble_chunk_to_string(&chunk, &path.display().to_string());
    match output {
        Some(out) => std::fs::write(out, listing)
            .with_context(|| format!("could not write {}", out.display()))?,
        None => print!("{}", listing),
    }
    Ok(())
}

fn repl(trace: bool) -> Result<(), Failure> {
    lib::repl::run_repl(trace).context("line editor failed")?;
    Ok(())
}
