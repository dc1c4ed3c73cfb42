use std::fs;
use std::io;
use std::path::Path;

use lolvm::{InterpretResult, Vm};
use std::time::Instant;

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let filter = args.first().map(|s| s.as_str());
    let dir = Path::new("tests/programs");
    if !dir.exists() {
        eprintln!("tests/programs not found.");
        return Ok(());
    }
    let mut entries = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == "lol").unwrap_or(false))
        .collect::<Vec<_>>();
    entries.sort();

    let mut failures = 0;
    for path in entries {
        if let Some(f) = filter
            && !path.to_string_lossy().contains(f)
        {
            continue;
        }
        println!("==== [{}] ====", path.display());
        let src = fs::read_to_string(&path)?;

        let t0 = Instant::now();
        let compiled = lolvm::compile(&src);
        let compile_ms = t0.elapsed().as_millis();
        let chunk = match compiled.into_result() {
            Ok(chunk) => chunk,
            Err(diagnostics) => {
                for d in diagnostics {
                    eprintln!("{}", d);
                }
                failures += 1;
                println!();
                continue;
            }
        };

        let t1 = Instant::now();
        let result = Vm::new().interpret_chunk(&chunk);
        let exec_ms = t1.elapsed().as_millis();
        if result != InterpretResult::Ok {
            failures += 1;
        }
        println!(
            "[vm] compile={} ms, exec={} ms, total={} ms",
            compile_ms,
            exec_ms,
            compile_ms + exec_ms
        );
        println!();
    }

    if failures > 0 {
        println!("{} program(s) failed", failures);
    }
    Ok(())
}
