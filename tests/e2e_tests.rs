use lolvm::runtime_io::BufferIo;
use lolvm::{InterpretResult, Vm};
use std::fs;
use std::path::{Path, PathBuf};

/// E2E 통합 테스트: tests/programs/ 디렉터리의 모든 .lol 파일을
/// VM으로 실행하여 정상 동작을 확인합니다.

fn get_test_programs() -> Vec<PathBuf> {
    let test_dir = PathBuf::from("tests/programs");
    if !test_dir.exists() {
        return vec![];
    }

    let mut programs = vec![];
    if let Ok(entries) = fs::read_dir(&test_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("lol") {
                programs.push(path);
            }
        }
    }
    programs.sort();
    programs
}

/// Runs a program on a fresh VM; returns the result with stdout and the error channel.
fn run_program(path: &Path) -> (InterpretResult, String, Vec<String>) {
    let source = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("could not read {}: {}", path.display(), e));
    let mut vm = Vm::new();
    let mut io = BufferIo::new();
    let result = vm.interpret_with_io(&source, &mut io);
    let errors = io.drain_errors();
    (result, io.take_output(), errors)
}

#[test]
fn test_e2e_all_programs() {
    let programs = get_test_programs();

    if programs.is_empty() {
        println!("Warning: No test programs found in tests/programs/");
        return;
    }

    let mut failed = vec![];
    for path in &programs {
        let (result, _, errors) = run_program(path);
        if result != InterpretResult::Ok {
            failed.push(format!("{}: {:?} {:?}", path.display(), result, errors));
        }
    }

    assert!(failed.is_empty(), "Some E2E tests failed:\n{}", failed.join("\n"));
}

macro_rules! test_program {
    ($test_name:ident, $filename:literal, output = $expected:literal) => {
        #[test]
        fn $test_name() {
            let _ = include_str!(concat!("programs/", $filename));

            let path = PathBuf::from(concat!("tests/programs/", $filename));
            let (result, output, errors) = run_program(&path);
            assert_eq!(result, InterpretResult::Ok, "{}: {:?}", $filename, errors);
            assert_eq!(output, $expected, "{}", $filename);
        }
    };

    ($test_name:ident, $filename:literal, result = $result:ident, output = $expected:literal, errors = [$($error:literal),*]) => {
        #[test]
        fn $test_name() {
            let _ = include_str!(concat!("programs/", $filename));

            let path = PathBuf::from(concat!("tests/programs/", $filename));
            let (result, output, errors) = run_program(&path);
            assert_eq!(result, InterpretResult::$result, "{}", $filename);
            assert_eq!(output, $expected, "{}", $filename);
            let expected_errors: Vec<String> = vec![$($error.to_string()),*];
            assert_eq!(errors, expected_errors, "{}", $filename);
        }
    };
}

test_program!(test_arith, "arith.lol", output = "7\n9\n2.5\n1\n9\ninf\n");
test_program!(test_globals, "globals.lol", output = "6\nnil\ngoodbye\n");
test_program!(
    test_comparisons,
    "comparisons.lol",
    output = "true\ntrue\nfalse\nfalse\ntrue\nfalse\ntrue\nfalse\nfalse\n"
);
test_program!(test_nan, "nan.lol", output = "false\ntrue\ntrue\nfalse\n");
test_program!(
    test_strings,
    "strings.lol",
    output = "lol\ntrue\nfalse\nmulti\nline\nfalse\n"
);
test_program!(
    test_truthiness,
    "truthiness.lol",
    output = "true\ntrue\nfalse\nfalse\nfalse\n"
);
test_program!(
    test_assignment_chain,
    "assignment_chain.lol",
    output = "7\n7\n7\nchanged\n"
);

test_program!(
    test_undefined_variable,
    "errors/undefined_variable.lol",
    result = RuntimeError,
    output = "before\n",
    errors = ["Runtime Error: Undefined variable 'missing'. at line 2"]
);
test_program!(
    test_type_error,
    "errors/type_error.lol",
    result = RuntimeError,
    output = "",
    errors = ["Runtime Error: Operand must be a number. at line 2"]
);
test_program!(
    test_syntax_errors_recover,
    "errors/syntax.lol",
    result = CompileError,
    output = "",
    errors = [
        "Line 1: Expect expression.",
        "Line 2: Expect variable name.",
        "Line 3: Invalid assignment target."
    ]
);

#[test]
fn test_compiled_file_matches_source_run() {
    let path = Path::new("tests/programs/globals.lol");
    let source = fs::read_to_string(path).unwrap();
    let chunk = lolvm::compile(&source).into_result().unwrap();

    let out = std::env::temp_dir().join(format!("lolvm-e2e-{}.lolc", std::process::id()));
    lolvm::save_chunk(&chunk, &out).unwrap();
    let loaded = lolvm::load_chunk(&out).unwrap();
    let _ = fs::remove_file(&out);

    let mut io = BufferIo::new();
    assert_eq!(
        Vm::new().interpret_chunk_with_io(&loaded, &mut io),
        InterpretResult::Ok
    );
    assert_eq!(io.get_output(), "6\nnil\ngoodbye\n");
}

test_program!(
    test_unterminated_string,
    "errors/unterminated.lol",
    result = CompileError,
    output = "",
    errors = ["Line 1: Unterminated string."]
);
