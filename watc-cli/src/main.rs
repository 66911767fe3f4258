mod log;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wasmi::{Engine, Linker, Module, Store};
use watc_core::{CoreError, emit, generate, parse, resolve};

/// Compile watc source into WebAssembly text or binary.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file; reads stdin when omitted.
    #[arg(short, long)]
    input: Option<String>,

    #[arg(short, long)]
    output: String,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "wat",
        help = "Output format: wat, wasm"
    )]
    emit: String,

    #[arg(long, help = "Run the exported `main` function after compiling")]
    run: bool,

    #[arg(short, long, help = "Print progress for each compiler stage to stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    log::set_verbose(cli.verbose);
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let wat = compile_source(&source)
        .map_err(|err| {
            let stage = err.stage();
            anyhow::Error::new(err).context(format!("compilation failed in {stage} stage"))
        })?;

    match cli.emit.as_str() {
        "wat" => {
            write_output(&cli.output, wat.as_bytes())?;
            if cli.run {
                let result = run_wasm(&assemble(&wat)?)?;
                println!("Program exited with {result}");
            }
        }
        "wasm" => {
            let wasm = assemble(&wat)?;
            write_output(&cli.output, &wasm)?;
            if cli.run {
                let result = run_wasm(&wasm)?;
                println!("Program exited with {result}");
            }
        }
        other => return Err(anyhow::anyhow!("unsupported emit format: {other}")),
    }

    Ok(())
}

fn compile_source(source: &str) -> Result<String, CoreError> {
    let program = parse(source)?;
    if log::is_verbose() {
        eprintln!("parse: {} function(s)", program.functions.len());
    }

    let program = resolve(&program)?;
    if log::is_verbose() {
        for function in &program.functions {
            eprintln!(
                "resolve: {} with {} param(s), {} local(s)",
                function.name,
                function.params.len(),
                function.locals.len()
            );
        }
    }

    let module = generate(&program)?;
    if log::is_verbose() {
        for function in &module.functions {
            eprintln!(
                "codegen: {} uses {} slot(s), {} instruction(s)",
                function.name,
                function.slot_count(),
                function.body.len()
            );
        }
        let instructions: usize = module.functions.iter().map(|f| f.body.len()).sum();
        eprintln!(
            "codegen: {instructions} instruction(s), {} export(s)",
            module.exports().count()
        );
    }

    Ok(emit(&module))
}

fn assemble(wat: &str) -> Result<Vec<u8>> {
    let wasm = wat::parse_str(wat).context("failed to assemble generated text")?;
    if log::is_verbose() {
        eprintln!("assemble: {} byte(s)", wasm.len());
    }
    Ok(wasm)
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

fn run_wasm(wasm: &[u8]) -> Result<i32> {
    let engine = Engine::default();
    let module = Module::new(&engine, wasm).context("failed to load assembled module")?;
    let linker = Linker::<()>::new(&engine);
    let mut store = Store::new(&engine, ());
    let instance = linker
        .instantiate_and_start(&mut store, &module)
        .context("failed to instantiate module")?;
    let main = instance
        .get_typed_func::<(), i32>(&store, "main")
        .context("exported main function missing or has wrong type")?;
    let result = main
        .call(&mut store, ())
        .context("failed to execute main")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn compiles_and_runs_wat() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(&input_path, "export fn main(): i32 { return 1 + 2 * 3; }").expect("write input");
        let output_path = dir.path().join("out.wat");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Program exited with 7"));

        let text = fs::read_to_string(&output_path).expect("read wat");
        assert!(text.contains("(export \"main\" (func $main))"));
    }

    #[test]
    fn emits_wasm_binary() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(&input_path, "export fn main(): i32 { 2 }").expect("write input");
        let output_path = dir.path().join("nested").join("out.wasm");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--emit")
            .arg("wasm")
            .arg("--run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Program exited with 2"));

        let bytes = fs::read(&output_path).expect("read wasm");
        assert!(bytes.starts_with(b"\0asm"));
    }

    #[test]
    fn reads_source_from_stdin() {
        let dir = tempdir().expect("tempdir");
        let output_path = dir.path().join("out.wat");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--output")
            .arg(&output_path)
            .write_stdin("export fn main(): i32 { let a = 6; a * 7 }")
            .arg("--run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Program exited with 42"));
    }

    #[test]
    fn reports_undefined_identifier() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(&input_path, "export fn main(): i32 { return x; }").expect("write input");
        let output_path = dir.path().join("out.wat");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("resolve stage"))
            .stderr(predicate::str::contains("undefined identifier `x`"));

        assert!(!output_path.exists(), "no output on failure");
    }

    #[test]
    fn run_requires_exported_main() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(&input_path, "fn main(): i32 { return 1; }").expect("write input");
        let output_path = dir.path().join("out.wat");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("exported main function missing"));
    }

    #[test]
    fn verbose_reports_stages() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(&input_path, "export fn main(): i32 { 1 }").expect("write input");
        let output_path = dir.path().join("out.wat");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--verbose")
            .assert()
            .success()
            .stderr(predicate::str::contains("parse: 1 function(s)"))
            .stderr(predicate::str::contains("codegen: 1 instruction(s), 1 export(s)"));
    }

    #[test]
    fn verbose_reports_slots_per_function() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(
            &input_path,
            "fn scale(a: i32): i32 { let b = a; b *= 2; b }\nexport fn main(): i32 { let x = 40; x += 2; x }",
        )
        .expect("write input");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(dir.path().join("out.wat"))
            .arg("--run")
            .arg("--verbose")
            .assert()
            .success()
            .stdout(predicate::str::contains("Program exited with 42"))
            .stderr(predicate::str::contains("codegen: scale uses 2 slot(s), 7 instruction(s)"))
            .stderr(predicate::str::contains("codegen: main uses 1 slot(s), 7 instruction(s)"));
    }

    #[test]
    fn rejects_unknown_emit_format() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.src");
        fs::write(&input_path, "export fn main(): i32 { 1 }").expect("write input");

        Command::cargo_bin("watc-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(dir.path().join("out.ll"))
            .arg("--emit")
            .arg("llvm")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported emit format: llvm"));
    }
}
