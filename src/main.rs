// bolt - A small Lisp compiled to register bytecode
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use bolt_embed::{Engine, EngineConfig};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command line.
#[derive(Debug, Default)]
struct Options {
    config: EngineConfig,
    disasm: bool,
    files: Vec<String>,
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();

    // Handle --version flag
    if args.len() == 1 && (args[0] == "--version" || args[0] == "-v") {
        println!("Bolt v{}", VERSION);
        return;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: bolt [--disasm] [--inline] [--stack-size N] [FILE.bolt...]");
            process::exit(2);
        }
    };
    debug!(?options, "starting");

    if options.files.is_empty() {
        run_repl(&options);
    } else {
        run_files(&options);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("BOLT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--disasm" => options.disasm = true,
            "--inline" => options.config.inline_primitives = true,
            "--stack-size" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--stack-size needs a value".to_string())?;
                options.config.stack_size = value
                    .parse()
                    .map_err(|_| format!("invalid stack size '{}'", value))?;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{}'", flag)),
            file => options.files.push(file.to_string()),
        }
    }
    Ok(options)
}

/// Evaluate a sequence of source files
fn run_files(options: &Options) {
    let mut engine = Engine::with_config(options.config.clone());
    for file_path in &options.files {
        match eval_file(&mut engine, file_path, options.disasm) {
            Ok(output) => print!("{}", output),
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    }
}

/// Evaluate a single source file, returning what should be printed.
fn eval_file(engine: &mut Engine, file_path: &str, disasm: bool) -> Result<String, String> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("bolt") => {}
        Some(ext) => {
            return Err(format!(
                "Error: unsupported file extension '.{}' for '{}'",
                ext, file_path
            ));
        }
        None => {
            return Err(format!(
                "Error: file '{}' has no extension (expected .bolt)",
                file_path
            ));
        }
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", file_path, e))?;

    if disasm {
        return engine
            .disassemble(&source)
            .map_err(|e| format!("Error in '{}': {}", file_path, e));
    }
    engine
        .eval_to_string(&source)
        .map(|rendered| format!("{}\n", rendered))
        .map_err(|e| format!("Error in '{}': {}", file_path, e))
}

/// Run the interactive REPL.
///
/// Accepted lines accumulate into one session source, which is recompiled
/// and rerun for every new line.
fn run_repl(options: &Options) {
    println!("Bolt v{}", VERSION);

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to start line editor: {}", e);
            process::exit(1);
        }
    };
    let mut engine = Engine::with_config(options.config.clone());
    let mut session = String::new();
    let mut show_bytecode = options.disasm;

    loop {
        match rl.readline("bolt> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match input {
                    ":quit" => break,
                    ":dis" => {
                        show_bytecode = !show_bytecode;
                        println!("bytecode listing {}", if show_bytecode { "on" } else { "off" });
                        continue;
                    }
                    _ => {}
                }

                let candidate = format!("{}{}\n", session, input);
                if show_bytecode {
                    match engine.disassemble(&candidate) {
                        Ok(listing) => print!("{}", listing),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            continue;
                        }
                    }
                }
                match engine.eval_to_string(&candidate) {
                    Ok(rendered) => {
                        println!("{}", rendered);
                        session = candidate;
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}
