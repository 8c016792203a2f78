mod ast;
mod builtins;
mod config;
mod env;
mod error;
mod eval;
mod lexer;
mod loader;
mod parser;
mod value;

use clap::Parser;
use error::VaError;
use eval::Evaluator;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use value::Value;

/// Interpreter for the Vanction scripting language.
#[derive(Parser, Debug)]
#[command(name = "vanction")]
#[command(version = config::VERSION)]
#[command(about = "A tree-walking interpreter for the Vanction language")]
struct CliArgs {
    /// Script file to run. Starts the REPL if omitted.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Force REPL mode even when a file is given.
    #[arg(long)]
    repl: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = CliArgs::parse();
    let result = match args.file {
        Some(path) if !args.repl => run_file(&path),
        _ => run_repl(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_file(path: &PathBuf) -> Result<(), String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
    let file_name = path.to_string_lossy().to_string();
    let base_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let program = parser::parse(&source, file_name.clone()).map_err(|e| e.render(&source))?;
    tracing::debug!(file = %file_name, "parsed program, running main()");

    let mut evaluator = Evaluator::new(file_name, base_dir);
    evaluator.run_program(&program).map_err(|e| e.render(&source))
}

fn run_repl() -> Result<(), String> {
    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);

    let rl_config = Config::builder().auto_add_history(true).build();
    let mut rl = DefaultEditor::with_config(rl_config).map_err(|e| format!("failed to start REPL: {e}"))?;
    let _ = rl.load_history(config::HISTORY_FILE);

    let mut evaluator = Evaluator::new("<repl>", PathBuf::from("."));

    loop {
        match read_statement(&mut rl) {
            Ok(Some(source)) => {
                if matches!(source.trim(), "exit" | "quit") {
                    break;
                }
                run_repl_statement(&mut evaluator, &source);
            }
            Ok(None) => continue,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "REPL readline failed");
                break;
            }
        }
    }

    let _ = rl.save_history(config::HISTORY_FILE);
    Ok(())
}

/// Reads one statement, prompting with [`config::CONTINUATION_PROMPT`] while
/// braces remain unbalanced across lines (§4.6.2).
fn read_statement(rl: &mut DefaultEditor) -> Result<Option<String>, ReadlineError> {
    let mut buffer = String::new();
    let mut depth: i32 = 0;
    loop {
        let prompt = if buffer.is_empty() { config::PROMPT } else { config::CONTINUATION_PROMPT };
        let line = rl.readline(prompt)?;
        depth += brace_delta(&line);
        buffer.push_str(&line);
        buffer.push('\n');
        if depth <= 0 {
            break;
        }
    }
    if buffer.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(buffer))
    }
}

fn brace_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    for c in line.chars() {
        match c {
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn run_repl_statement(evaluator: &mut Evaluator, source: &str) {
    let program = match parser::parse(source, "<repl>") {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.render(source));
            return;
        }
    };
    match evaluator.load_definitions_repl(&program) {
        Ok(values) => {
            for value in values {
                if !matches!(value, Value::Null) {
                    println!("{value}");
                }
            }
        }
        Err(e) => print_runtime_error(&e, source),
    }
}

fn print_runtime_error(e: &VaError, source: &str) {
    eprintln!("{}", e.render(source));
}
