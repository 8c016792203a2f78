//! `System.print` / `System.input`.

use super::{arg, named, Registry};
use crate::error::VaError;
use crate::value::Value;
use std::io::{self, Write};

pub fn register(registry: &mut Registry) {
    registry.insert("System.print", print_fn);
    registry.insert("System.input", input_fn);
}

fn print_fn(args: &[Value], named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let end = match named(named_args, "end") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => String::from("\n"),
        None => String::from("\n"),
    };
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    print!("{}{}", rendered.join(" "), end);
    io::stdout().flush().ok();
    Ok(Value::Null)
}

fn input_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    if let Ok(prompt) = arg(args, 0, "System.input") {
        print!("{prompt}");
        io::stdout().flush().ok();
    }
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|e| VaError::function_call(crate::error::Span::unknown(), e.to_string()))?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::String(line))
}
