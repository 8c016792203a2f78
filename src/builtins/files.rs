//! `File.read/write/exists/delete`, delegated straight to `std::fs` with no
//! sandboxing: every path resolves relative to the process working
//! directory (§4.4).

use super::{arg, expect_string, Registry};
use crate::error::{Span, VaError};
use crate::value::Value;
use std::fs;

pub fn register(registry: &mut Registry) {
    registry.insert("File.read", read_fn);
    registry.insert("File.write", write_fn);
    registry.insert("File.exists", exists_fn);
    registry.insert("File.delete", delete_fn);
}

fn io_error(e: std::io::Error) -> VaError {
    VaError::function_call(Span::unknown(), e.to_string())
}

fn read_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let path = expect_string(arg(args, 0, "File.read")?)?;
    let contents = fs::read_to_string(path).map_err(io_error)?;
    Ok(Value::String(contents))
}

fn write_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let path = expect_string(arg(args, 0, "File.write")?)?;
    let contents = expect_string(arg(args, 1, "File.write")?)?;
    fs::write(path, contents).map_err(io_error)?;
    Ok(Value::Null)
}

fn exists_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let path = expect_string(arg(args, 0, "File.exists")?)?;
    Ok(Value::Bool(std::path::Path::new(path).exists()))
}

fn delete_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let path = expect_string(arg(args, 0, "File.delete")?)?;
    fs::remove_file(path).map_err(io_error)?;
    Ok(Value::Null)
}
