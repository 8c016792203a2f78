//! `str.contains/replace/split/strip/lower/upper/startswith/endswith/substring/find`.

use super::{arg, expect_int, expect_string, Registry};
use crate::error::{Span, VaError};
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub fn register(registry: &mut Registry) {
    registry.insert("str.contains", contains_fn);
    registry.insert("str.replace", replace_fn);
    registry.insert("str.split", split_fn);
    registry.insert("str.strip", strip_fn);
    registry.insert("str.lower", lower_fn);
    registry.insert("str.upper", upper_fn);
    registry.insert("str.startswith", startswith_fn);
    registry.insert("str.endswith", endswith_fn);
    registry.insert("str.substring", substring_fn);
    registry.insert("str.find", find_fn);
}

fn contains_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.contains")?)?;
    let needle = expect_string(arg(args, 1, "str.contains")?)?;
    Ok(Value::Bool(s.contains(needle)))
}

fn replace_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.replace")?)?;
    let from = expect_string(arg(args, 1, "str.replace")?)?;
    let to = expect_string(arg(args, 2, "str.replace")?)?;
    Ok(Value::String(s.replace(from, to)))
}

fn split_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.split")?)?;
    let sep = expect_string(arg(args, 1, "str.split")?)?;
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(sep).map(|p| Value::String(p.to_string())).collect()
    };
    Ok(Value::Array(Rc::new(RefCell::new(parts))))
}

fn strip_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.strip")?)?;
    Ok(Value::String(s.trim().to_string()))
}

fn lower_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.lower")?)?;
    Ok(Value::String(s.to_lowercase()))
}

fn upper_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.upper")?)?;
    Ok(Value::String(s.to_uppercase()))
}

fn startswith_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.startswith")?)?;
    let prefix = expect_string(arg(args, 1, "str.startswith")?)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn endswith_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.endswith")?)?;
    let suffix = expect_string(arg(args, 1, "str.endswith")?)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

fn substring_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.substring")?)?;
    let start = expect_int(arg(args, 1, "str.substring")?)?;
    let end = expect_int(arg(args, 2, "str.substring")?)?;
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    if start < 0 || end > len || start > end {
        return Err(VaError::index_out_of_range(Span::unknown(), start, chars.len()));
    }
    let sliced: String = chars[start as usize..end as usize].iter().collect();
    Ok(Value::String(sliced))
}

fn find_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let s = expect_string(arg(args, 0, "str.find")?)?;
    let needle = expect_string(arg(args, 1, "str.find")?)?;
    match s.find(needle) {
        Some(byte_idx) => Ok(Value::Int(s[..byte_idx].chars().count() as i64)),
        None => Ok(Value::Int(-1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_empty_separator_splits_chars() {
        let result = split_fn(&[Value::String("ab".into()), Value::String("".into())], &[]).unwrap();
        match result {
            Value::Array(a) => assert_eq!(a.borrow().len(), 2),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn find_returns_negative_one_when_absent() {
        let result = find_fn(&[Value::String("hello".into()), Value::String("z".into())], &[]).unwrap();
        assert!(matches!(result, Value::Int(-1)));
    }

    #[test]
    fn substring_out_of_range_is_index_error() {
        let err = substring_fn(&[Value::String("hi".into()), Value::Int(0), Value::Int(9)], &[]).unwrap_err();
        assert_eq!(err.kind_name(), "IndexOutOfRange");
    }
}
