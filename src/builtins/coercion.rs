//! Coercion and length: `len`, `str`, `int`, `float`, and the `range` helper.

use super::{arg, Registry};
use crate::error::{Span, VaError};
use crate::value::Value;

pub fn register(registry: &mut Registry) {
    registry.insert("len", len_fn);
    registry.insert("str", str_fn);
    registry.insert("int", int_fn);
    registry.insert("float", float_fn);
    registry.insert("range", range_fn);
}

fn len_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let v = arg(args, 0, "len")?;
    let n = match v {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.borrow().len(),
        Value::Dict(d) => d.borrow().len(),
        Value::Tuple(t) => t.len(),
        other => return Err(VaError::type_error(Span::unknown(), "string, array, dict, or tuple", other.type_name())),
    };
    Ok(Value::Int(n as i64))
}

fn str_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    Ok(Value::String(arg(args, 0, "str")?.to_string()))
}

fn int_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let v = arg(args, 0, "int")?;
    let parsed = match v {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            VaError::type_error(Span::unknown(), "numeric string", "unparsable string")
        })?,
        Value::Bool(b) => *b as i64,
        other => return Err(VaError::type_error(Span::unknown(), "int, float, string, or bool", other.type_name())),
    };
    Ok(Value::Int(parsed))
}

fn float_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let v = arg(args, 0, "float")?;
    let parsed = match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| VaError::type_error(Span::unknown(), "numeric string", "unparsable string"))?,
        other => return Err(VaError::type_error(Span::unknown(), "int, float, or string", other.type_name())),
    };
    Ok(Value::Float(parsed))
}

fn range_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let n = super::expect_int(arg(args, 0, "range")?)?;
    let items = (1..=n).map(Value::Int).collect();
    Ok(Value::Array(std::rc::Rc::new(std::cell::RefCell::new(items))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_counts_chars_not_bytes() {
        assert!(matches!(len_fn(&[Value::String("hi".into())], &[]), Ok(Value::Int(2))));
    }

    #[test]
    fn range_is_one_indexed_inclusive() {
        let result = range_fn(&[Value::Int(3)], &[]).unwrap();
        match result {
            Value::Array(a) => {
                let items = a.borrow();
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], Value::Int(1)));
                assert!(matches!(items[2], Value::Int(3)));
            }
            _ => panic!("expected array"),
        }
    }
}
