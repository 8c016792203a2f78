//! `array.append/insert/remove/pop/reverse/sort/join/slice`. Every function
//! takes the array as its first positional argument and mutates it in
//! place through the shared `Rc<RefCell<_>>`, except `join`/`slice` which
//! are read-only.

use super::{arg, expect_array, expect_int, expect_string, Registry};
use crate::error::{Span, VaError};
use crate::value::Value;
use std::cmp::Ordering;

pub fn register(registry: &mut Registry) {
    registry.insert("array.append", append_fn);
    registry.insert("array.insert", insert_fn);
    registry.insert("array.remove", remove_fn);
    registry.insert("array.pop", pop_fn);
    registry.insert("array.reverse", reverse_fn);
    registry.insert("array.sort", sort_fn);
    registry.insert("array.join", join_fn);
    registry.insert("array.slice", slice_fn);
}

fn append_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.append")?)?;
    arr.borrow_mut().push(arg(args, 1, "array.append")?.clone());
    Ok(Value::Null)
}

fn insert_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.insert")?)?;
    let index = expect_int(arg(args, 1, "array.insert")?)? as usize;
    let value = arg(args, 2, "array.insert")?.clone();
    let mut items = arr.borrow_mut();
    if index > items.len() {
        return Err(VaError::index_out_of_range(Span::unknown(), index as i64, items.len()));
    }
    items.insert(index, value);
    Ok(Value::Null)
}

fn remove_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.remove")?)?;
    let index = expect_int(arg(args, 1, "array.remove")?)?;
    let mut items = arr.borrow_mut();
    if index < 0 || index as usize >= items.len() {
        return Err(VaError::index_out_of_range(Span::unknown(), index, items.len()));
    }
    Ok(items.remove(index as usize))
}

fn pop_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.pop")?)?;
    let mut items = arr.borrow_mut();
    items
        .pop()
        .ok_or_else(|| VaError::index_out_of_range(Span::unknown(), 0, 0))
}

fn reverse_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.reverse")?)?;
    arr.borrow_mut().reverse();
    Ok(Value::Null)
}

fn sort_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.sort")?)?;
    let mut items = arr.borrow_mut();
    let mut err = None;
    items.sort_by(|a, b| match compare(a, b) {
        Ok(ord) => ord,
        Err(e) => {
            err = Some(e);
            Ordering::Equal
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(Value::Null),
    }
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, VaError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => {
            Ok(x.partial_cmp(y).unwrap_or(Ordering::Equal))
        }
        (Value::Int(x), Value::Float(y)) => {
            Ok((*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal))
        }
        (Value::Float(x), Value::Int(y)) => {
            Ok(x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(VaError::type_error(Span::unknown(), a.type_name(), b.type_name())),
    }
}

fn join_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.join")?)?;
    let sep = expect_string(arg(args, 1, "array.join")?)?;
    let items = arr.borrow();
    let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
    Ok(Value::String(rendered.join(sep)))
}

fn slice_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let arr = expect_array(arg(args, 0, "array.slice")?)?;
    let start = expect_int(arg(args, 1, "array.slice")?)?;
    let end = expect_int(arg(args, 2, "array.slice")?)?;
    let items = arr.borrow();
    let len = items.len() as i64;
    if start < 0 || end > len || start > end {
        return Err(VaError::index_out_of_range(Span::unknown(), start, items.len()));
    }
    let sliced = items[start as usize..end as usize].to_vec();
    Ok(Value::Array(std::rc::Rc::new(std::cell::RefCell::new(sliced))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    #[test]
    fn append_mutates_shared_array() {
        let a = array(vec![Value::Int(1)]);
        append_fn(&[a.clone(), Value::Int(2)], &[]).unwrap();
        match &a {
            Value::Array(items) => assert_eq!(items.borrow().len(), 2),
            _ => unreachable!(),
        }
    }

    #[test]
    fn remove_out_of_range_is_index_error() {
        let a = array(vec![Value::Int(1)]);
        let err = remove_fn(&[a, Value::Int(5)], &[]).unwrap_err();
        assert_eq!(err.kind_name(), "IndexOutOfRange");
    }

    #[test]
    fn join_renders_with_separator() {
        let a = array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let result = join_fn(&[a, Value::String(",".into())], &[]).unwrap();
        assert!(matches!(result, Value::String(s) if s == "1,2,3"));
    }
}
