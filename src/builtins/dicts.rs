//! `dict.keys/values/items/get/set/update/pop/clear`.

use super::{arg, expect_dict, named, Registry};
use crate::error::{Span, VaError};
use crate::value::{ScalarKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub fn register(registry: &mut Registry) {
    registry.insert("dict.keys", keys_fn);
    registry.insert("dict.values", values_fn);
    registry.insert("dict.items", items_fn);
    registry.insert("dict.get", get_fn);
    registry.insert("dict.set", set_fn);
    registry.insert("dict.update", update_fn);
    registry.insert("dict.pop", pop_fn);
    registry.insert("dict.clear", clear_fn);
}

fn key_of(v: &Value) -> Result<ScalarKey, VaError> {
    v.as_scalar_key()
        .ok_or_else(|| VaError::type_error(Span::unknown(), "a hashable scalar", v.type_name()))
}

fn keys_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.keys")?)?;
    let items = dict
        .borrow()
        .keys()
        .map(|k| match k {
            ScalarKey::Int(i) => Value::Int(*i),
            ScalarKey::Str(s) => Value::String(s.clone()),
            ScalarKey::Bool(b) => Value::Bool(*b),
        })
        .collect();
    Ok(Value::Array(Rc::new(RefCell::new(items))))
}

fn values_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.values")?)?;
    let items = dict.borrow().values().cloned().collect();
    Ok(Value::Array(Rc::new(RefCell::new(items))))
}

fn items_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.items")?)?;
    let pairs = dict
        .borrow()
        .iter()
        .map(|(k, v)| {
            let key_value = match k {
                ScalarKey::Int(i) => Value::Int(*i),
                ScalarKey::Str(s) => Value::String(s.clone()),
                ScalarKey::Bool(b) => Value::Bool(*b),
            };
            Value::Tuple(Rc::new(vec![key_value, v.clone()]))
        })
        .collect();
    Ok(Value::Array(Rc::new(RefCell::new(pairs))))
}

fn get_fn(args: &[Value], named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.get")?)?;
    let key = key_of(arg(args, 1, "dict.get")?)?;
    let borrowed = dict.borrow();
    if let Some(v) = borrowed.get(&key) {
        return Ok(v.clone());
    }
    if let Some(default) = args.get(2).or_else(|| named(named_args, "default")) {
        return Ok(default.clone());
    }
    Err(VaError::key_not_found(Span::unknown(), key.to_string()))
}

fn set_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.set")?)?;
    let key = key_of(arg(args, 1, "dict.set")?)?;
    let value = arg(args, 2, "dict.set")?.clone();
    dict.borrow_mut().insert(key, value);
    Ok(Value::Null)
}

fn update_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.update")?)?;
    let other = expect_dict(arg(args, 1, "dict.update")?)?;
    for (k, v) in other.borrow().iter() {
        dict.borrow_mut().insert(k.clone(), v.clone());
    }
    Ok(Value::Null)
}

fn pop_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.pop")?)?;
    let key = key_of(arg(args, 1, "dict.pop")?)?;
    dict.borrow_mut()
        .remove(&key)
        .ok_or_else(|| VaError::key_not_found(Span::unknown(), key.to_string()))
}

fn clear_fn(args: &[Value], _named_args: &[(String, Value)]) -> Result<Value, VaError> {
    let dict = expect_dict(arg(args, 0, "dict.clear")?)?;
    dict.borrow_mut().clear();
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dict(entries: Vec<(ScalarKey, Value)>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries.into_iter().collect::<HashMap<_, _>>())))
    }

    #[test]
    fn get_missing_key_without_default_is_key_not_found() {
        let d = dict(vec![]);
        let err = get_fn(&[d, Value::String("x".into())], &[]).unwrap_err();
        assert_eq!(err.kind_name(), "KeyNotFound");
    }

    #[test]
    fn get_missing_key_with_default_returns_default() {
        let d = dict(vec![]);
        let result = get_fn(&[d, Value::String("x".into()), Value::Int(9)], &[]).unwrap();
        assert!(matches!(result, Value::Int(9)));
    }

    #[test]
    fn set_then_get_round_trips() {
        let d = dict(vec![]);
        set_fn(&[d.clone(), Value::String("x".into()), Value::Int(3)], &[]).unwrap();
        let result = get_fn(&[d, Value::String("x".into())], &[]).unwrap();
        assert!(matches!(result, Value::Int(3)));
    }
}
