//! Built-in function registry (§4.4): a flat, string-keyed table of host
//! callables populated once at evaluator construction and shared by every
//! sub-evaluator a module import spins up. Organized into one submodule per
//! category, mirroring the teacher's category-submodule-plus-roll-up shape,
//! minus the declarative registration macro the teacher's Lisp dialect used.

use crate::error::{Span, VaError};
use crate::value::{ScalarKey, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub mod arrays;
pub mod coercion;
pub mod dicts;
pub mod files;
pub mod output;
pub mod strings;

pub type BuiltinFn = fn(&[Value], &[(String, Value)]) -> Result<Value, VaError>;
pub type Registry = HashMap<&'static str, BuiltinFn>;

pub fn register_builtins() -> Registry {
    let mut registry = Registry::new();
    output::register(&mut registry);
    coercion::register(&mut registry);
    arrays::register(&mut registry);
    dicts::register(&mut registry);
    strings::register(&mut registry);
    files::register(&mut registry);
    registry
}

/// Positional argument at `index`, or an arity `FunctionCallError`. The span
/// is a placeholder; the evaluator rewrites it to the call site.
pub(crate) fn arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a Value, VaError> {
    args.get(index).ok_or_else(|| {
        VaError::function_call(Span::unknown(), format!("{name}: missing argument {index}"))
    })
}

pub(crate) fn expect_string<'a>(v: &'a Value) -> Result<&'a str, VaError> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(VaError::type_error(Span::unknown(), "string", other.type_name())),
    }
}

pub(crate) fn expect_int(v: &Value) -> Result<i64, VaError> {
    match v {
        Value::Int(i) => Ok(*i),
        other => Err(VaError::type_error(Span::unknown(), "int", other.type_name())),
    }
}

pub(crate) fn expect_array(v: &Value) -> Result<Rc<RefCell<Vec<Value>>>, VaError> {
    match v {
        Value::Array(a) => Ok(a.clone()),
        other => Err(VaError::type_error(Span::unknown(), "array", other.type_name())),
    }
}

pub(crate) fn expect_dict(v: &Value) -> Result<Rc<RefCell<HashMap<ScalarKey, Value>>>, VaError> {
    match v {
        Value::Dict(d) => Ok(d.clone()),
        other => Err(VaError::type_error(Span::unknown(), "dict", other.type_name())),
    }
}

pub(crate) fn named<'a>(named_args: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    named_args.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}
