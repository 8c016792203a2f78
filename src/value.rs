//! Runtime values produced and consumed by the evaluator.

use crate::ast::FunctionDef;
use crate::env::Environment;
use crate::error::VaError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type BuiltinFn = fn(&[Value], &[(String, Value)]) -> Result<Value, VaError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKey {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for ScalarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKey::Int(i) => write!(f, "{i}"),
            ScalarKey::Str(s) => write!(f, "{s}"),
            ScalarKey::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<HashMap<ScalarKey, Value>>>),
    Tuple(Rc<Vec<Value>>),
    Function(Rc<FunctionDef>, Option<Rc<Environment>>),
    BuiltIn(&'static str, BuiltinFn),
    Module(Rc<HashMap<String, Value>>),
    /// Declared via `define NAME;` but never assigned.
    Anytion,
    /// Explicit null-like value bound to the identifier `unassigned`.
    Unassigned,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Tuple(_) => "tuple",
            Value::Function(..) => "function",
            Value::BuiltIn(..) => "builtin",
            Value::Module(_) => "module",
            Value::Anytion => "anytion",
            Value::Unassigned => "unassigned",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Unassigned | Value::Anytion => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Function(..) | Value::BuiltIn(..) | Value::Module(_) => true,
        }
    }

    pub fn as_scalar_key(&self) -> Option<ScalarKey> {
        match self {
            Value::Int(i) => Some(ScalarKey::Int(*i)),
            Value::String(s) => Some(ScalarKey::Str(s.clone())),
            Value::Bool(b) => Some(ScalarKey::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}.0", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dict(map) => {
                write!(f, "{{")?;
                let borrowed = map.borrow();
                let mut entries: Vec<_> = borrowed.iter().collect();
                entries.sort_by_key(|(k, _)| k.to_string());
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Function(def, _) => write!(f, "<function {}>", def.name),
            Value::BuiltIn(name, _) => write!(f, "<builtin {name}>"),
            Value::Module(_) => write!(f, "<module>"),
            Value::Anytion => write!(f, "<anytion>"),
            Value::Unassigned => write!(f, "unassigned"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value::{}({})", self.type_name(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_display_keeps_trailing_zero() {
        assert_eq!(format!("{}", Value::Float(42.0)), "42.0");
        assert_eq!(format!("{}", Value::Float(-2.5)), "-2.5");
    }

    #[test]
    fn anytion_and_unassigned_are_falsy() {
        assert!(!Value::Anytion.is_truthy());
        assert!(!Value::Unassigned.is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn array_display_reflects_shared_mutation() {
        let arr = Rc::new(RefCell::new(vec![Value::Int(1), Value::Int(2)]));
        let v1 = Value::Array(arr.clone());
        arr.borrow_mut().push(Value::Int(3));
        assert_eq!(format!("{v1}"), "[1, 2, 3]");
    }

    #[test]
    fn scalar_key_restricted_to_hashable_kinds() {
        assert!(Value::Int(1).as_scalar_key().is_some());
        assert!(Value::String("k".into()).as_scalar_key().is_some());
        assert!(Value::Array(Rc::new(RefCell::new(vec![])))
            .as_scalar_key()
            .is_none());
    }
}
