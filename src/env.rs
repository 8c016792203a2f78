//! Lexical scope frames. A name resolves constants, then variables, then
//! functions, then walks up to the parent frame (§3). Frames are
//! reference-counted so closures and module handles can share one without
//! an owning tree.

use crate::ast::FunctionDef;
use crate::error::{Span, VaError};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    variables: RefCell<HashMap<String, Value>>,
    constants: RefCell<HashMap<String, Value>>,
    functions: RefCell<HashMap<String, Rc<FunctionDef>>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a fresh global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            variables: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a child frame linked to `parent`.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            variables: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Binds `name` to `value` as a plain variable in this frame.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.variables.borrow_mut().insert(name.into(), value);
    }

    /// Binds `name` to `value` as an immutable constant in this frame.
    pub fn define_constant(&self, name: impl Into<String>, value: Value) {
        self.constants.borrow_mut().insert(name.into(), value);
    }

    /// Registers a named function in this frame.
    pub fn define_function(&self, name: impl Into<String>, def: Rc<FunctionDef>) {
        self.functions.borrow_mut().insert(name.into(), def);
    }

    pub fn get_function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        if let Some(def) = self.functions.borrow().get(name) {
            return Some(def.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_function(name))
    }

    /// Looks up `name` in this frame and, failing that, ancestor frames, in
    /// constants → variables → functions order (§3).
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.constants.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.variables.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(def) = self.functions.borrow().get(name) {
            return Some(Value::Function(def.clone(), None));
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Assigns to an existing binding, walking the parent chain to find
    /// where it was declared. A constant anywhere on the chain is rejected.
    /// An unbound name is implicitly defined as a variable in this frame,
    /// matching the assignment-expression semantics in §3/§4.3.2.
    pub fn set(&self, name: &str, value: Value, span: Span) -> Result<(), VaError> {
        if self.constants.borrow().contains_key(name) {
            return Err(VaError::immutable(span, name));
        }
        if self.variables.borrow().contains_key(name) {
            self.variables.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(ref parent) = self.parent {
            if parent.contains(name) {
                return parent.set(name, value, span);
            }
        }
        self.variables.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    /// Snapshot of the functions registered directly in this frame (not
    /// ancestors). Used by the module loader to publish an imported file's
    /// top-level functions under the importer's chosen name (§4.5).
    pub fn own_functions(&self) -> Vec<(String, Rc<FunctionDef>)> {
        self.functions
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Snapshot of the variables bound directly in this frame. See
    /// [`Environment::own_functions`].
    pub fn own_variables(&self) -> Vec<(String, Value)> {
        self.variables
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.constants.borrow().contains_key(name)
            || self.variables.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new("t.va", 1, 1)
    }

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x", Value::Int(42));
        assert!(matches!(env.get("x"), Some(Value::Int(42))));
    }

    #[test]
    fn undefined_name_is_none() {
        let env = Environment::new();
        assert!(env.get("nope").is_none());
    }

    #[test]
    fn child_shadows_parent() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));
        let child = Environment::with_parent(parent);
        child.define("x", Value::Int(2));
        assert!(matches!(child.get("x"), Some(Value::Int(2))));
    }

    #[test]
    fn set_walks_up_to_declaring_frame() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));
        let child = Environment::with_parent(parent.clone());
        child.set("x", Value::Int(99), span()).unwrap();
        assert!(matches!(parent.get("x"), Some(Value::Int(99))));
    }

    #[test]
    fn set_on_constant_is_immutable_error() {
        let env = Environment::new();
        env.define_constant("k", Value::Int(7));
        let err = env.set("k", Value::Int(8), span()).unwrap_err();
        assert_eq!(err.kind_name(), "ImmutableError");
    }

    #[test]
    fn constants_shadow_variables_and_functions() {
        let env = Environment::new();
        env.define("x", Value::Int(1));
        env.define_constant("x", Value::Int(2));
        assert!(matches!(env.get("x"), Some(Value::Int(2))));
    }

    #[test]
    fn set_on_unbound_name_defines_in_current_frame() {
        let env = Environment::new();
        env.set("y", Value::Int(5), span()).unwrap();
        assert!(matches!(env.get("y"), Some(Value::Int(5))));
    }
}
