//! Tree-walking evaluator. Executes a parsed [`Program`] against a chain of
//! [`Environment`] frames, dispatching calls through the resolution order
//! described for dotted and bare callees: module/dict field, then the
//! imported-function table, then the built-in registry.
//!
//! Non-local exits (`return`, `break`, `continue`) are threaded back up
//! through statement execution as a [`Flow`] value rather than unwound with
//! Rust exceptions, so `try`/`finally` can observe and re-apply them.

use crate::ast::{CatchClause, Expr, FunctionDef, Program, Stmt, SwitchCase};
use crate::builtins::{self, BuiltinFn, Registry};
use crate::env::Environment;
use crate::error::{Span, VaError};
use crate::value::{ScalarKey, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Outcome of executing a statement or block: either it ran to completion,
/// or it's carrying a `return`/`break`/`continue` up to the nearest loop or
/// function boundary that can absorb it.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Returning(Value),
    Breaking,
    Continuing,
}

enum Callable {
    User(Rc<FunctionDef>, Option<Rc<Environment>>),
    Builtin(BuiltinFn),
}

pub struct Evaluator {
    pub(crate) global: Rc<Environment>,
    pub(crate) registry: Rc<Registry>,
    pub(crate) file: String,
    pub(crate) base_dir: PathBuf,
}

impl Evaluator {
    pub fn new(file: impl Into<String>, base_dir: PathBuf) -> Self {
        Evaluator {
            global: Environment::new(),
            registry: Rc::new(builtins::register_builtins()),
            file: file.into(),
            base_dir,
        }
    }

    /// A fresh evaluator for a module loaded by `import`, sharing only the
    /// built-in registry (§4.5: no shared global state between modules).
    pub fn sub_evaluator(&self, file: impl Into<String>, base_dir: PathBuf) -> Self {
        Evaluator {
            global: Environment::new(),
            registry: self.registry.clone(),
            file: file.into(),
            base_dir,
        }
    }

    pub fn global_env(&self) -> &Rc<Environment> {
        &self.global
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Registers a program's top-level functions and runs its top-level
    /// statements, then requires and invokes `main()` with no arguments
    /// (§4.3's four-step run contract).
    pub fn run_program(&mut self, program: &Program) -> Result<(), VaError> {
        self.load_definitions(program)?;
        let entry_span = Span::new(self.file.clone(), 1, 1);
        let main = self
            .global
            .get_function("main")
            .ok_or_else(|| VaError::function_call(entry_span.clone(), "no 'main' function defined"))?;
        self.invoke_user(&main, None, Vec::new(), &self.global.clone(), entry_span)?;
        Ok(())
    }

    /// Registers top-level functions and executes top-level statements
    /// without requiring or invoking `main`. Used by the module loader,
    /// which only needs the resulting global frame to harvest exports from.
    pub fn load_definitions(&mut self, program: &Program) -> Result<(), VaError> {
        self.load_definitions_repl(program)?;
        Ok(())
    }

    /// Like [`Evaluator::load_definitions`], but also returns the value of
    /// every bare top-level expression statement in source order, so the
    /// REPL can echo it (§4.6.2: "a bare expression statement's value is
    /// printed ... unless it is `Null`").
    pub fn load_definitions_repl(&mut self, program: &Program) -> Result<Vec<Value>, VaError> {
        for func in &program.functions {
            self.global.define_function(func.name.clone(), Rc::new(func.clone()));
        }
        let global = self.global.clone();
        let mut values = Vec::new();
        for stmt in &program.top_level {
            if let Stmt::Expression(expr) = stmt {
                values.push(self.eval_expr(expr, &global)?);
            } else {
                self.exec_stmt(stmt, &global)?;
            }
        }
        Ok(values)
    }

    pub(crate) fn exec_block(&self, stmts: &[Stmt], env: &Rc<Environment>) -> Result<Flow, VaError> {
        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Flow, VaError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval_expr(expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Define { name, .. } => {
                env.define(name.clone(), Value::Anytion);
                Ok(Flow::Normal)
            }
            Stmt::Return(expr, ..) => {
                let value = match expr {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Returning(value))
            }
            Stmt::Break(..) => Ok(Flow::Breaking),
            Stmt::Continue(..) => Ok(Flow::Continuing),
            Stmt::Throw(expr, line, column) => {
                let span = Span::new(self.file.clone(), *line, *column);
                let message = match expr {
                    Some(e) => self.eval_expr(e, env)?.to_string(),
                    None => String::new(),
                };
                Err(VaError::user_exception(span, message))
            }
            Stmt::If {
                cond,
                then_body,
                else_ifs,
                else_body,
            } => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    return self.exec_block(then_body, env);
                }
                for (branch_cond, branch_body) in else_ifs {
                    if self.eval_expr(branch_cond, env)?.is_truthy() {
                        return self.exec_block(branch_body, env);
                    }
                }
                match else_body {
                    Some(body) => self.exec_block(body, env),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_expr(cond, env)?.is_truthy() {
                    match self.exec_block(body, env)? {
                        Flow::Breaking => break,
                        Flow::Returning(v) => return Ok(Flow::Returning(v)),
                        Flow::Normal | Flow::Continuing => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForC {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init_stmt) = init {
                    self.exec_stmt(init_stmt, env)?;
                }
                loop {
                    if let Some(c) = cond {
                        if !self.eval_expr(c, env)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec_block(body, env)? {
                        Flow::Breaking => break,
                        Flow::Returning(v) => return Ok(Flow::Returning(v)),
                        Flow::Normal | Flow::Continuing => {}
                    }
                    if let Some(update_stmt) = update {
                        self.exec_stmt(update_stmt, env)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForIn { var, iterable, body } => {
                let (line, column) = iterable.position();
                let span = Span::new(self.file.clone(), line, column);
                let iter_val = self.eval_expr(iterable, env)?;
                let items = self.iterate(&iter_val, &span)?;
                for item in items {
                    // Each iteration gets a fresh child frame (distinct from
                    // the shared-scope C-style loop) so closures captured
                    // inside the body see their own binding of `var`.
                    let frame = Environment::with_parent(env.clone());
                    frame.define(var.clone(), item);
                    match self.exec_block(body, &frame)? {
                        Flow::Breaking => break,
                        Flow::Returning(v) => return Ok(Flow::Returning(v)),
                        Flow::Normal | Flow::Continuing => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Switch {
                subject,
                cases,
                default,
            } => self.exec_switch(subject, cases, default, env),
            Stmt::Import {
                path,
                alias,
                line,
                column,
            } => {
                let span = Span::new(self.file.clone(), *line, *column);
                crate::loader::load_module(self, path, alias.as_deref(), env, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Try { body, catch, finally } => self.exec_try(body, catch, finally, env),
        }
    }

    fn exec_switch(
        &self,
        subject: &Expr,
        cases: &[SwitchCase],
        default: &Option<Vec<Stmt>>,
        env: &Rc<Environment>,
    ) -> Result<Flow, VaError> {
        let (line, column) = subject.position();
        let span = Span::new(self.file.clone(), line, column);
        let subject_val = self.eval_expr(subject, env)?;
        for case in cases {
            let case_val = self.eval_expr(&case.value, env)?;
            if self.values_equal(&subject_val, &case_val, &span)? {
                return self.exec_block(&case.body, env);
            }
        }
        match default {
            Some(body) => self.exec_block(body, env),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_try(
        &self,
        body: &[Stmt],
        catch: &Option<CatchClause>,
        finally: &Option<Vec<Stmt>>,
        env: &Rc<Environment>,
    ) -> Result<Flow, VaError> {
        let result = match self.exec_block(body, env) {
            Err(e) => match catch {
                Some(clause) => {
                    let matches_type = match &clause.error_type {
                        Some(t) => t == e.kind_name(),
                        None => true,
                    };
                    if matches_type {
                        let frame = Environment::with_parent(env.clone());
                        if let Some(var) = &clause.var {
                            let mut record = HashMap::new();
                            record.insert(ScalarKey::Str("type".into()), Value::String(e.kind_name().into()));
                            record.insert(ScalarKey::Str("message".into()), Value::String(e.to_string()));
                            frame.define(var.clone(), Value::Dict(Rc::new(RefCell::new(record))));
                        }
                        self.exec_block(&clause.body, &frame)
                    } else {
                        Err(e)
                    }
                }
                None => Err(e),
            },
            ok => ok,
        };
        // finally always runs, on every exit path, and its own non-normal
        // flow (a return/break inside it) takes precedence over whatever
        // the try body or catch clause produced.
        if let Some(body) = finally {
            let finally_flow = self.exec_block(body, env)?;
            if !matches!(finally_flow, Flow::Normal) {
                return Ok(finally_flow);
            }
        }
        result
    }

    fn iterate(&self, v: &Value, span: &Span) -> Result<Vec<Value>, VaError> {
        match v {
            Value::Array(a) => Ok(a.borrow().clone()),
            Value::Tuple(t) => Ok(t.as_ref().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Dict(d) => Ok(d
                .borrow()
                .keys()
                .map(|k| match k {
                    ScalarKey::Int(i) => Value::Int(*i),
                    ScalarKey::Str(s) => Value::String(s.clone()),
                    ScalarKey::Bool(b) => Value::Bool(*b),
                })
                .collect()),
            other => Err(VaError::type_error(
                span.clone(),
                "array, tuple, string, or dict",
                other.type_name(),
            )),
        }
    }

    pub(crate) fn eval_expr(&self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, VaError> {
        match expr {
            Expr::IntLiteral(n, ..) => Ok(Value::Int(*n)),
            Expr::FloatLiteral(n, ..) => Ok(Value::Float(*n)),
            Expr::StringLiteral(s, ..) => Ok(Value::String(s.clone())),
            Expr::BoolLiteral(b, ..) => Ok(Value::Bool(*b)),
            Expr::FString(template, line, column) => {
                let span = Span::new(self.file.clone(), *line, *column);
                self.interpolate(template, env, &span).map(Value::String)
            }
            Expr::Identifier(name, line, column) => {
                // `anytion` names the sentinel directly rather than reading
                // a declared-but-unassigned variable, so it bypasses the
                // lookup that would otherwise raise AnytionError.
                if name == "anytion" {
                    return Ok(Value::Anytion);
                }
                let span = Span::new(self.file.clone(), *line, *column);
                match env.get(name) {
                    Some(Value::Anytion) => Err(VaError::anytion(span, name.clone())),
                    Some(v) => Ok(v),
                    None => Err(VaError::undefined(span, name.clone())),
                }
            }
            Expr::Assign {
                name,
                is_constant,
                value,
                line,
                column,
            } => {
                let span = Span::new(self.file.clone(), *line, *column);
                let v = self.eval_expr(value, env)?;
                if *is_constant {
                    env.define_constant(name.clone(), v.clone());
                } else {
                    env.set(name, v.clone(), span)?;
                }
                Ok(v)
            }
            Expr::MultiAssign {
                targets,
                value,
                line,
                column,
            } => {
                let span = Span::new(self.file.clone(), *line, *column);
                let v = self.eval_expr(value, env)?;
                let values: Vec<Value> = match &v {
                    Value::Array(a) => a.borrow().clone(),
                    Value::Tuple(t) => t.as_ref().clone(),
                    _ => vec![v.clone(); targets.len()],
                };
                if values.len() != targets.len() {
                    return Err(VaError::function_call(
                        span,
                        format!("cannot unpack {} value(s) into {} target(s)", values.len(), targets.len()),
                    ));
                }
                for (name, val) in targets.iter().zip(values.into_iter()) {
                    env.set(name, val, span.clone())?;
                }
                Ok(v)
            }
            Expr::Binary { left, op, right, line, column } => {
                let span = Span::new(self.file.clone(), *line, *column);
                self.eval_binary(op, left, right, env, &span)
            }
            Expr::Unary { op, operand, line, column } => {
                let span = Span::new(self.file.clone(), *line, *column);
                let v = self.eval_expr(operand, env)?;
                self.check_operand(&v, &span)?;
                match (op.as_str(), &v) {
                    ("-", Value::Int(i)) => Ok(Value::Int(-i)),
                    ("-", Value::Float(f)) => Ok(Value::Float(-f)),
                    ("+", Value::Int(_)) | ("+", Value::Float(_)) => Ok(v),
                    ("!", _) => Ok(Value::Bool(!v.is_truthy())),
                    _ => Err(VaError::type_error(span, "int or float", v.type_name())),
                }
            }
            Expr::Call {
                callee,
                args,
                named_args,
                line,
                column,
            } => {
                let span = Span::new(self.file.clone(), *line, *column);
                let callable = self
                    .resolve_callee_by_name(callee, env)
                    .map_err(|e| e.with_span(span.clone()))?;
                let arg_values = self.eval_args(args, env)?;
                let named_values = self.eval_named_args(named_args, env)?;
                match callable {
                    Callable::User(def, closure) => {
                        self.invoke_user(&def, closure.as_ref(), arg_values, env, span)
                    }
                    Callable::Builtin(f) => self.invoke_builtin(f, &arg_values, &named_values, span),
                }
            }
            Expr::CallExpr {
                callee,
                args,
                named_args,
                line,
                column,
            } => {
                let span = Span::new(self.file.clone(), *line, *column);
                let callee_val = self.eval_expr(callee, env)?;
                let arg_values = self.eval_args(args, env)?;
                let named_values = self.eval_named_args(named_args, env)?;
                match callee_val {
                    Value::Function(def, closure) => {
                        self.invoke_user(&def, closure.as_ref(), arg_values, env, span)
                    }
                    Value::BuiltIn(_, f) => self.invoke_builtin(f, &arg_values, &named_values, span),
                    other => Err(VaError::function_call(
                        span,
                        format!("'{}' is not callable", other.type_name()),
                    )),
                }
            }
            Expr::Member {
                object,
                property,
                line,
                column,
            } => {
                let span = Span::new(self.file.clone(), *line, *column);
                self.eval_member(object, property, env, &span)
            }
            Expr::Index { object, index, line, column } => {
                let span = Span::new(self.file.clone(), *line, *column);
                self.eval_index(object, index, env, &span)
            }
            Expr::Array(elems, ..) => {
                let items = elems
                    .iter()
                    .map(|e| self.eval_expr(e, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(Rc::new(RefCell::new(items))))
            }
            Expr::Dict(entries, line, column) => {
                let span = Span::new(self.file.clone(), *line, *column);
                let mut map = HashMap::new();
                for (k, v) in entries {
                    let key_val = self.eval_expr(k, env)?;
                    let key = key_val
                        .as_scalar_key()
                        .ok_or_else(|| VaError::type_error(span.clone(), "a hashable scalar", key_val.type_name()))?;
                    let value = self.eval_expr(v, env)?;
                    map.insert(key, value);
                }
                Ok(Value::Dict(Rc::new(RefCell::new(map))))
            }
            Expr::Tuple(elems, ..) => {
                let items = elems
                    .iter()
                    .map(|e| self.eval_expr(e, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Tuple(Rc::new(items)))
            }
            Expr::Lambda { params, body, line, column } => {
                // Sugar: wrap the single expression body in a synthetic
                // one-statement function so lambdas share call dispatch with
                // named functions. Unlike a named function (whose frame
                // parents on the caller's current environment, §4.3.3), a
                // lambda captures its defining lexical environment here.
                let synthetic = Rc::new(FunctionDef {
                    name: "<lambda>".to_string(),
                    params: params.clone(),
                    body: vec![Stmt::Return(Some((**body).clone()), *line, *column)],
                    line: *line,
                    column: *column,
                });
                Ok(Value::Function(synthetic, Some(env.clone())))
            }
        }
    }

    fn eval_args(&self, exprs: &[Expr], env: &Rc<Environment>) -> Result<Vec<Value>, VaError> {
        exprs
            .iter()
            .map(|e| {
                let (line, column) = e.position();
                let v = self.eval_expr(e, env)?;
                if matches!(v, Value::Anytion) {
                    return Err(VaError::anytion(Span::new(self.file.clone(), line, column), "argument"));
                }
                Ok(v)
            })
            .collect()
    }

    fn eval_named_args(&self, named_args: &[(String, Expr)], env: &Rc<Environment>) -> Result<Vec<(String, Value)>, VaError> {
        named_args
            .iter()
            .map(|(k, e)| Ok((k.clone(), self.eval_expr(e, env)?)))
            .collect()
    }

    fn eval_member(&self, object: &Expr, property: &str, env: &Rc<Environment>, span: &Span) -> Result<Value, VaError> {
        // `obj.field` where `obj` names an imported module first checks the
        // dotted global key the loader published, matching the Call
        // resolution order in §4.3.3.
        if let Expr::Identifier(obj_name, ..) = object {
            let dotted = format!("{obj_name}.{property}");
            if let Some(def) = self.global.get_function(&dotted) {
                return Ok(Value::Function(def, None));
            }
            if let Some(v) = self.global.get(&dotted) {
                return Ok(v);
            }
        }
        let obj_val = self.eval_expr(object, env)?;
        match &obj_val {
            Value::Module(map) => map
                .get(property)
                .cloned()
                .ok_or_else(|| VaError::undefined(span.clone(), property.to_string())),
            Value::Dict(d) => {
                let key = ScalarKey::Str(property.to_string());
                d.borrow()
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| VaError::key_not_found(span.clone(), property.to_string()))
            }
            other => Err(VaError::type_error(span.clone(), "module or dict", other.type_name())),
        }
    }

    fn eval_index(&self, object: &Expr, index: &Expr, env: &Rc<Environment>, span: &Span) -> Result<Value, VaError> {
        let obj_val = self.eval_expr(object, env)?;
        let idx_val = self.eval_expr(index, env)?;
        match &obj_val {
            Value::String(s) => {
                let i = Self::require_int(&idx_val, span)?;
                let chars: Vec<char> = s.chars().collect();
                let idx = Self::normalize_index(i, chars.len(), span)?;
                Ok(Value::String(chars[idx].to_string()))
            }
            Value::Array(a) => {
                let i = Self::require_int(&idx_val, span)?;
                let items = a.borrow();
                let idx = Self::normalize_index(i, items.len(), span)?;
                Ok(items[idx].clone())
            }
            Value::Tuple(t) => {
                let i = Self::require_int(&idx_val, span)?;
                let idx = Self::normalize_index(i, t.len(), span)?;
                Ok(t[idx].clone())
            }
            Value::Dict(d) => {
                let key = idx_val
                    .as_scalar_key()
                    .ok_or_else(|| VaError::type_error(span.clone(), "a hashable scalar", idx_val.type_name()))?;
                d.borrow()
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| VaError::key_not_found(span.clone(), key.to_string()))
            }
            other => Err(VaError::type_error(span.clone(), "string, array, tuple, or dict", other.type_name())),
        }
    }

    fn require_int(v: &Value, span: &Span) -> Result<i64, VaError> {
        match v {
            Value::Int(i) => Ok(*i),
            other => Err(VaError::type_error(span.clone(), "int", other.type_name())),
        }
    }

    fn normalize_index(i: i64, len: usize, span: &Span) -> Result<usize, VaError> {
        if i < 0 || i as usize >= len {
            return Err(VaError::index_out_of_range(span.clone(), i, len));
        }
        Ok(i as usize)
    }

    fn interpolate(&self, template: &str, env: &Rc<Environment>, span: &Span) -> Result<String, VaError> {
        let mut out = String::new();
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '{' {
                out.push(c);
                continue;
            }
            let mut name = String::new();
            let mut closed = false;
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    closed = true;
                    break;
                }
                name.push(c2);
            }
            if !closed {
                return Err(VaError::syntax(span.clone(), "unterminated interpolation placeholder", None));
            }
            let value = env
                .get(&name)
                .ok_or_else(|| VaError::undefined(span.clone(), name.clone()))?;
            if matches!(value, Value::Anytion) {
                return Err(VaError::anytion(span.clone(), name));
            }
            out.push_str(&value.to_string());
        }
        Ok(out)
    }

    fn resolve_callee_by_name(&self, name: &str, env: &Rc<Environment>) -> Result<Callable, VaError> {
        if let Some((first, rest)) = name.split_once('.') {
            if let Some(Value::Module(map)) = env.get(first) {
                if let Some(v) = map.get(rest) {
                    return self.callable_from_value(v.clone(), name);
                }
            }
            if let Some(def) = self.global.get_function(name) {
                return Ok(Callable::User(def, None));
            }
            if let Some(f) = self.registry.get(name) {
                return Ok(Callable::Builtin(*f));
            }
            return Err(VaError::undefined(Span::unknown(), name.to_string()));
        }
        if let Some(def) = env.get_function(name) {
            return Ok(Callable::User(def, None));
        }
        if let Some(v) = env.get(name) {
            return self.callable_from_value(v, name);
        }
        if let Some(f) = self.registry.get(name) {
            return Ok(Callable::Builtin(*f));
        }
        Err(VaError::undefined(Span::unknown(), name.to_string()))
    }

    fn callable_from_value(&self, v: Value, name: &str) -> Result<Callable, VaError> {
        match v {
            Value::Function(def, closure) => Ok(Callable::User(def, closure)),
            Value::BuiltIn(_, f) => Ok(Callable::Builtin(f)),
            other => Err(VaError::function_call(
                Span::unknown(),
                format!("'{name}' ({}) is not callable", other.type_name()),
            )),
        }
    }

    fn invoke_user(
        &self,
        def: &Rc<FunctionDef>,
        closure_env: Option<&Rc<Environment>>,
        args: Vec<Value>,
        caller_env: &Rc<Environment>,
        span: Span,
    ) -> Result<Value, VaError> {
        if def.params.len() != args.len() {
            return Err(VaError::function_call(
                span,
                format!("{} expects {} argument(s), got {}", def.name, def.params.len(), args.len()),
            ));
        }
        // Named functions parent on the caller's current frame (nested
        // lexical lookup through the call chain); lambdas parent on the
        // environment they closed over at creation time.
        let parent = closure_env.cloned().unwrap_or_else(|| caller_env.clone());
        let frame = Environment::with_parent(parent);
        for (param, value) in def.params.iter().zip(args.into_iter()) {
            frame.define(param.clone(), value);
        }
        match self.exec_block(&def.body, &frame)? {
            Flow::Returning(v) => Ok(v),
            _ => Ok(Value::Null),
        }
    }

    fn invoke_builtin(&self, f: BuiltinFn, args: &[Value], named_args: &[(String, Value)], span: Span) -> Result<Value, VaError> {
        f(args, named_args).map_err(|e| e.with_span(span))
    }

    fn check_operand(&self, v: &Value, span: &Span) -> Result<(), VaError> {
        match v {
            Value::Anytion => Err(VaError::anytion(span.clone(), "operand")),
            Value::Unassigned | Value::Null => Err(VaError::unassigned(span.clone())),
            _ => Ok(()),
        }
    }

    fn eval_binary(&self, op: &str, left: &Expr, right: &Expr, env: &Rc<Environment>, span: &Span) -> Result<Value, VaError> {
        match op {
            "&&" | "and" => {
                let l = self.eval_expr(left, env)?;
                self.check_operand(&l, span)?;
                if !l.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval_expr(right, env)?;
                self.check_operand(&r, span)?;
                Ok(Value::Bool(r.is_truthy()))
            }
            "||" | "or" => {
                let l = self.eval_expr(left, env)?;
                self.check_operand(&l, span)?;
                if l.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval_expr(right, env)?;
                self.check_operand(&r, span)?;
                Ok(Value::Bool(r.is_truthy()))
            }
            _ => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                self.check_operand(&l, span)?;
                self.check_operand(&r, span)?;
                self.apply_binary(op, l, r, span)
            }
        }
    }

    fn apply_binary(&self, op: &str, l: Value, r: Value, span: &Span) -> Result<Value, VaError> {
        match op {
            "+" | "-" | "*" | "/" | "%" | "^" => self.arith(op, l, r, span),
            "==" | "!=" | "<" | ">" | "<=" | ">=" => self.compare(op, l, r, span),
            "&" | "|" | "^^" | "<<" | ">>" => self.bitwise(op, l, r, span),
            other => Err(VaError::function_call(span.clone(), format!("unknown operator '{other}'"))),
        }
    }

    fn arith(&self, op: &str, l: Value, r: Value, span: &Span) -> Result<Value, VaError> {
        match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => match op {
                "+" => Ok(Value::Int(a.wrapping_add(*b))),
                "-" => Ok(Value::Int(a.wrapping_sub(*b))),
                "*" => Ok(Value::Int(a.wrapping_mul(*b))),
                "/" => {
                    if *b == 0 {
                        Err(VaError::division_by_zero(span.clone()))
                    } else {
                        Ok(Value::Int(a.div_euclid(*b)))
                    }
                }
                "%" => {
                    if *b == 0 {
                        Err(VaError::division_by_zero(span.clone()))
                    } else {
                        Ok(Value::Int(a.rem_euclid(*b)))
                    }
                }
                "^" => Ok(Value::Int(a.pow((*b).max(0) as u32))),
                _ => unreachable!(),
            },
            (Value::String(a), Value::String(b)) if op == "+" => Ok(Value::String(format!("{a}{b}"))),
            (Value::Array(a), Value::Array(b)) if op == "+" => {
                let mut combined = a.borrow().clone();
                combined.extend(b.borrow().iter().cloned());
                Ok(Value::Array(Rc::new(RefCell::new(combined))))
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let af = Self::as_f64(&l, span)?;
                let bf = Self::as_f64(&r, span)?;
                match op {
                    "+" => Ok(Value::Float(af + bf)),
                    "-" => Ok(Value::Float(af - bf)),
                    "*" => Ok(Value::Float(af * bf)),
                    "/" => {
                        if bf == 0.0 {
                            Err(VaError::division_by_zero(span.clone()))
                        } else {
                            Ok(Value::Float(af / bf))
                        }
                    }
                    "%" => {
                        if bf == 0.0 {
                            Err(VaError::division_by_zero(span.clone()))
                        } else {
                            Ok(Value::Float(af % bf))
                        }
                    }
                    "^" => Ok(Value::Float(af.powf(bf))),
                    _ => unreachable!(),
                }
            }
            _ => Err(VaError::type_error(span.clone(), l.type_name(), r.type_name())),
        }
    }

    fn as_f64(v: &Value, span: &Span) -> Result<f64, VaError> {
        match v {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            other => Err(VaError::type_error(span.clone(), "int or float", other.type_name())),
        }
    }

    fn compare(&self, op: &str, l: Value, r: Value, span: &Span) -> Result<Value, VaError> {
        if op == "==" || op == "!=" {
            let eq = self.values_equal(&l, &r, span)?;
            return Ok(Value::Bool(if op == "==" { eq } else { !eq }));
        }
        let ord = match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => return Err(VaError::type_error(span.clone(), l.type_name(), r.type_name())),
        };
        let result = match op {
            "<" => ord.is_lt(),
            ">" => ord.is_gt(),
            "<=" => ord.is_le(),
            ">=" => ord.is_ge(),
            _ => unreachable!(),
        };
        Ok(Value::Bool(result))
    }

    /// Structural equality; kinds that can't be meaningfully compared raise
    /// `TypeError` rather than silently reporting not-equal (§9).
    fn values_equal(&self, l: &Value, r: &Value, span: &Span) -> Result<bool, VaError> {
        match (l, r) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Float(a), Value::Float(b)) => Ok(a == b),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => Ok((*a as f64) == *b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Array(a), Value::Array(b)) => {
                let (ab, bb) = (a.borrow(), b.borrow());
                if ab.len() != bb.len() {
                    return Ok(false);
                }
                for (x, y) in ab.iter().zip(bb.iter()) {
                    if !self.values_equal(x, y, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.values_equal(x, y, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let (ab, bb) = (a.borrow(), b.borrow());
                if ab.len() != bb.len() {
                    return Ok(false);
                }
                for (k, v) in ab.iter() {
                    match bb.get(k) {
                        Some(v2) if self.values_equal(v, v2, span)? => continue,
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Err(VaError::type_error(span.clone(), l.type_name(), r.type_name())),
        }
    }

    fn bitwise(&self, op: &str, l: Value, r: Value, span: &Span) -> Result<Value, VaError> {
        if let (Value::Bool(a), Value::Bool(b)) = (&l, &r) {
            if matches!(op, "&" | "|" | "^^") {
                let result = match op {
                    "&" => *a && *b,
                    "|" => *a || *b,
                    "^^" => *a ^ *b,
                    _ => unreachable!(),
                };
                return Ok(Value::Bool(result));
            }
        }
        let (a, b) = match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => (*a, *b),
            _ => {
                let bad = if matches!(l, Value::Int(_)) { r.type_name() } else { l.type_name() };
                return Err(VaError::type_error(span.clone(), "int", bad));
            }
        };
        let result = match op {
            "&" => a & b,
            "|" => a | b,
            "^^" => a ^ b,
            "<<" => a << b,
            ">>" => a >> b,
            _ => unreachable!(),
        };
        Ok(Value::Int(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> Result<Evaluator, VaError> {
        let program = parse(source, "t.va")?;
        let mut eval = Evaluator::new("t.va", PathBuf::from("."));
        eval.run_program(&program)?;
        Ok(eval)
    }

    #[test]
    fn runs_hello_world() {
        run("func main() { System.print(\"hi\"); }").unwrap();
    }

    #[test]
    fn fib_recursion_matches_expected_value() {
        let eval = run(
            "func fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); } \
             func main() { define result; result = fib(10); }",
        )
        .unwrap();
        assert!(matches!(eval.global_env().get("result"), Some(Value::Int(55))));
    }

    #[test]
    fn immutable_reassignment_is_an_error() {
        let err = run("func main() { immut k = 1; k = 2; }").unwrap_err();
        assert_eq!(err.kind_name(), "ImmutableError");
    }

    #[test]
    fn reading_a_declared_but_unassigned_name_is_anytion_error() {
        let err = run("func main() { define x; System.print(x); }").unwrap_err();
        assert_eq!(err.kind_name(), "AnytionError");
    }

    #[test]
    fn try_catch_finally_runs_both_branches() {
        let eval = run(
            "func main() { define log; log = \"\"; \
             try { throw \"bad\"; } catch as e { log = log + e[\"message\"]; } finally { log = log + \"done\"; } }",
        )
        .unwrap();
        assert!(matches!(eval.global_env().get("log"), Some(Value::String(s)) if s == "baddone"));
    }

    #[test]
    fn for_in_binds_a_fresh_frame_per_iteration() {
        let eval = run(
            "func main() { define total; total = 0; \
             for (x in [1, 2, 3]) { total = total + x; } }",
        )
        .unwrap();
        assert!(matches!(eval.global_env().get("total"), Some(Value::Int(6))));
    }

    #[test]
    fn lambda_captures_its_defining_environment() {
        let eval = run(
            "func main() { define base; base = 10; define add; add = lambda x -> x + base; \
             define result; result = add(5); }",
        )
        .unwrap();
        assert!(matches!(eval.global_env().get("result"), Some(Value::Int(15))));
    }

    #[test]
    fn cross_type_comparison_is_a_type_error() {
        let err = run("func main() { if (1 == \"1\") { } }").unwrap_err();
        assert_eq!(err.kind_name(), "TypeError");
    }
}
