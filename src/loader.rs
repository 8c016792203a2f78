//! Module loading for `import PATH;` / `import PATH using ALIAS;` (§4.5).
//!
//! Each import spins up a fresh [`Evaluator`] sharing only the built-in
//! registry, parses and runs the target file's top-level code, then
//! publishes its functions and variables into the importer's environment:
//! dotted (`PATH.f`, `PATH.v`) always, plus an aliased [`Value::Module`] and
//! a second dotted set (`ALIAS.f`, `ALIAS.v`) when `using ALIAS` is given.
//! No caching: a path imported twice is parsed and executed twice, trading
//! one-shot-script startup cost for never having to reason about staleness.

use crate::env::Environment;
use crate::error::{Span, VaError};
use crate::eval::Evaluator;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

thread_local! {
    static IN_PROGRESS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn resolve_path(base_dir: &std::path::Path, segments: &[String]) -> PathBuf {
    let mut path = base_dir.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path.set_extension("va");
    path
}

pub fn load_module(
    evaluator: &Evaluator,
    path_segments: &[String],
    alias: Option<&str>,
    importer_env: &Rc<Environment>,
    span: Span,
) -> Result<(), VaError> {
    let dotted_path = path_segments.join(".");
    let file_path = resolve_path(evaluator.base_dir(), path_segments);
    let canonical = file_path.to_string_lossy().to_string();

    let already_loading = IN_PROGRESS.with(|stack| stack.borrow().contains(&canonical));
    if already_loading {
        return Err(VaError::import_error(
            span,
            format!("import cycle detected while loading '{dotted_path}'"),
        ));
    }

    let source = std::fs::read_to_string(&file_path)
        .map_err(|e| VaError::import_error(span.clone(), format!("cannot read module '{dotted_path}': {e}")))?;

    IN_PROGRESS.with(|stack| stack.borrow_mut().push(canonical.clone()));
    let result = (|| {
        let program = crate::parser::parse(&source, file_path.to_string_lossy().to_string())?;
        let module_base_dir = file_path.parent().unwrap_or(evaluator.base_dir()).to_path_buf();
        let mut sub = evaluator.sub_evaluator(file_path.to_string_lossy().to_string(), module_base_dir);
        sub.load_definitions(&program)?;
        Ok(sub)
    })();
    IN_PROGRESS.with(|stack| {
        stack.borrow_mut().pop();
    });
    let sub = result?;

    let functions = sub.global_env().own_functions();
    let variables = sub.global_env().own_variables();

    for (name, def) in &functions {
        importer_env.define_function(format!("{dotted_path}.{name}"), def.clone());
    }
    for (name, value) in &variables {
        importer_env.define(format!("{dotted_path}.{name}"), value.clone());
    }

    if let Some(alias) = alias {
        let mut fields = HashMap::new();
        for (name, def) in &functions {
            fields.insert(name.clone(), Value::Function(def.clone(), None));
            importer_env.define_function(format!("{alias}.{name}"), def.clone());
        }
        for (name, value) in &variables {
            fields.insert(name.clone(), value.clone());
            importer_env.define(format!("{alias}.{name}"), value.clone());
        }
        importer_env.define(alias.to_string(), Value::Module(Rc::new(fields)));
    }

    Ok(())
}
