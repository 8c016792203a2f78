//! Error types for the interpreter, covering lexing, parsing, and evaluation failures.
//!
//! Every variant carries a source location (file, line, column) so a single
//! `render` method can produce the pretty-printed diagnostic block the CLI and
//! REPL both show the user. `kind_name` exposes the taxonomy name used by
//! `catch (TYPE)` filters at the language level.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Span {
            file: file.into(),
            line,
            column,
        }
    }

    /// Used by built-ins, which don't see source positions; the evaluator
    /// overwrites this with the real call-site span via `VaError::with_span`.
    pub fn unknown() -> Self {
        Span::new(String::new(), 0, 0)
    }
}

#[derive(Error, Debug, Clone)]
pub enum VaError {
    #[error("{message}")]
    SyntaxError {
        span: Span,
        message: String,
        hint: Option<String>,
    },

    #[error("undefined name '{name}'")]
    UndefinedError { span: Span, name: String },

    #[error("expected {expected}, got {actual}")]
    TypeError {
        span: Span,
        expected: String,
        actual: String,
    },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { span: Span, index: i64, len: usize },

    #[error("key {key} not found")]
    KeyNotFound { span: Span, key: String },

    #[error("division by zero")]
    DivisionByZero { span: Span },

    #[error("cannot assign to constant '{name}'")]
    ImmutableError { span: Span, name: String },

    #[error("'{name}' is declared but never assigned")]
    AnytionError { span: Span, name: String },

    #[error("value is unassigned")]
    UnassignedError { span: Span },

    #[error("{message}")]
    FunctionCallError { span: Span, message: String },

    #[error("{message}")]
    UserException { span: Span, message: String },

    #[error("{message}")]
    ImportError { span: Span, message: String },
}

impl VaError {
    pub fn span(&self) -> &Span {
        match self {
            VaError::SyntaxError { span, .. }
            | VaError::UndefinedError { span, .. }
            | VaError::TypeError { span, .. }
            | VaError::IndexOutOfRange { span, .. }
            | VaError::KeyNotFound { span, .. }
            | VaError::DivisionByZero { span }
            | VaError::ImmutableError { span, .. }
            | VaError::AnytionError { span, .. }
            | VaError::UnassignedError { span }
            | VaError::FunctionCallError { span, .. }
            | VaError::UserException { span, .. }
            | VaError::ImportError { span, .. } => span,
        }
    }

    /// The taxonomy name used by `catch (TYPE)` filters (§7).
    pub fn kind_name(&self) -> &'static str {
        match self {
            VaError::SyntaxError { .. } => "SyntaxError",
            VaError::UndefinedError { .. } => "UndefinedError",
            VaError::TypeError { .. } => "TypeError",
            VaError::IndexOutOfRange { .. } => "IndexOutOfRange",
            VaError::KeyNotFound { .. } => "KeyNotFound",
            VaError::DivisionByZero { .. } => "DivisionByZero",
            VaError::ImmutableError { .. } => "ImmutableError",
            VaError::AnytionError { .. } => "AnytionError",
            VaError::UnassignedError { .. } => "UnassignedError",
            VaError::FunctionCallError { .. } => "FunctionCallError",
            VaError::UserException { .. } => "UserException",
            VaError::ImportError { .. } => "ImportError",
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            VaError::SyntaxError { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    pub fn type_error(span: Span, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        VaError::TypeError {
            span,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn undefined(span: Span, name: impl Into<String>) -> Self {
        VaError::UndefinedError {
            span,
            name: name.into(),
        }
    }

    pub fn immutable(span: Span, name: impl Into<String>) -> Self {
        VaError::ImmutableError {
            span,
            name: name.into(),
        }
    }

    pub fn function_call(span: Span, message: impl Into<String>) -> Self {
        VaError::FunctionCallError {
            span,
            message: message.into(),
        }
    }

    pub fn index_out_of_range(span: Span, index: i64, len: usize) -> Self {
        VaError::IndexOutOfRange { span, index, len }
    }

    pub fn key_not_found(span: Span, key: impl Into<String>) -> Self {
        VaError::KeyNotFound {
            span,
            key: key.into(),
        }
    }

    pub fn division_by_zero(span: Span) -> Self {
        VaError::DivisionByZero { span }
    }

    pub fn anytion(span: Span, name: impl Into<String>) -> Self {
        VaError::AnytionError {
            span,
            name: name.into(),
        }
    }

    pub fn unassigned(span: Span) -> Self {
        VaError::UnassignedError { span }
    }

    pub fn user_exception(span: Span, message: impl Into<String>) -> Self {
        VaError::UserException {
            span,
            message: message.into(),
        }
    }

    pub fn import_error(span: Span, message: impl Into<String>) -> Self {
        VaError::ImportError {
            span,
            message: message.into(),
        }
    }

    pub fn syntax(span: Span, message: impl Into<String>, hint: Option<String>) -> Self {
        VaError::SyntaxError {
            span,
            message: message.into(),
            hint,
        }
    }

    /// Rewrites the span on any variant. Built-ins construct errors with a
    /// placeholder span since they don't see source positions; the
    /// evaluator calls this to attach the real call-site span before the
    /// error propagates further.
    pub fn with_span(mut self, new_span: Span) -> Self {
        let slot = match &mut self {
            VaError::SyntaxError { span, .. }
            | VaError::UndefinedError { span, .. }
            | VaError::TypeError { span, .. }
            | VaError::IndexOutOfRange { span, .. }
            | VaError::KeyNotFound { span, .. }
            | VaError::DivisionByZero { span }
            | VaError::ImmutableError { span, .. }
            | VaError::AnytionError { span, .. }
            | VaError::UnassignedError { span }
            | VaError::FunctionCallError { span, .. }
            | VaError::UserException { span, .. }
            | VaError::ImportError { span, .. } => span,
        };
        *slot = new_span;
        self
    }

    /// Renders the `Error: ... \n --> file:line:col \n <source line> \n <caret>`
    /// block described in the external interface contract. `source` is the
    /// full text of the file (or REPL buffer) the span refers to.
    pub fn render(&self, source: &str) -> String {
        let span = self.span();
        let mut out = format!("Error: {}\n", self);
        out.push_str(&format!(
            "  --> {}:{}:{}\n",
            span.file, span.line, span.column
        ));
        if let Some(line_text) = source.lines().nth(span.line.saturating_sub(1)) {
            let gutter = format!("{}", span.line);
            out.push_str(&format!("{} | {}\n", gutter, line_text));
            let pad = " ".repeat(gutter.len());
            let caret_pad = " ".repeat(span.column.saturating_sub(1));
            out.push_str(&format!("{} | {}^\n", pad, caret_pad));
        }
        if let Some(hint) = self.hint() {
            out.push_str(&format!("Hint: {}\n", hint));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_name_matches_taxonomy() {
        let err = VaError::immutable(Span::new("f.va", 1, 1), "k");
        assert_eq!(err.kind_name(), "ImmutableError");
    }

    #[test]
    fn render_includes_caret_at_column() {
        let err = VaError::immutable(Span::new("f.va", 1, 1), "k");
        let rendered = err.render("k = 8;\n");
        assert!(rendered.contains("--> f.va:1:1"));
        assert!(rendered.contains("k = 8;"));
        assert!(rendered.contains("^"));
    }
}
