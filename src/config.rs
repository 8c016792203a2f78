//! Version, banner, and prompt constants shared by the CLI and REPL (§4.6).

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const WELCOME_MESSAGE: &str = "Vanction REPL";
pub const WELCOME_SUBTITLE: &str = "Type an expression, or 'exit'/'quit' to leave.";

/// Prompt shown at the start of a new statement.
pub const PROMPT: &str = "vanction> ";
/// Prompt shown while a `{ ... }` block is still open across lines.
pub const CONTINUATION_PROMPT: &str = "...> ";

pub const HISTORY_FILE: &str = ".vanction_history";
