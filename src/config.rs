/// Maximum number of lines kept in the console transcript.
pub const MAX_LINES: usize = 100;

/// Maximum number of commands kept in the history.
pub const MAX_HISTORY: usize = 50;

/// Prefix written in front of echoed user input.
pub const COMMAND_OUTPUT_PREFIX: &str = "> ";

/// Tunables for a [`Console`](crate::Console).
///
/// The defaults match what a remote operator expects from the browser page:
/// a 100-line scrollback, 50 remembered commands and `/` serving `index.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Transcript capacity; the oldest line is evicted on overflow.
    pub max_lines: usize,
    /// History capacity; the oldest command is evicted on overflow.
    pub max_history: usize,
    /// Document name substituted for an empty request path.
    pub default_document: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_lines: MAX_LINES,
            max_history: MAX_HISTORY,
            default_document: "index.html".to_string(),
        }
    }
}
