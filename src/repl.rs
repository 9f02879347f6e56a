//! Local line-based front end for the console.

use crate::Console;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

/// Tab completion backed by the console's command tree.
pub struct ConsoleHelper {
    console: Console,
}

impl ConsoleHelper {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl Completer for ConsoleHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let completed = self.console.complete(&line[..pos]);
        Ok((0, vec![completed]))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {}

impl Helper for ConsoleHelper {}

/// Reads lines until EOF or Ctrl-C and feeds each one to [`Console::run`].
///
/// Output is not printed here: commands may run later on the main thread,
/// so whoever ticks the console is responsible for showing the transcript.
pub fn run_repl(console: &Console, prompt: &str) -> rustyline::Result<()> {
    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ConsoleHelper::new(console.clone())));

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.as_str())?;
                }
                console.run(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
