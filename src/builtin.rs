use crate::console::{Console, ConsoleBuilder};
use crate::error::RegistrationError;
use crate::router::Affinity;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};

/// Built-in console commands.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and run on
/// whichever thread dispatched them, since they only touch the console itself.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Command path, e.g. "help" or "clear".
    fn path() -> &'static str;

    /// One-line description shown by `help`.
    fn help() -> &'static str;

    fn execute(self, console: &Console) -> Result<()>;
}

/// Parses the arguments into `T` and runs it. Parse failures and `--help`
/// print argh's text to the transcript instead of running anything.
fn run_builtin<T: BuiltinCommand>(console: &Console, args: &[String]) -> Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::path()], &args) {
        Ok(cmd) => cmd.execute(console),
        Err(EarlyExit { output, status: _ }) => {
            console.log(output.trim_end());
            Ok(())
        }
    }
}

fn register<T: BuiltinCommand + 'static>(
    builder: &mut ConsoleBuilder,
) -> Result<(), RegistrationError> {
    builder.register_command(T::path(), T::help(), Affinity::AnyThread, run_builtin::<T>)?;
    Ok(())
}

pub(crate) fn register_builtins(builder: &mut ConsoleBuilder) -> Result<(), RegistrationError> {
    register::<Clear>(builder)?;
    register::<Help>(builder)?;
    register::<HistoryCmd>(builder)?;
    register::<Echo>(builder)?;
    Ok(())
}

#[derive(FromArgs)]
/// Clear the console output.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn path() -> &'static str {
        "clear"
    }

    fn help() -> &'static str {
        "clears console output"
    }

    fn execute(self, console: &Console) -> Result<()> {
        console.clear();
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print every registered command with its description.
pub struct Help {}

impl BuiltinCommand for Help {
    fn path() -> &'static str {
        "help"
    }

    fn help() -> &'static str {
        "prints commands"
    }

    fn execute(self, console: &Console) -> Result<()> {
        console.print_commands();
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print recently run commands, newest first.
pub struct HistoryCmd {
    #[argh(option, short = 'n', default = "10")]
    /// how many entries to print.
    pub count: usize,
}

impl BuiltinCommand for HistoryCmd {
    fn path() -> &'static str {
        "history"
    }

    fn help() -> &'static str {
        "prints recently run commands"
    }

    fn execute(self, console: &Console) -> Result<()> {
        // Entry 0 is this very `history` invocation.
        let entries = console.history(self.count.saturating_add(1));
        for (index, entry) in entries.iter().enumerate().skip(1) {
            console.log(format!("{index:>3}  {entry}"));
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// Write the arguments to the console, separated by spaces.
pub struct Echo {
    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn path() -> &'static str {
        "echo"
    }

    fn help() -> &'static str {
        "prints its arguments"
    }

    fn execute(self, console: &Console) -> Result<()> {
        console.log(self.args.join(" "));
        Ok(())
    }
}
