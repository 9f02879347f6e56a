//! Endpoints the browser front end uses to drive the console.

use crate::console::ConsoleBuilder;
use crate::error::RegistrationError;
use crate::router::Affinity;

const READ_VERBS: &str = "GET|HEAD";

pub(crate) fn register_console_routes(
    builder: &mut ConsoleBuilder,
) -> Result<(), RegistrationError> {
    builder
        .register_route("^/console/out$", Some(READ_VERBS), Affinity::AnyThread, |console, ctx| {
            ctx.respond_text(console.output(), "text/plain");
            Ok(())
        })?
        .register_route("^/console/run$", Some(READ_VERBS), Affinity::AnyThread, |console, ctx| {
            if let Some(command) = ctx.query("command").filter(|command| !command.is_empty()) {
                console.run(command);
            }
            Ok(())
        })?
        .register_route(
            "^/console/commandHistory$",
            Some(READ_VERBS),
            Affinity::AnyThread,
            |console, ctx| {
                let previous = ctx
                    .query("index")
                    .and_then(|index| index.trim().parse::<usize>().ok())
                    .and_then(|index| console.previous_command(index))
                    .unwrap_or_default();
                ctx.respond_text(previous, "text/plain");
                Ok(())
            },
        )?
        .register_route(
            "^/console/complete$",
            Some(READ_VERBS),
            Affinity::AnyThread,
            |console, ctx| {
                let found = ctx
                    .query("command")
                    .map(|partial| console.complete(partial))
                    .unwrap_or_default();
                ctx.respond_text(found, "text/plain");
                Ok(())
            },
        )?;
    Ok(())
}
