//! Mirroring of host-process log events into the console transcript.

use crate::Console;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// A tracing layer that writes every event as a transcript line, so remote
/// operators see the application's log next to their command output.
///
/// Events emitted by this crate are skipped; the console already reports
/// its own outcomes in the transcript.
pub struct ConsoleLayer {
    console: Console,
}

impl ConsoleLayer {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

struct MessageCollector<'a>(&'a mut String);

impl Visit for MessageCollector<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.0 = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S> Layer<S> for ConsoleLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }
        let mut message = String::new();
        event.record(&mut MessageCollector(&mut message));
        self.console.log(format!("{} {message}", metadata.level()));
    }
}
