use crate::config::{COMMAND_OUTPUT_PREFIX, ConsoleConfig};
use crate::error::RegistrationError;
use crate::lexer;
use crate::queue::{ActionQueue, panic_message};
use crate::router::{
    self, Affinity, RequestContext, RequestState, ResponseWriter, Route, RouteTable,
};
use crate::transcript::{History, OutputBuffer};
use crate::trie::CommandTrie;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use tracing::{debug, info, warn};

/// Callback behind a console command. Receives the arguments left over after
/// the command words, in their original case.
pub type CommandAction = Arc<dyn Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// A registered command, stored at its node of the command trie.
#[derive(Clone)]
pub(crate) struct Command {
    path: String,
    action: CommandAction,
    affinity: Affinity,
}

/// What became of a dispatched command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The line was empty.
    Ignored,
    Ran,
    /// Handed to the main thread; runs on the next [`Console::update`].
    Queued,
    NotFound,
    /// The action returned an error or panicked. The failure is in the transcript.
    Failed,
}

/// Registration phase of a [`Console`].
///
/// Commands and routes can only be added here; once [`build`](Self::build)
/// returns, both tables are frozen and read without locking.
pub struct ConsoleBuilder {
    config: ConsoleConfig,
    commands: CommandTrie<Command>,
    help: Vec<(String, String)>,
    routes: RouteTable,
    main_thread: Option<ThreadId>,
}

impl ConsoleBuilder {
    /// A builder with nothing registered.
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            config,
            commands: CommandTrie::new(),
            help: Vec::new(),
            routes: RouteTable::new(),
            main_thread: None,
        }
    }

    /// Adds the built-in commands (`help`, `clear`, `history`, `echo`) and
    /// the `/console/*` endpoints the browser front end talks to.
    pub fn with_builtins(mut self) -> Result<Self, RegistrationError> {
        crate::builtin::register_builtins(&mut self)?;
        crate::routes::register_console_routes(&mut self)?;
        Ok(self)
    }

    /// Designates the main thread. Defaults to the thread calling [`build`](Self::build).
    pub fn main_thread(mut self, thread: ThreadId) -> Self {
        self.main_thread = Some(thread);
        self
    }

    /// Registers a command under a space-separated, case-insensitive path.
    ///
    /// Registering a path again replaces the earlier action and help entry.
    pub fn register_command(
        &mut self,
        path: &str,
        help: &str,
        affinity: Affinity,
        action: impl Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        let display = path.split_whitespace().collect::<Vec<_>>().join(" ");
        let command = Command {
            path: display.clone(),
            action: Arc::new(action),
            affinity,
        };
        let replaced = self.commands.add(path, command)?;

        let key = display.to_lowercase();
        let entry = (display, help.to_string());
        match self
            .help
            .iter_mut()
            .find(|(existing, _)| existing.to_lowercase() == key)
        {
            Some(slot) => *slot = entry,
            None => self.help.push(entry),
        }

        debug!(command = path, replaced = replaced.is_some(), "registered command");
        Ok(self)
    }

    /// Appends a route. Routes are tried in registration order.
    pub fn register_route(
        &mut self,
        pattern: &str,
        verbs: Option<&str>,
        affinity: Affinity,
        handler: impl Fn(&Console, &mut RequestContext) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        let route = Route::new(pattern, verbs, affinity, Arc::new(handler))?;
        debug!(pattern, index = self.routes.len(), "registered route");
        self.routes.register(route);
        Ok(self)
    }

    pub fn build(self) -> Console {
        let queue = match self.main_thread {
            Some(thread) => ActionQueue::bound_to(thread),
            None => ActionQueue::new(),
        };
        let help = self
            .help
            .iter()
            .map(|(path, help)| format!("\n{path} : {help}"))
            .collect();
        info!(
            commands = self.commands.len(),
            routes = self.routes.len(),
            "console ready"
        );
        Console {
            shared: Arc::new(Shared {
                transcript: Mutex::new(Transcript {
                    output: OutputBuffer::new(self.config.max_lines),
                    history: History::new(self.config.max_history),
                }),
                config: self.config,
                commands: self.commands,
                help,
                routes: self.routes,
                queue,
            }),
        }
    }
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

struct Shared {
    config: ConsoleConfig,
    commands: CommandTrie<Command>,
    help: String,
    routes: RouteTable,
    transcript: Mutex<Transcript>,
    queue: ActionQueue,
}

struct Transcript {
    output: OutputBuffer,
    history: History,
}

/// The remote diagnostic console.
///
/// Cheap to clone; every clone is a handle to the same console. Transports
/// call [`run`](Self::run) and [`on_request`](Self::on_request) from any thread,
/// and the main thread calls [`update`](Self::update) once per tick.
///
/// Example
/// ```
/// use remote_console::{Affinity, ConsoleBuilder};
///
/// let mut builder = ConsoleBuilder::default();
/// builder
///     .register_command("greet", "says hello", Affinity::AnyThread, |console, args| {
///         console.log(format!("hello {}", args.join(" ")));
///         Ok(())
///     })
///     .unwrap();
/// let console = builder.build();
///
/// console.run("greet world");
/// assert_eq!(console.output(), "> greet world\nhello world");
/// ```
#[derive(Clone)]
pub struct Console {
    shared: Arc<Shared>,
}

impl Console {
    pub fn config(&self) -> &ConsoleConfig {
        &self.shared.config
    }

    /// Echoes, records and dispatches a command line. Empty lines are ignored.
    pub fn run(&self, line: &str) -> DispatchOutcome {
        if line.is_empty() {
            return DispatchOutcome::Ignored;
        }
        {
            let mut transcript = self.transcript();
            transcript.output.push(format!("{COMMAND_OUTPUT_PREFIX}{line}"));
            transcript.history.record(line);
        }
        self.dispatch(&lexer::split_into_tokens(line))
    }

    /// Finds the command for `tokens` and runs it here or queues it for the
    /// main thread, according to its affinity.
    pub fn dispatch(&self, tokens: &[String]) -> DispatchOutcome {
        let Some(found) = self.shared.commands.lookup(tokens) else {
            debug!(?tokens, "command not found");
            self.log("command not found");
            return DispatchOutcome::NotFound;
        };
        let command = found.value.clone();
        let args = found.args;

        if command.affinity == Affinity::MainThread && !self.is_main_thread() {
            debug!(command = %command.path, "command queued for main thread");
            let console = self.clone();
            self.shared.queue.enqueue(move || {
                console.invoke(&command, &args);
            });
            return DispatchOutcome::Queued;
        }
        self.invoke(&command, &args)
    }

    fn invoke(&self, command: &Command, args: &[String]) -> DispatchOutcome {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (command.action)(self, args)));
        let fault = match outcome {
            Ok(Ok(())) => return DispatchOutcome::Ran,
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!(command = %command.path, %fault, "command failed");
        self.log(format!("{}: {fault}", command.path));
        DispatchOutcome::Failed
    }

    /// Completes a partial command line.
    ///
    /// When several continuations exist they are written to the transcript,
    /// after an echo of the input, and the input comes back unchanged.
    pub fn complete(&self, partial: &str) -> String {
        let completion = self.shared.commands.complete(partial);
        if let Some(listing) = completion.listing {
            let mut transcript = self.transcript();
            transcript
                .output
                .push(format!("{COMMAND_OUTPUT_PREFIX}{}", listing.echo));
            for candidate in listing.candidates {
                transcript.output.push(candidate);
            }
        }
        completion.text
    }

    pub fn log(&self, line: impl Into<String>) {
        self.transcript().output.push(line);
    }

    /// Logs `line` as operator input, prefixed with `"> "`.
    pub fn log_command(&self, line: &str) {
        self.log(format!("{COMMAND_OUTPUT_PREFIX}{line}"));
    }

    /// The whole transcript, one line per entry.
    pub fn output(&self) -> String {
        self.transcript().output.joined()
    }

    /// Transcript lines added since `cursor`, and the cursor for the next call.
    pub fn lines_since(&self, cursor: u64) -> (Vec<String>, u64) {
        self.transcript().output.since(cursor)
    }

    pub fn clear(&self) {
        self.transcript().output.clear();
    }

    /// `index` 0 is the most recently run command.
    pub fn previous_command(&self, index: usize) -> Option<String> {
        self.transcript().history.get(index).map(str::to_string)
    }

    /// Up to `count` history entries, newest first.
    pub fn history(&self, count: usize) -> Vec<String> {
        self.transcript()
            .history
            .iter()
            .take(count)
            .map(str::to_string)
            .collect()
    }

    /// Logs the command list with each command's help text.
    pub fn print_commands(&self) {
        self.log(format!("Commands:{}", self.shared.help));
    }

    /// Runs the work queued for the main thread. Call once per tick from the
    /// main thread; returns how many actions ran.
    pub fn update(&self) -> usize {
        self.shared.queue.drain_once()
    }

    pub fn is_main_thread(&self) -> bool {
        self.shared.queue.is_main_thread()
    }

    pub fn main_thread(&self) -> ThreadId {
        self.shared.queue.main_thread()
    }

    pub fn pending_actions(&self) -> usize {
        self.shared.queue.len()
    }

    /// Builds a request context for an inbound request and resolves it.
    pub fn on_request(
        &self,
        method: &str,
        path: &str,
        query: HashMap<String, String>,
        writer: Box<dyn ResponseWriter>,
    ) -> RequestState {
        let path = router::normalize_path(path, &self.shared.config.default_document);
        self.resolve(RequestContext::new(method, path, query, writer))
    }

    /// Resumes route resolution for `ctx` from its cursor.
    pub fn resolve(&self, ctx: RequestContext) -> RequestState {
        router::resolve(self, ctx)
    }

    pub(crate) fn routes(&self) -> &RouteTable {
        &self.shared.routes
    }

    pub(crate) fn queue(&self) -> &ActionQueue {
        &self.shared.queue
    }

    fn transcript(&self) -> std::sync::MutexGuard<'_, Transcript> {
        self.shared
            .transcript
            .lock()
            .expect("console transcript poisoned")
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("commands", &self.shared.commands.len())
            .field("routes", &self.shared.routes.len())
            .field("main_thread", &self.main_thread())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryWriter;
    use crate::router::Response;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Runs `f` on a fresh thread, standing in for a transport's I/O thread.
    fn off_main<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        thread::spawn(f).join().unwrap()
    }

    type Calls = Arc<Mutex<Vec<Vec<String>>>>;

    fn recorder() -> (
        Calls,
        impl Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |_: &Console, args: &[String]| {
            sink.lock().unwrap().push(args.to_vec());
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_passes_trailing_args() {
        let (list_calls, list) = recorder();
        let (print_calls, print) = recorder();
        let mut builder = ConsoleBuilder::default();
        builder
            .register_command("object list", "lists", Affinity::AnyThread, list)
            .unwrap()
            .register_command("object print", "prints", Affinity::AnyThread, print)
            .unwrap();
        let console = builder.build();

        assert_eq!(console.run("object print foo"), DispatchOutcome::Ran);
        assert_eq!(*print_calls.lock().unwrap(), vec![vec!["foo".to_string()]]);
        assert!(list_calls.lock().unwrap().is_empty());

        assert_eq!(console.run("object"), DispatchOutcome::NotFound);
        assert_eq!(console.output(), "> object print foo\n> object\ncommand not found");
    }

    #[test]
    fn test_reregistration_keeps_last_action() {
        let (first_calls, first) = recorder();
        let (second_calls, second) = recorder();
        let mut builder = ConsoleBuilder::default();
        builder
            .register_command("stats", "old", Affinity::AnyThread, first)
            .unwrap()
            .register_command("STATS", "new", Affinity::AnyThread, second)
            .unwrap();
        let console = builder.build();

        console.run("stats");
        assert!(first_calls.lock().unwrap().is_empty());
        assert_eq!(second_calls.lock().unwrap().len(), 1);

        console.print_commands();
        assert!(console.output().ends_with("Commands:\nSTATS : new"));
    }

    #[test]
    fn test_empty_command_path_fails_registration() {
        let mut builder = ConsoleBuilder::default();
        let err = builder
            .register_command(" ", "nothing", Affinity::AnyThread, |_, _| Ok(()))
            .err();
        assert!(matches!(err, Some(RegistrationError::EmptyCommand)));
    }

    #[test]
    fn test_main_thread_command_from_io_thread_waits_for_update() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let mut builder = ConsoleBuilder::default();
        builder
            .register_command("tick", "counts", Affinity::MainThread, move |console, _| {
                assert!(console.is_main_thread());
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        let remote = console.clone();
        let outcome = off_main(move || remote.run("tick"));
        assert_eq!(outcome, DispatchOutcome::Queued);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(console.pending_actions(), 1);

        assert_eq!(console.update(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(console.update(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_main_thread_command_on_main_thread_runs_inline() {
        let (calls, action) = recorder();
        let mut builder = ConsoleBuilder::default();
        builder
            .register_command("now", "inline", Affinity::MainThread, action)
            .unwrap();
        let console = builder.build();

        assert_eq!(console.run("now a b"), DispatchOutcome::Ran);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(console.pending_actions(), 0);
    }

    #[test]
    fn test_bound_main_thread_owns_the_queue() {
        let (tx, rx) = std::sync::mpsc::channel::<Console>();
        let worker = thread::spawn(move || {
            let console = rx.recv().unwrap();
            assert!(console.is_main_thread());
            console.update()
        });

        let mut builder = ConsoleBuilder::default().main_thread(worker.thread().id());
        builder
            .register_command("tick", "counts", Affinity::MainThread, |_, _| Ok(()))
            .unwrap();
        let console = builder.build();
        assert_eq!(console.main_thread(), worker.thread().id());

        assert_eq!(console.run("tick"), DispatchOutcome::Queued);
        assert_eq!(console.update(), 0);
        assert_eq!(console.pending_actions(), 1);

        tx.send(console.clone()).unwrap();
        assert_eq!(worker.join().unwrap(), 1);
        assert_eq!(console.pending_actions(), 0);
    }

    #[test]
    fn test_failing_command_is_reported_and_console_continues() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_command("fail", "errors", Affinity::AnyThread, |_, _| {
                anyhow::bail!("disk on fire")
            })
            .unwrap()
            .register_command("crash", "panics", Affinity::MainThread, |_, _| {
                panic!("crashed")
            })
            .unwrap()
            .register_command("ok", "works", Affinity::MainThread, |console, _| {
                console.log("still alive");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        assert_eq!(console.run("fail"), DispatchOutcome::Failed);
        assert!(console.output().ends_with("fail: disk on fire"));

        let remote = console.clone();
        off_main(move || {
            remote.run("crash");
            remote.run("ok");
        });
        assert_eq!(console.update(), 2);
        assert!(console.output().contains("crash: crashed"));
        assert!(console.output().ends_with("still alive"));
    }

    #[test]
    fn test_complete_logs_candidates() {
        let mut builder = ConsoleBuilder::default();
        for path in ["object list", "object load", "object print"] {
            builder
                .register_command(path, "", Affinity::AnyThread, |_, _| Ok(()))
                .unwrap();
        }
        let console = builder.build();

        assert_eq!(console.complete("object l"), "object l");
        assert_eq!(console.output(), "> object l\nobject list\nobject load");

        console.clear();
        assert_eq!(console.complete("object li"), "object list ");
        assert_eq!(console.output(), "");
    }

    #[test]
    fn test_output_and_history_bounds() {
        let console = ConsoleBuilder::default().build();
        for i in 0..150 {
            console.log(format!("{i}"));
        }
        let expected: Vec<String> = (50..150).map(|i| i.to_string()).collect();
        assert_eq!(console.output(), expected.join("\n"));

        for i in 0..60 {
            console.run(&format!("cmd{i}"));
        }
        assert_eq!(console.previous_command(0).as_deref(), Some("cmd59"));
        assert_eq!(console.previous_command(49).as_deref(), Some("cmd10"));
        assert_eq!(console.previous_command(50), None);
    }

    #[test]
    fn test_empty_line_is_ignored() {
        let console = ConsoleBuilder::default().build();
        assert_eq!(console.run(""), DispatchOutcome::Ignored);
        assert_eq!(console.output(), "");
        assert_eq!(console.previous_command(0), None);
    }

    #[test]
    fn test_whitespace_line_is_recorded_but_not_found() {
        let console = ConsoleBuilder::default().build();
        assert_eq!(console.run("   "), DispatchOutcome::NotFound);
        assert_eq!(console.output(), ">    \ncommand not found");
        assert_eq!(console.previous_command(0).as_deref(), Some("   "));
    }

    fn request(console: &Console, method: &str, path: &str) -> (RequestState, Vec<Response>) {
        let (writer, handle) = MemoryWriter::with_handle();
        let state = console.on_request(method, path, HashMap::new(), Box::new(writer));
        (state, handle.responses())
    }

    #[test]
    fn test_download_response_carries_file_name() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route(r"^/dump$", None, Affinity::AnyThread, |_, ctx| {
                ctx.respond_download(b"state".to_vec(), "state.bin");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        let (writer, handle) = MemoryWriter::with_handle();
        console.on_request("GET", "/dump", HashMap::new(), Box::new(writer));
        let response = handle.last().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.attachment.as_deref(), Some("state.bin"));
        assert_eq!(response.content_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(response.body, b"state");
    }

    #[test]
    fn test_pass_falls_through_to_next_route() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route(r"^/foo\.json$", None, Affinity::AnyThread, |_, ctx| {
                ctx.respond_text("discarded", "text/plain");
                ctx.pass();
                Ok(())
            })
            .unwrap()
            .register_route(r"^/(.*)\.json$", None, Affinity::AnyThread, |_, ctx| {
                let name = ctx.group(1).unwrap_or_default().to_string();
                ctx.respond_text(format!("{{\"name\":\"{name}\"}}"), "application/json");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        let (state, responses) = request(&console, "GET", "/foo.json");
        assert_eq!(state, RequestState::Done);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].body_text(), "{\"name\":\"foo\"}");
        assert_eq!(responses[0].content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_pass_with_no_remaining_route_is_unhandled() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route(r"^/foo\.json$", None, Affinity::AnyThread, |_, ctx| {
                ctx.pass();
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        let (state, responses) = request(&console, "GET", "/foo.json");
        assert_eq!(state, RequestState::Unhandled);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, 404);
    }

    #[test]
    fn test_verb_filter_skips_route() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route("^/data$", Some("POST"), Affinity::AnyThread, |_, ctx| {
                ctx.respond_text("posted", "text/plain");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        assert_eq!(request(&console, "GET", "/data").0, RequestState::Unhandled);
        let (state, responses) = request(&console, "post", "/data");
        assert_eq!(state, RequestState::Done);
        assert_eq!(responses[0].body_text(), "posted");
    }

    #[test]
    fn test_root_path_uses_default_document() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route(r"^/index\.html$", None, Affinity::AnyThread, |_, ctx| {
                ctx.respond_text("<html></html>", "text/html");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        assert_eq!(request(&console, "GET", "/").0, RequestState::Done);
        assert_eq!(request(&console, "GET", "").0, RequestState::Done);
    }

    #[test]
    fn test_handler_fault_answers_500_and_leaves_others_working() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route("^/bad$", None, Affinity::AnyThread, |_, _| {
                anyhow::bail!("handler exploded")
            })
            .unwrap()
            .register_route("^/panic$", None, Affinity::AnyThread, |_, _| panic!("kaboom"))
            .unwrap()
            .register_route("^/good$", None, Affinity::AnyThread, |_, _| Ok(()))
            .unwrap();
        let console = builder.build();

        let (state, responses) = request(&console, "GET", "/bad");
        assert_eq!(state, RequestState::Failed);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, 500);
        assert!(responses[0].body_text().contains("handler exploded"));

        let (state, responses) = request(&console, "GET", "/panic");
        assert_eq!(state, RequestState::Failed);
        assert!(responses[0].body_text().contains("kaboom"));

        let (state, responses) = request(&console, "GET", "/good");
        assert_eq!(state, RequestState::Done);
        assert_eq!(responses[0], Response::ok());
    }

    #[test]
    fn test_main_thread_route_resumes_at_same_cursor() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        let third = order.clone();
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route("^/scene$", None, Affinity::AnyThread, move |_, ctx| {
                first.lock().unwrap().push(format!("io:{}", ctx.cursor()));
                ctx.pass();
                Ok(())
            })
            .unwrap()
            .register_route("^/scene$", None, Affinity::MainThread, move |console, ctx| {
                assert!(console.is_main_thread());
                second.lock().unwrap().push(format!("main:{}", ctx.cursor()));
                ctx.pass();
                Ok(())
            })
            .unwrap()
            .register_route("^/scene$", None, Affinity::MainThread, move |_, ctx| {
                third.lock().unwrap().push(format!("main:{}", ctx.cursor()));
                ctx.respond_text("scene", "text/plain");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        let (writer, handle) = MemoryWriter::with_handle();
        let remote = console.clone();
        let state = off_main(move || {
            remote.on_request("GET", "/scene", HashMap::new(), Box::new(writer))
        });

        assert_eq!(state, RequestState::Queued);
        assert!(handle.responses().is_empty());
        assert_eq!(*order.lock().unwrap(), vec!["io:0"]);

        assert_eq!(console.update(), 1);
        assert_eq!(*order.lock().unwrap(), vec!["io:0", "main:1", "main:2"]);
        let responses = handle.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].body_text(), "scene");
    }

    #[test]
    fn test_queued_route_fault_does_not_block_queue() {
        let mut builder = ConsoleBuilder::default();
        builder
            .register_route("^/boom$", None, Affinity::MainThread, |_, _| panic!("main boom"))
            .unwrap()
            .register_route("^/fine$", None, Affinity::MainThread, |_, ctx| {
                ctx.respond_text("fine", "text/plain");
                Ok(())
            })
            .unwrap();
        let console = builder.build();

        let (boom_writer, boom) = MemoryWriter::with_handle();
        let (fine_writer, fine) = MemoryWriter::with_handle();
        let remote = console.clone();
        off_main(move || {
            remote.on_request("GET", "/boom", HashMap::new(), Box::new(boom_writer));
            remote.on_request("GET", "/fine", HashMap::new(), Box::new(fine_writer));
        });

        assert_eq!(console.update(), 2);
        assert_eq!(boom.responses()[0].status, 500);
        assert_eq!(fine.responses()[0].body_text(), "fine");
    }
}
