use argh::FromArgs;
use remote_console::config::COMMAND_OUTPUT_PREFIX;
use remote_console::logging::ConsoleLayer;
use remote_console::{Affinity, ConsoleBuilder, ConsoleConfig, repl, transport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(FromArgs)]
/// Serve a remote diagnostic console over HTTP and the local terminal.
struct Options {
    #[argh(option, default = "55055")]
    /// port the HTTP transport listens on.
    port: u16,

    #[argh(option, default = "String::from(\"0.0.0.0\")")]
    /// address the HTTP transport binds to.
    bind: String,

    #[argh(option, default = "16")]
    /// milliseconds between main-thread ticks.
    tick_ms: u64,

    #[argh(switch)]
    /// do not read commands from the terminal.
    no_repl: bool,
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();
    let running = Arc::new(AtomicBool::new(true));

    let mut builder = ConsoleBuilder::new(ConsoleConfig::default()).with_builtins()?;
    let quit = running.clone();
    builder.register_command(
        "quit",
        "stops the console process",
        Affinity::MainThread,
        move |_, _| {
            quit.store(false, Ordering::SeqCst);
            Ok(())
        },
    )?;
    let console = builder.build();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(ConsoleLayer::new(console.clone()))
        .init();

    let addr = format!("{}:{}", options.bind, options.port);
    let http = transport::spawn_http(console.clone(), &addr)?;
    info!(addr = http.addr(), "remote console started");

    if !options.no_repl {
        let local = console.clone();
        let stop = running.clone();
        thread::Builder::new().name("console-repl".into()).spawn(move || {
            if let Err(err) = repl::run_repl(&local, COMMAND_OUTPUT_PREFIX) {
                warn!(%err, "terminal input failed");
            }
            stop.store(false, Ordering::SeqCst);
        })?;
    }

    let tick = Duration::from_millis(options.tick_ms);
    let mut cursor = 0;
    while running.load(Ordering::SeqCst) {
        console.update();
        if !options.no_repl {
            let (lines, next) = console.lines_since(cursor);
            cursor = next;
            for line in lines.iter().filter(|line| !line.starts_with(COMMAND_OUTPUT_PREFIX)) {
                println!("{line}");
            }
        }
        thread::sleep(tick);
    }

    http.shutdown();
    Ok(())
}
