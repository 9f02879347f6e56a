//! An embeddable remote diagnostic console.
//!
//! A long-lived process registers console commands and HTTP-style routes at
//! startup, then lets operators drive it remotely: command lines are tokenized
//! and dispatched through a prefix tree of command words, and requests are
//! resolved against an ordered route table where a handler may decline and
//! pass the request on to the next matching route.
//!
//! Commands and routes that must run on the application's main thread are
//! handed over through a FIFO queue that the main thread drains once per tick
//! with [`Console::update`]. Everything else runs on the calling thread.
//!
//! The main entry points are [`ConsoleBuilder`] for registration and
//! [`Console`] for everything after. [`transport`] and [`repl`] connect a
//! console to an HTTP listener and to a local terminal.

mod builtin;
pub mod config;
mod console;
pub mod error;
mod io_adapters;
pub mod lexer;
pub mod logging;
mod queue;
pub mod repl;
pub mod router;
mod routes;
pub mod transcript;
pub mod transport;
pub mod trie;

pub use config::ConsoleConfig;
pub use console::{CommandAction, Console, ConsoleBuilder, DispatchOutcome};
pub use error::{RegistrationError, ServeError};
pub use io_adapters::{MemoryWriter, ResponseHandle};
pub use queue::{Action, ActionQueue};
pub use router::{
    Affinity, RequestContext, RequestState, Response, ResponseWriter, Route, RouteHandler,
    RouteTable,
};
