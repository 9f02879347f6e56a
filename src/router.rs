//! Ordered route table and the resumable request resolution walk.

use crate::Console;
use crate::error::RegistrationError;
use crate::queue::panic_message;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether a command or route must run on the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    /// Queued and run from [`Console::update`] when invoked elsewhere.
    #[default]
    MainThread,
    /// Runs on whichever thread invoked it.
    AnyThread,
}

/// Callback serving a matched request.
pub type RouteHandler =
    Arc<dyn Fn(&Console, &mut RequestContext) -> anyhow::Result<()> + Send + Sync>;

/// One entry of the route table.
pub struct Route {
    pattern: Regex,
    verbs: Option<Regex>,
    affinity: Affinity,
    handler: RouteHandler,
}

impl Route {
    /// Compiles a route.
    ///
    /// `pattern` is matched case-insensitively against the normalized path.
    /// `verbs`, when given, must match the whole request method (`GET|HEAD`).
    pub fn new(
        pattern: &str,
        verbs: Option<&str>,
        affinity: Affinity,
        handler: RouteHandler,
    ) -> Result<Self, RegistrationError> {
        if pattern.is_empty() {
            return Err(RegistrationError::EmptyPattern);
        }
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RegistrationError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        let verbs = match verbs.filter(|filter| !filter.is_empty()) {
            Some(filter) => Some(Regex::new(&format!("^(?:{filter})$")).map_err(|source| {
                RegistrationError::InvalidVerbFilter {
                    filter: filter.to_string(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(Self {
            pattern: compiled,
            verbs,
            affinity,
            handler,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// Capture groups of a successful match; group 0 is the whole match.
    fn matches(&self, path: &str, method: &str) -> Option<Vec<Option<String>>> {
        if let Some(verbs) = &self.verbs {
            if !verbs.is_match(method) {
                return None;
            }
        }
        let captures = self.pattern.captures(path)?;
        Some(
            captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("verbs", &self.verbs.as_ref().map(Regex::as_str))
            .field("affinity", &self.affinity)
            .finish_non_exhaustive()
    }
}

/// Routes in registration order.
///
/// Order is the only priority: catch-all and file routes belong at the end.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }
}

/// A response staged by a handler and delivered through a [`ResponseWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// File name to offer as a download, if any.
    pub attachment: Option<String>,
}

impl Response {
    /// 200 with no body.
    pub fn ok() -> Self {
        Self {
            status: 200,
            content_type: None,
            body: Vec::new(),
            attachment: None,
        }
    }

    pub fn text(body: impl Into<String>, content_type: &str) -> Self {
        Self::bytes(body.into().into_bytes(), content_type)
    }

    pub fn bytes(body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body,
            attachment: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            ..Self::text("Not Found", "text/plain")
        }
    }

    pub fn internal_error(detail: &str) -> Self {
        Self {
            status: 500,
            ..Self::text(format!("Fatal error:\n{detail}"), "text/plain")
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-side sink for the single response of a request.
///
/// Consuming `self` means a writer can deliver at most once; the resolver
/// guarantees it delivers at least once per request.
pub trait ResponseWriter: Send {
    fn send(self: Box<Self>, response: Response);
}

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    /// Waiting in the action queue for the main thread.
    Queued,
    Handling,
    Done,
    /// No route accepted the request; answered with 404.
    Unhandled,
    /// A handler failed; answered with 500.
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Unhandled | Self::Failed)
    }
}

/// Mutable per-request state, carried across a hop onto the main thread.
pub struct RequestContext {
    method: String,
    path: String,
    query: HashMap<String, String>,
    cursor: usize,
    groups: Vec<Option<String>>,
    pass: bool,
    state: RequestState,
    staged: Option<Response>,
    writer: Option<Box<dyn ResponseWriter>>,
}

impl RequestContext {
    /// `path` must already be normalized, see [`normalize_path`].
    pub fn new(
        method: &str,
        path: impl Into<String>,
        query: HashMap<String, String>,
        writer: Box<dyn ResponseWriter>,
    ) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.into(),
            query,
            cursor: 0,
            groups: Vec::new(),
            pass: false,
            state: RequestState::Pending,
            staged: None,
            writer: Some(writer),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Capture group `index` of the route currently handling the request.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|group| group.as_deref())
    }

    /// Index of the next route to try.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Declines the request so resolution continues with the next route.
    pub fn pass(&mut self) {
        self.pass = true;
    }

    pub fn respond(&mut self, response: Response) {
        self.staged = Some(response);
    }

    pub fn respond_text(&mut self, body: impl Into<String>, content_type: &str) {
        self.respond(Response::text(body, content_type));
    }

    pub fn respond_bytes(&mut self, body: Vec<u8>, content_type: &str) {
        self.respond(Response::bytes(body, content_type));
    }

    /// Sends `body` as a file download named `file_name`.
    pub fn respond_download(&mut self, body: Vec<u8>, file_name: &str) {
        self.respond(Response {
            attachment: Some(file_name.to_string()),
            ..Response::bytes(body, "application/octet-stream")
        });
    }

    fn finish(&mut self, state: RequestState, response: Response) -> RequestState {
        self.state = state;
        if let Some(writer) = self.writer.take() {
            writer.send(response);
        }
        state
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Maps the empty path and `/` onto the default document.
pub fn normalize_path(path: &str, default_document: &str) -> String {
    match path {
        "" | "/" => format!("/{}", default_document.trim_start_matches('/')),
        _ => path.to_string(),
    }
}

/// Walks the route table from the context's cursor until a handler accepts the
/// request, the request is queued for the main thread, or no route is left.
///
/// A queued request resumes at the same route when the main thread drains it.
pub(crate) fn resolve(console: &Console, mut ctx: RequestContext) -> RequestState {
    let routes = console.routes();

    while let Some(route) = routes.get(ctx.cursor) {
        let Some(groups) = route.matches(&ctx.path, &ctx.method) else {
            ctx.cursor += 1;
            continue;
        };

        if route.affinity == Affinity::MainThread && !console.is_main_thread() {
            debug!(path = %ctx.path, route = ctx.cursor, "request queued for main thread");
            ctx.state = RequestState::Queued;
            let resumed = console.clone();
            console.queue().enqueue(move || {
                resolve(&resumed, ctx);
            });
            return RequestState::Queued;
        }

        ctx.groups = groups;
        ctx.state = RequestState::Handling;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (route.handler)(console, &mut ctx)));
        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(format!("{err:#}")),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        if let Some(fault) = fault {
            warn!(path = %ctx.path, route = route.pattern(), %fault, "route handler failed");
            return ctx.finish(RequestState::Failed, Response::internal_error(&fault));
        }

        if ctx.pass {
            ctx.pass = false;
            ctx.staged = None;
            ctx.cursor += 1;
            ctx.state = RequestState::Pending;
            continue;
        }

        let response = ctx.staged.take().unwrap_or_else(Response::ok);
        return ctx.finish(RequestState::Done, response);
    }

    debug!(method = %ctx.method, path = %ctx.path, "no route matched");
    ctx.finish(RequestState::Unhandled, Response::not_found())
}
