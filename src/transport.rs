//! HTTP transport: a tiny_http listener feeding requests into the console.

use crate::Console;
use crate::error::ServeError;
use crate::router::{Response, ResponseWriter};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Server};
use tracing::{info, warn};

/// A running listener and its I/O thread.
pub struct HttpTransport {
    server: Arc<Server>,
    io_thread: Option<JoinHandle<()>>,
    addr: String,
}

impl HttpTransport {
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Stops accepting requests and waits for the I/O thread to finish.
    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(handle) = self.io_thread.take() {
            if handle.join().is_err() {
                warn!("console HTTP thread panicked");
            }
        }
    }
}

/// Binds `addr` and serves requests on a dedicated I/O thread.
///
/// Routes bound to the main thread are answered later, from whichever tick
/// drains them; the request stays open until then.
pub fn spawn_http(console: Console, addr: &str) -> Result<HttpTransport, ServeError> {
    let server = Server::http(addr).map_err(|source| ServeError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    let server = Arc::new(server);
    let listener = server.clone();

    let io_thread = thread::Builder::new()
        .name("console-http".into())
        .spawn(move || {
            for request in listener.incoming_requests() {
                let method = request.method().to_string();
                let (path, query) = split_url(request.url());
                console.on_request(&method, &path, query, Box::new(TinyHttpWriter { request }));
            }
        })?;

    info!(%addr, "console HTTP transport listening");
    Ok(HttpTransport {
        server,
        io_thread: Some(io_thread),
        addr: addr.to_string(),
    })
}

struct TinyHttpWriter {
    request: tiny_http::Request,
}

impl ResponseWriter for TinyHttpWriter {
    fn send(self: Box<Self>, response: Response) {
        if let Err(err) = self.request.respond(to_http_response(response)) {
            warn!(%err, "failed to write console response");
        }
    }
}

fn to_http_response(response: Response) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let mut reply =
        tiny_http::Response::from_data(response.body).with_status_code(response.status);
    if let Some(content_type) = response.content_type {
        if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
            reply.add_header(header);
        }
    }
    if let Some(file_name) = response.attachment {
        let value = format!("attachment; filename={file_name}");
        if let Ok(header) = Header::from_bytes("Content-Disposition", value) {
            reply.add_header(header);
        }
    }
    reply
}

/// Splits a request target into its decoded path and query parameters.
///
/// Query values use form encoding, so `+` decodes to a space. A parameter
/// given twice keeps its first value.
pub fn split_url(url: &str) -> (String, HashMap<String, String>) {
    let (raw_path, raw_query) = url.split_once('?').unwrap_or((url, ""));
    let mut query = HashMap::new();
    for pair in raw_query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        query
            .entry(decode_component(key, true))
            .or_insert_with(|| decode_component(value, true));
    }
    (decode_component(raw_path, false), query)
}

fn decode_component(input: &str, form: bool) -> String {
    let input = if form {
        input.replace('+', " ")
    } else {
        input.to_string()
    };
    let decoded = urlencoding::decode(&input).map(|decoded| decoded.into_owned());
    decoded.unwrap_or(input)
}
