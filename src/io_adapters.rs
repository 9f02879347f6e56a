use crate::router::{Response, ResponseWriter};
use std::sync::{Arc, Mutex};

/// Memory-backed response writer.
///
/// Useful for embedding the router without a network transport, and for
/// checking what a request was answered with.
pub struct MemoryWriter {
    sent: Arc<Mutex<Vec<Response>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, handle).
    pub fn with_handle() -> (Self, ResponseHandle) {
        let writer = MemoryWriter::new();
        let handle = ResponseHandle(writer.sent.clone());
        (writer, handle)
    }
}

impl Default for MemoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for MemoryWriter {
    fn send(self: Box<Self>, response: Response) {
        self.sent
            .lock()
            .expect("response sink poisoned")
            .push(response);
    }
}

/// Read side of a [`MemoryWriter`], usable after the writer was handed off.
#[derive(Clone)]
pub struct ResponseHandle(Arc<Mutex<Vec<Response>>>);

impl ResponseHandle {
    /// Every response delivered so far; at most one per request.
    pub fn responses(&self) -> Vec<Response> {
        self.0.lock().expect("response sink poisoned").clone()
    }

    pub fn last(&self) -> Option<Response> {
        self.0.lock().expect("response sink poisoned").last().cloned()
    }
}
