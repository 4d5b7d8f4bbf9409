//! The operation flows of [`crate::scenarios`] driven through the HTTP client
//! against a local control-plane server.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Hit counters and captured request bodies shared by the route handlers.
#[derive(Debug, Default)]
pub struct ServerState {
    hits: Mutex<Vec<String>>,
    bodies: Mutex<Vec<Value>>,
    polls: AtomicUsize,
}

impl ServerState {
    pub fn record(&self, route: &str) {
        self.hits
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(route.to_string());
    }

    pub fn keep_body(&self, body: Value) {
        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(body);
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the zero-based index of this poll.
    pub fn next_poll(&self) -> usize {
        self.polls.fetch_add(1, Ordering::SeqCst)
    }
}

pub type Shared = Arc<ServerState>;

/// Error envelope the control plane answers with.
pub fn remote_error(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"errors": [{"code": code, "message": message}]})),
    )
}
