//! Shared fixtures: capture writer, API handles, a local control-plane server.

use axum::Router;
use esfleet_api::mock::ScriptedApi;
use esfleet_api::{ApiConfig, HttpApi, RemoteApi};
use esfleet_ops::track::TrackParams;
use esfleet_ops::ApiHandle;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Writer that keeps every byte for later inspection. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    fn buf(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.contents())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Operation handle backed by a scripted control plane.
pub fn handle(api: &Arc<ScriptedApi>) -> ApiHandle {
    let shared: Arc<dyn RemoteApi> = api.clone();
    Some(shared)
}

/// Operation handle backed by the HTTP client pointed at `host`.
pub fn http_handle(host: &str) -> esfleet_api::Result<ApiHandle> {
    let api = HttpApi::new(ApiConfig {
        host: host.to_string(),
        ..ApiConfig::default()
    })?;
    let shared: Arc<dyn RemoteApi> = Arc::new(api);
    Ok(Some(shared))
}

/// Tracking parameters that poll every `interval` and retry `retries` times.
pub fn tracking(writer: &CaptureWriter, interval: Duration, retries: u32) -> TrackParams {
    TrackParams::new(writer.clone()).with_frequency(interval, retries)
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> io::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            debug!(error = %e, "test server stopped");
        }
    });
    Ok(format!("http://{}", addr))
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_test_logging() {
    let _ = esfleet_ops::logging::init_logging("esfleet_ops=debug");
}
