use esfleet_api::mock::ScriptedApi;
use esfleet_api::RemoteApi;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Writer that keeps everything written to it for later inspection.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.contents())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A scripted API plus the shared handle operations expect.
pub fn scripted() -> (Arc<ScriptedApi>, Option<Arc<dyn RemoteApi>>) {
    let api = Arc::new(ScriptedApi::new());
    let handle: Arc<dyn RemoteApi> = api.clone();
    (api, Some(handle))
}

pub const CLUSTER_ID: &str = "320b7b540dfc967a7a649c18e2fce4ed";
