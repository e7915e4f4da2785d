use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::api::PoolApi;
use crate::event::SubjectId;
use crate::snapshot::Snapshot;
use crate::types::ValDesc;
use crate::{Error, Result};

/// In-memory [`PoolApi`] that records commands instead of sending them.
#[derive(Default)]
pub(crate) struct RecordingApi {
    snapshot: Snapshot,
    heat_modes: Vec<ValDesc>,
    light_themes: Vec<ValDesc>,
    fail_commands: bool,
    commands: Mutex<Vec<(String, Value)>>,
}

impl RecordingApi {
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn with_heat_modes(mut self, modes: Vec<ValDesc>) -> Self {
        self.heat_modes = modes;
        self
    }

    pub fn with_light_themes(mut self, themes: Vec<ValDesc>) -> Self {
        self.light_themes = themes;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_commands = true;
        self
    }

    pub fn commands(&self) -> Vec<(String, Value)> {
        self.commands.lock().unwrap().clone()
    }
}

impl PoolApi for RecordingApi {
    fn config(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    async fn heat_modes(&self, _body_id: SubjectId) -> Result<Vec<ValDesc>> {
        Ok(self.heat_modes.clone())
    }

    async fn light_themes(&self, _circuit_id: SubjectId) -> Result<Vec<ValDesc>> {
        Ok(self.light_themes.clone())
    }

    async fn command(&self, url: &str, data: Value) -> Result<()> {
        if self.fail_commands {
            return Err(Error::Protocol("command rejected".to_string()));
        }
        self.commands.lock().unwrap().push((url.to_string(), data));
        Ok(())
    }

    fn unique_id(&self, suffix: &str) -> String {
        format!("{}_{}", self.controller_id(), suffix)
    }

    fn controller_id(&self) -> String {
        "test".to_string()
    }
}

/// Collects formatted tracing output for the current thread.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
