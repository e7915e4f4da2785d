use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::api::PoolApi;
use crate::event::SubjectId;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    controller_id_from_model, heat_modes_path, light_themes_path, parse_val_desc_list,
    API_STATE_ALL, DEFAULT_CONTROLLER_ID,
};
use crate::snapshot::Snapshot;
use crate::types::ValDesc;
use crate::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct NjsPcClientBuilder {
    host: String,
    protocol: String,
    controller_id: Option<String>,
    timeout: Duration,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl NjsPcClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            protocol: "http".to_string(),
            controller_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn protocol(mut self, proto: &str) -> Self {
        self.protocol = proto.to_string();
        self
    }

    /// Override the id prefix used for entity unique ids. Defaults to the
    /// normalized controller model reported by the server.
    pub fn controller_id(mut self, id: impl Into<String>) -> Self {
        self.controller_id = Some(id.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built or the message log file
    /// cannot be opened.
    pub fn build(self) -> NjsPcClient {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("failed to build HTTP client");

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(
                MessageLogger::new(mode, &path).expect("failed to open log file"),
            )),
            _ => None,
        };

        NjsPcClient {
            http,
            base_url: format!("{}://{}", self.protocol, self.host),
            controller_id: self.controller_id,
            config: None,
            logger,
        }
    }
}

/// REST client for a nodejs-poolController server.
pub struct NjsPcClient {
    http: reqwest::Client,
    base_url: String,
    controller_id: Option<String>,
    config: Option<Snapshot>,
    logger: Option<Mutex<MessageLogger>>,
}

impl NjsPcClient {
    pub fn builder(host: impl Into<String>) -> NjsPcClientBuilder {
        NjsPcClientBuilder::new(host)
    }

    /// Fetch the full controller state and cache it for [`PoolApi::config`].
    pub async fn connect(&mut self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, API_STATE_ALL);
        debug!(url = %url, "fetching controller state");

        let resp = self.http.get(&url).send().await?;
        self.log_request("GET", API_STATE_ALL, resp.status().as_u16());
        let body: Value = resp.error_for_status()?.json().await?;
        if !body.is_object() {
            return Err(Error::Protocol("state/all did not return an object".to_string()));
        }

        if let Some(ref logger) = self.logger
            && let Ok(mut logger) = logger.lock()
        {
            logger.log_state(&body);
        }

        let snapshot = Snapshot::new(body);
        if self.controller_id.is_none() {
            self.controller_id = snapshot.model().map(controller_id_from_model);
        }
        debug!(
            controller = %self.controller_id(),
            units = %snapshot.units(),
            "connected to njsPC"
        );
        self.config = Some(snapshot);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        debug!("dropping cached controller state");
        self.config = None;
    }

    pub fn is_connected(&self) -> bool {
        self.config.is_some()
    }

    async fn get_val_desc_list(&self, path: &str) -> Result<Vec<ValDesc>> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.http.get(&url).send().await?;
        self.log_request("GET", path, resp.status().as_u16());
        let body = resp.error_for_status()?.text().await?;
        let list = parse_val_desc_list(&body);
        trace!(path, count = list.len(), "fetched enumeration");
        Ok(list)
    }

    fn log_request(&self, method: &str, path: &str, status: u16) {
        if let Some(ref logger) = self.logger
            && let Ok(mut logger) = logger.lock()
        {
            logger.log_request(method, path, Some(status));
        }
    }
}

impl PoolApi for NjsPcClient {
    fn config(&self) -> Result<Snapshot> {
        self.config.clone().ok_or(Error::NotConnected)
    }

    async fn heat_modes(&self, body_id: SubjectId) -> Result<Vec<ValDesc>> {
        self.get_val_desc_list(&heat_modes_path(body_id)).await
    }

    async fn light_themes(&self, circuit_id: SubjectId) -> Result<Vec<ValDesc>> {
        self.get_val_desc_list(&light_themes_path(circuit_id)).await
    }

    async fn command(&self, url: &str, data: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        if let Some(ref logger) = self.logger
            && let Ok(mut logger) = logger.lock()
        {
            logger.log_command(url, &data);
        }

        let full_url = format!("{}/{}", self.base_url, url);
        debug!(url = %full_url, body = %data, "sending command");
        self.http
            .put(&full_url)
            .json(&data)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn unique_id(&self, suffix: &str) -> String {
        format!("{}_{}", self.controller_id(), suffix)
    }

    fn controller_id(&self) -> String {
        self.controller_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTROLLER_ID.to_string())
    }
}
