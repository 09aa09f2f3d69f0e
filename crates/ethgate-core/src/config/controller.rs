use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::errors::ConfigError;
use crate::upstream::HttpClient;

use super::{ConfigHandle, GatewayConfig, RunningConfig};

/// How often the config source is re-read.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Where config text comes from. The controller only needs "current
/// text, or failure"; transport and format of the source are not its
/// concern.
pub trait ConfigSource: Send + 'static {
    fn load(&self) -> Result<String, ConfigError>;
}

/// File-backed config source.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Polls a [`ConfigSource`] and atomically replaces the running
/// configuration when the raw text changes.
///
/// The first load happens in [`ConfigController::bootstrap`] and its
/// failure is fatal by propagation — the process has nothing to serve.
/// Once bootstrapped, load or build failures degrade to keeping the
/// previous snapshot and logging a warning. Raw text and running config
/// are replaced together, so readers never observe a stale-text/fresh-
/// config pair.
pub struct ConfigController {
    source: Box<dyn ConfigSource>,
    client: HttpClient,
    handle: ConfigHandle,
    last_text: String,
}

impl ConfigController {
    /// Performs the mandatory first load and returns the controller plus
    /// the handle readers should clone.
    ///
    /// # Errors
    ///
    /// Any read, parse or build failure of the initial config.
    pub fn bootstrap(
        source: Box<dyn ConfigSource>,
        client: HttpClient,
    ) -> Result<(Self, ConfigHandle), ConfigError> {
        let text = source.load()?;
        let running = build_from_text(&text, &client)?;
        let handle = ConfigHandle::new(running);
        tracing::info!("initial config loaded");

        let controller = Self {
            source,
            client,
            handle: handle.clone(),
            last_text: text,
        };
        Ok((controller, handle))
    }

    /// Spawns the polling loop. It stops cleanly when the shutdown
    /// channel fires; no further reads are attempted after that.
    pub fn spawn(mut self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.reload_once(),
                    _ = shutdown.recv() => {
                        tracing::info!("config polling stopped");
                        return;
                    }
                }
            }
        })
    }

    fn reload_once(&mut self) {
        let text = match self.source.load() {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(%error, "config source unreadable, keeping previous config");
                return;
            }
        };

        if text == self.last_text {
            return;
        }

        match build_from_text(&text, &self.client) {
            Ok(running) => {
                self.handle.swap(running);
                self.last_text = text;
                tracing::info!("config changed, new running config applied");
            }
            Err(error) => {
                tracing::warn!(%error, "config rebuild failed, keeping previous config");
            }
        }
    }
}

fn build_from_text(text: &str, client: &HttpClient) -> Result<RunningConfig, ConfigError> {
    let config: GatewayConfig = serde_json::from_str(text)?;
    RunningConfig::build(&config, client)
}
