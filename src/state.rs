//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::device::DeviceClient;
use crate::tools::ToolCatalog;

/// Shared application state for the gateway.
///
/// Everything here is built once at startup and never mutated, so cloning
/// per request is just a few reference-count bumps.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Tool definitions served by `tools/list`.
    pub catalog: Arc<ToolCatalog>,
    /// HTTP client bound to the configured device.
    pub device: DeviceClient,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let device = DeviceClient::new(&config.device)?;
        let catalog = ToolCatalog::new(&config);
        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            device,
            start_time: Instant::now(),
        })
    }
}
