//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod databases;
pub mod import;
pub mod session;

use crate::config::FileConfig;
use crate::error::Result;
use std::sync::Arc;
use tdbulk_client::ApiClient;
use tokio_util::sync::CancellationToken;

/// Settings shared by every command
pub struct Context {
    pub config: FileConfig,
    pub server_url: Option<String>,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(config: FileConfig, server_url: Option<String>, cancel: CancellationToken) -> Self {
        Self {
            config,
            server_url,
            cancel,
        }
    }

    /// API client bound to this command's cancellation token
    pub fn client(&self) -> Result<Arc<ApiClient>> {
        let config = self.config.client_config(self.server_url.as_deref())?;
        let client = ApiClient::new(config)?.with_cancellation(self.cancel.clone());
        Ok(Arc::new(client))
    }
}
