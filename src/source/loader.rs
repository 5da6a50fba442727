//! Fetching the raw export payload.
//!
//! One GET against the gviz export endpoint, or a read of a payload saved
//! to disk. There is no timeout and no retry: a failed load ends the run.

use crate::config::SourceConfig;
use crate::source::SourceError;
use reqwest::Url;
use std::path::Path;
use tracing::{debug, info};

/// A spreadsheet tab reachable through the gviz export endpoint.
#[derive(Debug, Clone)]
pub struct SheetSource {
    base_url: String,
    sheet_id: String,
    sheet_name: String,
    http_client: reqwest::Client,
}

impl SheetSource {
    pub fn new(base_url: &str, sheet_id: &str, sheet_name: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            sheet_id: sheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Build a source from the `[source]` config section.
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let sheet_id = config
            .sheet_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SourceError::InvalidUrl("no sheet id configured".to_string()))?;
        Ok(Self::new(&config.base_url, sheet_id, &config.sheet_name))
    }

    /// Export URL, with the sheet name query-encoded.
    pub fn export_url(&self) -> Result<Url, SourceError> {
        let raw = format!("{}/{}/gviz/tq", self.base_url, self.sheet_id);
        Url::parse_with_params(&raw, &[("tqx", "out:json"), ("sheet", self.sheet_name.as_str())])
            .map_err(|e| SourceError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Fetch the raw (JSONP-wrapped) payload.
    pub async fn fetch(&self) -> Result<String, SourceError> {
        let url = self.export_url()?;
        info!("Fetching sheet '{}' from {}", self.sheet_name, url);

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;
        debug!("Received {} bytes", body.len());

        Ok(body)
    }
}

/// Read a saved export payload from disk.
pub async fn load_file(path: &Path) -> Result<String, SourceError> {
    info!("Reading payload from {}", path.display());
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })
}
