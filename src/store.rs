//! Persistent Link Store
//!
//! A passive key/value surface holding the one persisted entity, [`LinkedProject`]. The store has
//! no business logic; writing an empty mapping is the canonical "clear".

use crate::detect::DEFAULT_OUTPUT_DIR;
use crate::error::StoreError;
use crate::wrangler::dashboard_url;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Flat record as persisted. No schema versioning.
pub type LinkRecord = Map<String, Value>;

/// The project this workspace deploys to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProject {
    pub project_name: String,
    pub account_id: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prod_url: Option<String>,
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

impl LinkedProject {
    /// Read a project from a stored record. `None` unless `projectName` and `accountId` are
    /// non-empty strings; other fields fall back to defaults.
    pub fn from_record(record: &LinkRecord) -> Option<Self> {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let project_name = text("projectName").filter(|s| !s.is_empty())?;
        let account_id = text("accountId").filter(|s| !s.is_empty())?;
        Some(Self {
            project_name,
            account_id,
            account_name: text("accountName").unwrap_or_default(),
            output_dir: text("outputDir")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_output_dir),
            prod_url: text("prodUrl").filter(|s| !s.is_empty()),
        })
    }

    pub fn to_record(&self) -> LinkRecord {
        let mut record = LinkRecord::new();
        record.insert("projectName".to_string(), Value::from(self.project_name.as_str()));
        record.insert("accountId".to_string(), Value::from(self.account_id.as_str()));
        record.insert("accountName".to_string(), Value::from(self.account_name.as_str()));
        record.insert("outputDir".to_string(), Value::from(self.output_dir.as_str()));
        if let Some(prod_url) = &self.prod_url {
            record.insert("prodUrl".to_string(), Value::from(prod_url.as_str()));
        }
        record
    }

    /// Known production URL, or the default hostname derived from the project name.
    pub fn production_url(&self) -> String {
        self.prod_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.pages.dev", self.project_name))
    }

    /// Production URL without the scheme, for compact display.
    pub fn production_label(&self) -> String {
        let url = self.production_url();
        url.strip_prefix("https://").unwrap_or(&url).to_string()
    }

    pub fn dashboard_url(&self) -> String {
        dashboard_url(&self.account_id, &self.project_name)
    }
}

/// Persistence surface for the link record. Last write wins.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn read(&self) -> Result<LinkRecord, StoreError>;
    async fn write(&self, record: LinkRecord) -> Result<(), StoreError>;
}

/// JSON file on disk. A missing file reads as an empty record.
#[derive(Debug, Clone)]
pub struct JsonFileLinkStore {
    path: PathBuf,
}

impl JsonFileLinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl LinkStore for JsonFileLinkStore {
    async fn read(&self) -> Result<LinkRecord, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LinkRecord::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(LinkRecord::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(record) => Ok(record),
            other => Err(StoreError::InvalidRecord(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                other
            ))),
        }
    }

    async fn write(&self, record: LinkRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }
        let body = serde_json::to_string_pretty(&Value::Object(record))?;

        // Write-then-rename so a crash never leaves a half-written record.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "Link record written");
        Ok(())
    }
}

/// In-memory store for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    record: Mutex<LinkRecord>,
    writes: Mutex<usize>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: LinkRecord) -> Self {
        Self {
            record: Mutex::new(record),
            writes: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> LinkRecord {
        self.record.lock().clone()
    }

    /// Number of writes performed so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn read(&self) -> Result<LinkRecord, StoreError> {
        Ok(self.record.lock().clone())
    }

    async fn write(&self, record: LinkRecord) -> Result<(), StoreError> {
        *self.record.lock() = record;
        *self.writes.lock() += 1;
        Ok(())
    }
}
