use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gcp::DEFAULT_ENDPOINT;

/// One row of the final report. Serializes in report column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    #[serde(rename = "Project ID")]
    pub project_id: String,
    #[serde(rename = "Instance")]
    pub instance: String,
    #[serde(rename = "Database Version")]
    pub database_version: String,
}

impl InstanceRecord {
    pub fn new(project_id: &str, instance: SqlInstance) -> Self {
        Self {
            project_id: project_id.to_string(),
            instance: instance.name,
            database_version: instance.database_version,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SqlInstance {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "databaseVersion", default)]
    pub database_version: String,
}

/// A single page of `instances.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstancesPage {
    #[serde(default)]
    pub items: Vec<SqlInstance>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl InstancesPage {
    /// Continuation for the following request. An empty token ends the listing.
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output: OutputFormat,
    /// Negative means every project is processed.
    pub limit: i64,
    pub concurrency: usize,
    pub page_size: Option<u32>,
    pub pause: Duration,
    pub show_progress: bool,
    pub endpoint: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::Table,
            limit: -1,
            concurrency: 1,
            page_size: None,
            pause: Duration::ZERO,
            show_progress: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Outcome of listing a single project. Records gathered before a failure are kept.
#[derive(Debug)]
pub struct ProjectListing {
    pub project_id: String,
    pub records: Vec<InstanceRecord>,
    pub error: Option<anyhow::Error>,
}

impl ProjectListing {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
