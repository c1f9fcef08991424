use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command as AsyncCommand;
use tracing::info;

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Project IDs in the order they should be processed.
    async fn project_ids(&self) -> Result<Vec<String>>;
}

/// Lists projects visible to the active gcloud account.
pub struct GcloudProjectSource;

#[async_trait]
impl ProjectSource for GcloudProjectSource {
    async fn project_ids(&self) -> Result<Vec<String>> {
        let output = AsyncCommand::new("gcloud")
            .args(["projects", "list", "--format=value(projectId)"])
            .output()
            .await
            .context("Failed to run gcloud projects list")?;

        if !output.status.success() {
            return Err(anyhow!(
                "Failed to list projects: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(parse_project_ids(&stdout))
    }
}

pub fn parse_project_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keeps the first `limit` projects. A negative limit keeps all of them.
pub fn apply_limit(mut project_ids: Vec<String>, limit: i64) -> Vec<String> {
    if let Ok(limit) = usize::try_from(limit) {
        project_ids.truncate(limit);
    }
    project_ids
}

/// Lists projects from `source` and applies `limit`. A failing source is fatal.
pub async fn discover_projects(source: &dyn ProjectSource, limit: i64) -> Result<Vec<String>> {
    let discovered = source.project_ids().await?;
    let total = discovered.len();
    let project_ids = apply_limit(discovered, limit);
    info!(
        discovered = total,
        selected = project_ids.len(),
        "Discovered projects"
    );
    Ok(project_ids)
}
