use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::gcp::{connect, CredentialProvider, GcpClientTrait};
use crate::progress::Progress;
use crate::projects::{discover_projects, ProjectSource};
use crate::results::ResultSet;
use crate::types::{InstanceRecord, ProjectListing, RunConfig};

/// Walks every page of `instances.list` for one project.
///
/// Pagination stops when a page carries no continuation token. The first
/// failing request ends the listing for this project only; whatever was
/// collected before it is returned alongside the error.
pub async fn list_project_instances(
    client: &dyn GcpClientTrait,
    project_id: &str,
) -> ProjectListing {
    let mut records = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        match client.list_instances_page(project_id, page_token.take()).await {
            Ok(page) => {
                let next = page.continuation().map(str::to_string);
                records.extend(
                    page.items
                        .into_iter()
                        .map(|instance| InstanceRecord::new(project_id, instance)),
                );
                match next {
                    Some(token) => page_token = Some(token),
                    None => {
                        return ProjectListing {
                            project_id: project_id.to_string(),
                            records,
                            error: None,
                        }
                    }
                }
            }
            Err(e) => {
                return ProjectListing {
                    project_id: project_id.to_string(),
                    records,
                    error: Some(e),
                }
            }
        }
    }
}

async fn process_project(
    client: &dyn GcpClientTrait,
    progress: &dyn Progress,
    project_id: &str,
    pause: Duration,
) -> ProjectListing {
    progress.describe(&format!("Processing project: {}", project_id));
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }

    let listing = list_project_instances(client, project_id).await;
    match &listing.error {
        None => debug!(
            project_id = %listing.project_id,
            instances = listing.records.len(),
            "Listed instances"
        ),
        Some(e) => {
            let detail = format!("{:#}", e);
            warn!(
                project_id = %listing.project_id,
                error = %detail,
                "Failed to list instances for project {}",
                listing.project_id
            );
        }
    }

    progress.advance(&listing.project_id);
    listing
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: ResultSet,
    pub processed: usize,
    pub failed_projects: Vec<String>,
}

/// Discovers projects, authenticates, then collects every project's instances.
///
/// Project discovery runs before credentials are fetched, so a broken
/// `gcloud projects list` is reported even when credentials are missing too.
pub async fn run_inventory(
    source: &dyn ProjectSource,
    credentials: &dyn CredentialProvider,
    config: &RunConfig,
    progress: Arc<dyn Progress>,
) -> Result<RunSummary> {
    let project_ids = discover_projects(source, config.limit).await?;
    let client = connect(credentials, &config.endpoint, config.page_size).await?;
    let app = App::from_config(Arc::new(client), progress, config);
    Ok(app.collect(&project_ids).await)
}

pub struct App {
    client: Arc<dyn GcpClientTrait>,
    progress: Arc<dyn Progress>,
    concurrency: usize,
    pause: Duration,
}

impl App {
    pub fn new(client: Arc<dyn GcpClientTrait>, progress: Arc<dyn Progress>) -> Self {
        Self {
            client,
            progress,
            concurrency: 1,
            pause: Duration::ZERO,
        }
    }

    pub fn from_config(
        client: Arc<dyn GcpClientTrait>,
        progress: Arc<dyn Progress>,
        config: &RunConfig,
    ) -> Self {
        Self::new(client, progress)
            .with_concurrency(config.concurrency)
            .with_pause(config.pause)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub async fn collect(&self, project_ids: &[String]) -> RunSummary {
        self.progress.start(project_ids.len() as u64);

        let listings = if self.concurrency > 1 && project_ids.len() > 1 {
            self.collect_concurrent(project_ids).await
        } else {
            self.collect_sequential(project_ids).await
        };

        self.progress.finish();

        let mut failed_projects = Vec::new();
        let mut slots = Vec::with_capacity(listings.len());
        for listing in listings {
            if !listing.is_success() {
                failed_projects.push(listing.project_id);
            }
            slots.push(listing.records);
        }

        let results = ResultSet::from_slots(slots);
        info!(
            projects = project_ids.len(),
            failed = failed_projects.len(),
            instances = results.len(),
            "Finished collecting instances"
        );

        RunSummary {
            results,
            processed: project_ids.len(),
            failed_projects,
        }
    }

    async fn collect_sequential(&self, project_ids: &[String]) -> Vec<ProjectListing> {
        let mut listings = Vec::with_capacity(project_ids.len());
        for project_id in project_ids {
            let listing = process_project(
                self.client.as_ref(),
                self.progress.as_ref(),
                project_id,
                self.pause,
            )
            .await;
            listings.push(listing);
        }
        listings
    }

    /// One task per project, at most `concurrency` running at once. Each
    /// result lands in the slot of its project's original position; a slot
    /// left empty by a worker that panicked becomes a failed listing.
    async fn collect_concurrent(&self, project_ids: &[String]) -> Vec<ProjectListing> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.min(Semaphore::MAX_PERMITS)));
        let mut tasks = JoinSet::new();

        for (index, project_id) in project_ids.iter().cloned().enumerate() {
            let client = Arc::clone(&self.client);
            let progress = Arc::clone(&self.progress);
            let semaphore = Arc::clone(&semaphore);
            let pause = self.pause;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let listing =
                    process_project(client.as_ref(), progress.as_ref(), &project_id, pause).await;
                (index, listing)
            });
        }

        let mut slots: Vec<Option<ProjectListing>> = project_ids.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, listing)) => slots[index] = Some(listing),
                Err(e) => debug!(error = %e, "Project worker did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(project_ids)
            .map(|(slot, project_id)| {
                slot.unwrap_or_else(|| {
                    warn!(
                        project_id = %project_id,
                        error = "worker task did not complete",
                        "Failed to list instances for project {}",
                        project_id
                    );
                    self.progress.advance(project_id);
                    ProjectListing {
                        project_id: project_id.clone(),
                        records: Vec::new(),
                        error: Some(anyhow!("worker task did not complete")),
                    }
                })
            })
            .collect()
    }
}
