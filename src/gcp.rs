use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::types::InstancesPage;

pub const DEFAULT_ENDPOINT: &str = "https://sqladmin.googleapis.com";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Cloud SQL Admin API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait GcpClientTrait: Send + Sync {
    /// Fetches one page of Cloud SQL instances for `project_id`.
    async fn list_instances_page(
        &self,
        project_id: &str,
        page_token: Option<String>,
    ) -> Result<InstancesPage>;
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Resolves a bearer token from the environment or the gcloud CLI.
pub struct GcloudCredentials;

#[async_trait]
impl CredentialProvider for GcloudCredentials {
    async fn access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                return Ok(token);
            }
        }

        let output = AsyncCommand::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .context("Failed to run gcloud to obtain credentials")?;

        if !output.status.success() {
            return Err(anyhow!(
                "Failed to get access token: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let token = String::from_utf8(output.stdout)?.trim().to_string();
        if token.is_empty() {
            return Err(anyhow!("gcloud returned an empty access token"));
        }
        Ok(token)
    }
}

pub struct GcpClient {
    client: Client,
    token: String,
    endpoint: String,
    page_size: Option<u32>,
}

impl GcpClient {
    pub fn new(token: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcp-sql-versions/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create Cloud SQL Admin client")?;

        Ok(Self {
            client,
            token,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: None,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    fn instances_url(&self, project_id: &str) -> String {
        format!(
            "{}/sql/v1beta4/projects/{}/instances",
            self.endpoint, project_id
        )
    }
}

/// Authenticates once and builds the API client used for the whole run.
pub async fn connect(
    credentials: &dyn CredentialProvider,
    endpoint: &str,
    page_size: Option<u32>,
) -> Result<GcpClient> {
    let token = credentials
        .access_token()
        .await
        .context("Failed to find default credentials")?;

    Ok(GcpClient::new(token)?
        .with_endpoint(endpoint)
        .with_page_size(page_size))
}

#[async_trait]
impl GcpClientTrait for GcpClient {
    async fn list_instances_page(
        &self,
        project_id: &str,
        page_token: Option<String>,
    ) -> Result<InstancesPage> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        if let Some(size) = self.page_size {
            query.push(("maxResults", size.to_string()));
        }

        let response = self
            .client
            .get(self.instances_url(project_id))
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body }.into());
        }

        let page: InstancesPage = response.json().await?;
        debug!(
            project_id,
            items = page.items.len(),
            more = page.continuation().is_some(),
            "Fetched instances page"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_url_strips_trailing_slash() {
        let client = GcpClient::new("token".to_string())
            .unwrap()
            .with_endpoint("http://localhost:8080/");
        assert_eq!(
            client.instances_url("my-project"),
            "http://localhost:8080/sql/v1beta4/projects/my-project/instances"
        );
    }

    #[tokio::test]
    async fn test_connect_uses_provider_token() {
        let mut credentials = MockCredentialProvider::new();
        credentials
            .expect_access_token()
            .times(1)
            .returning(|| Ok("ya29.token".to_string()));

        let client = connect(&credentials, "http://localhost:9000", Some(10))
            .await
            .unwrap();
        assert_eq!(client.token, "ya29.token");
        assert_eq!(client.page_size, Some(10));
        assert_eq!(client.endpoint, "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_connect_fails_without_credentials() {
        let mut credentials = MockCredentialProvider::new();
        credentials
            .expect_access_token()
            .times(1)
            .returning(|| Err(anyhow!("not logged in")));

        let err = connect(&credentials, DEFAULT_ENDPOINT, None)
            .await
            .err()
            .expect("connect should fail");
        assert!(err.to_string().contains("Failed to find default credentials"));
        assert!(format!("{:#}", err).contains("not logged in"));
    }

    #[test]
    fn test_default_endpoint() {
        let client = GcpClient::new("token".to_string()).unwrap();
        assert!(client
            .instances_url("p")
            .starts_with("https://sqladmin.googleapis.com/"));
    }
}
