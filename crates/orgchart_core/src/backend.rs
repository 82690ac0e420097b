use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    domain::{EmployeeId, EmployeeNode, EmployeeSummary},
    error::BackendRejection,
    protocol::{
        subtree_route, AssignmentRequest, ForestResponse, MutationResponse, RosterResponse,
        SubtreeResponse, ASSIGN_ROUTE, ROSTER_ROUTE, TREE_ROUTE, UNASSIGN_ROUTE,
    },
};
use tracing::debug;

use crate::settings::{normalize_api_url, ClientSettings};

/// The backend of record for the org chart.
#[async_trait]
pub trait OrgChartBackend: Send + Sync {
    async fn fetch_forest(&self) -> Result<Vec<EmployeeNode>>;
    async fn fetch_roster(&self) -> Result<Vec<EmployeeSummary>>;
    async fn fetch_subtree(&self, employee_id: EmployeeId) -> Result<SubtreeResponse>;
    async fn assign(&self, manager_id: EmployeeId, employee_ids: &[EmployeeId]) -> Result<()>;
    async fn unassign(&self, manager_id: EmployeeId, employee_ids: &[EmployeeId]) -> Result<()>;
}

trait Envelope {
    fn success(&self) -> bool;
    fn error(&self) -> Option<&str>;
}

macro_rules! envelope {
    ($name:ty) => {
        impl Envelope for $name {
            fn success(&self) -> bool {
                self.success
            }

            fn error(&self) -> Option<&str> {
                self.error.as_deref()
            }
        }
    };
}

envelope!(ForestResponse);
envelope!(RosterResponse);
envelope!(SubtreeResponse);
envelope!(MutationResponse);

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// JSON-over-HTTP backend. Every request carries the bearer token.
pub struct HttpBackend {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            api_url: normalize_api_url(api_url)?,
            token,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            api_url: normalize_api_url(&settings.api_url)?,
            token: settings.token.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T>(&self, route: &str) -> Result<T>
    where
        T: DeserializeOwned + Envelope,
    {
        let url = format!("{}{route}", self.api_url);
        debug!(%url, "org chart: GET");
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        read_envelope(response).await
    }

    async fn post_assignment(&self, route: &str, body: &AssignmentRequest) -> Result<()> {
        let url = format!("{}{route}", self.api_url);
        debug!(
            %url,
            manager_id = body.manager_id.0,
            employees = body.employee_ids.len(),
            "org chart: POST"
        );
        let response = self
            .authorized(self.http.post(&url).json(body))
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let _: MutationResponse = read_envelope(response).await?;
        Ok(())
    }
}

/// Non-2xx and `success: false` both become a [`BackendRejection`] that
/// keeps the server's `error` text when present.
async fn read_envelope<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned + Envelope,
{
    let status = response.status();
    if !status.is_success() {
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .error
            .or(body.message)
            .unwrap_or_else(|| status.to_string());
        return Err(BackendRejection::new(status.as_u16(), message).into());
    }

    let envelope: T = response
        .json()
        .await
        .context("malformed response body from org chart backend")?;
    if !envelope.success() {
        let message = envelope.error().unwrap_or_default().to_string();
        return Err(BackendRejection::new(status.as_u16(), message).into());
    }
    Ok(envelope)
}

#[async_trait]
impl OrgChartBackend for HttpBackend {
    async fn fetch_forest(&self) -> Result<Vec<EmployeeNode>> {
        let response: ForestResponse = self.get(TREE_ROUTE).await?;
        Ok(response.tree)
    }

    async fn fetch_roster(&self) -> Result<Vec<EmployeeSummary>> {
        let response: RosterResponse = self.get(ROSTER_ROUTE).await?;
        Ok(response.employees)
    }

    async fn fetch_subtree(&self, employee_id: EmployeeId) -> Result<SubtreeResponse> {
        self.get(&subtree_route(employee_id)).await
    }

    async fn assign(&self, manager_id: EmployeeId, employee_ids: &[EmployeeId]) -> Result<()> {
        self.post_assignment(
            ASSIGN_ROUTE,
            &AssignmentRequest {
                manager_id,
                employee_ids: employee_ids.to_vec(),
            },
        )
        .await
    }

    async fn unassign(&self, manager_id: EmployeeId, employee_ids: &[EmployeeId]) -> Result<()> {
        self.post_assignment(
            UNASSIGN_ROUTE,
            &AssignmentRequest {
                manager_id,
                employee_ids: employee_ids.to_vec(),
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
