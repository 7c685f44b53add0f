use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    codec::ListEnvelope,
    domain::{EmployeeId, WorksiteId},
    protocol::{Employee, EmployeeDraft, EmployeeStats, Hospital, Worksite, WorksiteDraft},
};
use tracing::{debug, warn};
use url::Url;

use crate::error::{PortalError, PortalResult};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_HOSPITALS_PATH: &str = "benefits/hospitals/";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Relative to `base_url`; later backends serve `hospitals/`.
    pub hospitals_path: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            hospitals_path: DEFAULT_HOSPITALS_PATH.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

/// REST surface of the PortalSync backend.
///
/// Implementations do not retry, cache, or deduplicate: every call is one
/// request, and any transport failure or non-2xx response is one error.
#[async_trait]
pub trait PortalGateway: Send + Sync {
    async fn list_employees(&self) -> PortalResult<Vec<Employee>>;
    async fn employees_by_worksite(&self, worksite_id: &WorksiteId) -> PortalResult<Vec<Employee>>;
    async fn get_employee(&self, id: &EmployeeId) -> PortalResult<Employee>;
    async fn create_employee(&self, draft: &EmployeeDraft) -> PortalResult<Employee>;
    async fn update_employee(&self, id: &EmployeeId, draft: &EmployeeDraft)
        -> PortalResult<Employee>;
    async fn delete_employee(&self, id: &EmployeeId) -> PortalResult<()>;
    async fn employee_stats(&self) -> PortalResult<EmployeeStats>;

    async fn list_worksites(&self) -> PortalResult<Vec<Worksite>>;
    async fn get_worksite(&self, id: &WorksiteId) -> PortalResult<Worksite>;
    async fn create_worksite(&self, draft: &WorksiteDraft) -> PortalResult<Worksite>;
    async fn update_worksite(&self, id: &WorksiteId, draft: &WorksiteDraft)
        -> PortalResult<Worksite>;
    async fn delete_worksite(&self, id: &WorksiteId) -> PortalResult<()>;

    async fn list_hospitals(&self) -> PortalResult<Vec<Hospital>>;
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
    hospitals_path: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> PortalResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| PortalError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url: parse_base_url(&config.base_url)?,
            hospitals_path: config.hospitals_path.trim_start_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> PortalResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| PortalError::Config(format!("invalid endpoint '{path}': {err}")))?;
        debug!(%method, %url, "gateway request");
        Ok(self.http.request(method, url))
    }

    async fn execute(&self, operation: &str, request: RequestBuilder) -> PortalResult<Vec<u8>> {
        let response = request.send().await.map_err(|err| {
            warn!("gateway: {operation} transport failure: {err}");
            PortalError::network(operation, err)
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| PortalError::network(operation, err))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).trim().to_string();
            warn!("gateway: {operation} rejected status={status} body={message}");
            return Err(PortalError::NetworkFailed {
                operation: operation.to_string(),
                status: Some(status.as_u16()),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> PortalResult<T> {
        let body = self.execute(operation, request).await?;
        serde_json::from_slice(&body).map_err(|err| PortalError::Decode {
            operation: operation.to_string(),
            message: err.to_string(),
        })
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> PortalResult<Vec<T>> {
        self.fetch::<ListEnvelope<T>>(operation, request)
            .await
            .map(ListEnvelope::into_vec)
    }

    async fn write<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: &B,
    ) -> PortalResult<T> {
        let request = self.request(method, path)?.json(body);
        self.fetch(operation, request).await
    }
}

fn parse_base_url(raw: &str) -> PortalResult<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PortalError::Config("backend base URL is empty".into()));
    }
    // `Url::join` replaces the last segment unless the base ends with a slash.
    Url::parse(&format!("{trimmed}/"))
        .map_err(|err| PortalError::Config(format!("invalid backend base URL '{raw}': {err}")))
}

#[async_trait]
impl PortalGateway for HttpGateway {
    async fn list_employees(&self) -> PortalResult<Vec<Employee>> {
        let request = self.request(Method::GET, "employees/")?;
        self.fetch_list("list employees", request).await
    }

    async fn employees_by_worksite(&self, worksite_id: &WorksiteId) -> PortalResult<Vec<Employee>> {
        let request = self
            .request(Method::GET, "employees/by_worksite/")?
            .query(&[("worksite_id", worksite_id.as_str())]);
        self.fetch_list("list employees by worksite", request).await
    }

    async fn get_employee(&self, id: &EmployeeId) -> PortalResult<Employee> {
        let request = self.request(Method::GET, &format!("employees/{id}/"))?;
        self.fetch("fetch employee", request).await
    }

    async fn create_employee(&self, draft: &EmployeeDraft) -> PortalResult<Employee> {
        self.write("create employee", Method::POST, "employees/", draft)
            .await
    }

    async fn update_employee(
        &self,
        id: &EmployeeId,
        draft: &EmployeeDraft,
    ) -> PortalResult<Employee> {
        self.write(
            "update employee",
            Method::PUT,
            &format!("employees/{id}/"),
            draft,
        )
        .await
    }

    async fn delete_employee(&self, id: &EmployeeId) -> PortalResult<()> {
        let request = self.request(Method::DELETE, &format!("employees/{id}/"))?;
        self.execute("delete employee", request).await.map(|_| ())
    }

    async fn employee_stats(&self) -> PortalResult<EmployeeStats> {
        let request = self.request(Method::GET, "employees/stats/")?;
        self.fetch("fetch employee stats", request).await
    }

    async fn list_worksites(&self) -> PortalResult<Vec<Worksite>> {
        let request = self.request(Method::GET, "worksites/")?;
        self.fetch_list("list worksites", request).await
    }

    async fn get_worksite(&self, id: &WorksiteId) -> PortalResult<Worksite> {
        let request = self.request(Method::GET, &format!("worksites/{id}/"))?;
        self.fetch("fetch worksite", request).await
    }

    async fn create_worksite(&self, draft: &WorksiteDraft) -> PortalResult<Worksite> {
        self.write("create worksite", Method::POST, "worksites/", draft)
            .await
    }

    async fn update_worksite(
        &self,
        id: &WorksiteId,
        draft: &WorksiteDraft,
    ) -> PortalResult<Worksite> {
        self.write(
            "update worksite",
            Method::PUT,
            &format!("worksites/{id}/"),
            draft,
        )
        .await
    }

    async fn delete_worksite(&self, id: &WorksiteId) -> PortalResult<()> {
        let request = self.request(Method::DELETE, &format!("worksites/{id}/"))?;
        self.execute("delete worksite", request).await.map(|_| ())
    }

    async fn list_hospitals(&self) -> PortalResult<Vec<Hospital>> {
        let request = self.request(Method::GET, &self.hospitals_path)?;
        self.fetch_list("list hospitals", request).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
