//! HTTP backend for the SLATE deployment API.
//!
//! Every request carries the caller's token as the `token` query parameter.
//! The agent is configured to hand back 4xx/5xx responses instead of
//! turning them into errors.

use crate::backend::Backend;
use crate::error::Result;
use crate::types::{
    CreateInstanceRequest, CreateResponse, DEFAULT_API_BASE, InstanceList, ListInstancesRequest,
    UpdateInstanceRequest,
};

const USER_AGENT: &str = concat!("slate-gitops/", env!("CARGO_PKG_VERSION"));

/// Deployment API backend over HTTP.
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, including the version segment.
    api_base: String,
    /// Access token.
    token: String,
}

impl HttpBackend {
    /// Create a backend against the default API server.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, token)
    }

    /// Create a backend with a custom API base.
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn create_url(&self, app: &str) -> String {
        format!("{}/apps/{}", self.api_base, app)
    }

    fn update_url(&self, id: &str) -> String {
        format!("{}/instances/{}/update", self.api_base, id)
    }

    fn instances_url(&self) -> String {
        format!("{}/instances", self.api_base)
    }
}

impl Backend for HttpBackend {
    fn create_instance(&self, app: &str, request: &CreateInstanceRequest) -> Result<CreateResponse> {
        let url = self.create_url(app);
        log::debug!("Contacting {url}");

        let mut response = self
            .agent
            .post(&url)
            .query("token", &self.token)
            .header("User-Agent", USER_AGENT)
            .send_json(request)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("Got HTTP {status} with output {body}");

        CreateResponse::from_body(status, body)
    }

    fn update_instance(&self, id: &str, request: &UpdateInstanceRequest) -> Result<u16> {
        let url = self.update_url(id);
        log::debug!("Contacting {url}");

        let mut response = self
            .agent
            .put(&url)
            .query("token", &self.token)
            .header("User-Agent", USER_AGENT)
            .send_json(request)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("Got HTTP {status} from the server: {body}");

        Ok(status)
    }

    fn list_instances(&self, request: &ListInstancesRequest) -> Result<InstanceList> {
        let url = self.instances_url();
        log::debug!("Listing instances on {} via {url}", request.cluster);

        let mut response = self
            .agent
            .post(&url)
            .query("token", &self.token)
            .query("cluster", &request.cluster)
            .header("User-Agent", USER_AGENT)
            .send_json(request)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("Got HTTP {status} from instance listing");

        InstanceList::from_body(status, &body)
    }
}
