//! # slate
//!
//! Blocking client for the SLATE application deployment API.
//!
//! The client covers the three calls GitOps automation needs:
//! - creating an instance of an application on a cluster
//! - updating an instance's configuration
//! - looking an instance up by cluster and application name
//!
//! ## Example
//!
//! ```no_run
//! use slate::Client;
//!
//! let client = Client::new("https://api.slateci.io:18080/v1alpha3", "my-token");
//! let response = client.create("mwt2", "atlas", "osg-frontier-squid", "replicas: 1\n")?;
//! if let Some(id) = response.id.assigned() {
//!     println!("created {id}");
//! }
//! # Ok::<(), slate::Error>(())
//! ```
//!
//! ## Testing
//!
//! Build the client around a [`MockBackend`] and a [`RecordingSleeper`] to
//! exercise polling without network access or real delays.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::{Backend, Call, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use retry::{
    DEFAULT_BACKOFF_SECS, PROVISIONING_ATTEMPTS, RecordingSleeper, RetryPolicy, Sleeper,
    ThreadSleeper,
};
pub use types::{
    API_VERSION, CreateInstanceRequest, CreateResponse, DEFAULT_API_BASE, InstanceItem,
    InstanceList, ListInstancesRequest, ProvisionedId, STATUS_OK, UpdateInstanceRequest,
};

use backend::http::HttpBackend;

/// High-level client for deployment API operations.
pub struct Client {
    backend: Box<dyn Backend>,
    sleeper: Box<dyn Sleeper>,
    lookup_policy: RetryPolicy,
}

impl Client {
    /// Create a client talking HTTP to `api_base` with `token`.
    #[must_use]
    pub fn new(api_base: &str, token: &str) -> Self {
        Self::with_backend(Box::new(HttpBackend::with_api_base(api_base, token)))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            sleeper: Box::new(ThreadSleeper),
            lookup_policy: RetryPolicy::default(),
        }
    }

    /// Replace the source of delays.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the policy used by [`Client::lookup`].
    #[must_use]
    pub fn with_lookup_policy(mut self, policy: RetryPolicy) -> Self {
        self.lookup_policy = policy;
        self
    }

    /// Policy used by [`Client::lookup`].
    #[must_use]
    pub fn lookup_policy(&self) -> &RetryPolicy {
        &self.lookup_policy
    }

    /// Create an instance of `app` on `cluster` for `group`.
    ///
    /// Returns the status and whatever ID the API reported; callers decide
    /// what a non-200 status means.
    pub fn create(
        &self,
        cluster: &str,
        group: &str,
        app: &str,
        configuration: &str,
    ) -> Result<CreateResponse> {
        let request = CreateInstanceRequest::new(cluster, group, configuration);
        self.backend.create_instance(app, &request)
    }

    /// Replace the configuration of instance `id`. Returns the HTTP status.
    pub fn update(&self, id: &str, configuration: &str) -> Result<u16> {
        let request = UpdateInstanceRequest::new(configuration);
        self.backend.update_instance(id, &request)
    }

    /// Find the ID of `app` on `cluster` using the client's lookup policy.
    pub fn lookup(&self, cluster: &str, app: &str) -> Result<Option<String>> {
        self.lookup_with(cluster, app, &self.lookup_policy)
    }

    /// Find the ID of `app` on `cluster`, polling according to `policy`.
    ///
    /// Non-200 listings and transport failures count as a miss for that
    /// attempt. Returns `Ok(None)` once every attempt has missed.
    pub fn lookup_with(&self, cluster: &str, app: &str, policy: &RetryPolicy) -> Result<Option<String>> {
        log::debug!(
            "Looking up instance of {app} on {cluster} ({} attempts)",
            policy.attempts()
        );
        let request = ListInstancesRequest::new(cluster);

        retry::poll(policy, self.sleeper.as_ref(), |attempt| {
            let list = self.backend.list_instances(&request)?;
            if list.status != STATUS_OK {
                log::error!(
                    "Instance listing on {cluster} returned HTTP {} (attempt {attempt})",
                    list.status
                );
                return Ok(None);
            }
            let found = list.find_app(app).map(str::to_string);
            if found.is_none() {
                log::error!("Didn't get an instance id for {app} from the SLATE response");
            }
            Ok(found)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(mock: &MockBackend, sleeper: &RecordingSleeper) -> Client {
        Client::with_backend(Box::new(mock.clone())).with_sleeper(Box::new(sleeper.clone()))
    }

    #[test]
    fn test_create_forwards_request() {
        let mock = MockBackend::new();
        mock.push_create_json(200, r#"{"metadata":{"id":"xyz"}}"#);
        let client = client(&mock, &RecordingSleeper::new());

        let response = client.create("c1", "g1", "a1", "key: value\n").unwrap();
        assert_eq!(response.id.assigned(), Some("xyz"));

        assert_eq!(
            mock.calls(),
            vec![Call::Create {
                app: "a1".to_string(),
                request: CreateInstanceRequest::new("c1", "g1", "key: value\n"),
            }]
        );
    }

    #[test]
    fn test_update_surfaces_status() {
        let mock = MockBackend::new();
        mock.push_update(500);
        let client = client(&mock, &RecordingSleeper::new());
        assert_eq!(client.update("xyz", "a: b").unwrap(), 500);
    }

    #[test]
    fn test_lookup_default_policy_single_attempt() {
        let mock = MockBackend::new();
        let sleeper = RecordingSleeper::new();
        let client = client(&mock, &sleeper);

        assert_eq!(client.lookup("c1", "a1").unwrap(), None);
        assert_eq!(mock.count(|c| matches!(c, Call::List { .. })), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn test_lookup_skips_error_status_and_blank_ids() {
        let mock = MockBackend::new();
        mock.push_list(InstanceList {
            status: 500,
            items: Vec::new(),
        });
        mock.push_list(InstanceList {
            status: 200,
            items: vec![InstanceItem::new("a1", ""), InstanceItem::new("other", "x")],
        });
        mock.push_list(InstanceList {
            status: 200,
            items: vec![InstanceItem::new("a1", "instance_found")],
        });
        let sleeper = RecordingSleeper::new();
        let client = client(&mock, &sleeper)
            .with_lookup_policy(RetryPolicy::new(3, Duration::from_secs(30)));

        assert_eq!(
            client.lookup("c1", "a1").unwrap(),
            Some("instance_found".to_string())
        );
        assert_eq!(mock.count(|c| matches!(c, Call::List { .. })), 3);
        assert_eq!(sleeper.total(), Duration::from_secs(60));
    }

    #[test]
    fn test_lookup_with_bounded_attempts() {
        let mock = MockBackend::new();
        let sleeper = RecordingSleeper::new();
        let client = client(&mock, &sleeper);

        let found = client
            .lookup_with("c1", "a1", &RetryPolicy::provisioning())
            .unwrap();
        assert_eq!(found, None);
        assert_eq!(mock.count(|c| matches!(c, Call::List { .. })), 3);
        assert_eq!(sleeper.slept().len(), 3);
    }
}
