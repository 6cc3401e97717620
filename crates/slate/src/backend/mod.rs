//! Backend trait and implementations for the deployment API.
//!
//! Each backend method maps to exactly one HTTP exchange. Retry and polling
//! live in [`crate::Client`].
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use slate::backend::{Backend, Call, MockBackend};
//! use slate::{CreateInstanceRequest, CreateResponse, ProvisionedId};
//!
//! let mock = MockBackend::new();
//! mock.push_create(CreateResponse {
//!     status: 200,
//!     id: ProvisionedId::Assigned("instance_1".to_string()),
//!     body: String::new(),
//! });
//!
//! let request = CreateInstanceRequest::new("mwt2", "atlas", "replicas: 1");
//! let response = mock.create_instance("squid", &request).unwrap();
//! assert_eq!(response.id.assigned(), Some("instance_1"));
//! assert_eq!(mock.count(|c| matches!(c, Call::Create { .. })), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    CreateInstanceRequest, CreateResponse, InstanceList, ListInstancesRequest, ProvisionedId,
    STATUS_OK, UpdateInstanceRequest,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Backend trait for deployment API calls.
///
/// Non-2xx responses are returned as values so callers can branch on them.
/// `Err` means the exchange itself failed.
pub trait Backend: Send + Sync {
    /// `POST /apps/{app}`: create an instance of `app`.
    fn create_instance(&self, app: &str, request: &CreateInstanceRequest) -> Result<CreateResponse>;

    /// `PUT /instances/{id}/update`: replace an instance's configuration.
    ///
    /// Returns the HTTP status code.
    fn update_instance(&self, id: &str, request: &UpdateInstanceRequest) -> Result<u16>;

    /// `POST /instances`: list instances on a cluster.
    fn list_instances(&self, request: &ListInstancesRequest) -> Result<InstanceList>;
}

/// A call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Create call.
    Create {
        /// Application name.
        app: String,
        /// Request body.
        request: CreateInstanceRequest,
    },
    /// Update call.
    Update {
        /// Instance ID.
        id: String,
        /// Request body.
        request: UpdateInstanceRequest,
    },
    /// List call.
    List {
        /// Request body.
        request: ListInstancesRequest,
    },
}

type Scripted<T> = std::result::Result<T, String>;

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    creates: VecDeque<Scripted<CreateResponse>>,
    updates: VecDeque<Scripted<u16>>,
    lists: VecDeque<Scripted<InstanceList>>,
}

/// Mock backend for testing without network access.
///
/// Responses are scripted per call kind and consumed in order. When a queue
/// is empty the mock answers with success: creates get `instance-<n>`,
/// updates get 200 and lists are empty. Clones share state, so a test can
/// keep a handle after moving the mock into a [`crate::Client`].
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create response.
    pub fn push_create(&self, response: CreateResponse) {
        self.state.lock().unwrap().creates.push_back(Ok(response));
    }

    /// Queue a create response with the given status and JSON body.
    pub fn push_create_json(&self, status: u16, body: &str) {
        let response = CreateResponse::from_body(status, body.to_string())
            .expect("scripted create body must be valid JSON");
        self.push_create(response);
    }

    /// Queue a transport failure for the next create.
    pub fn fail_create(&self, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .creates
            .push_back(Err(message.into()));
    }

    /// Queue an update status.
    pub fn push_update(&self, status: u16) {
        self.state.lock().unwrap().updates.push_back(Ok(status));
    }

    /// Queue a transport failure for the next update.
    pub fn fail_update(&self, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .updates
            .push_back(Err(message.into()));
    }

    /// Queue a list response.
    pub fn push_list(&self, list: InstanceList) {
        self.state.lock().unwrap().lists.push_back(Ok(list));
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| predicate(c))
            .count()
    }
}

impl Backend for MockBackend {
    fn create_instance(&self, app: &str, request: &CreateInstanceRequest) -> Result<CreateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            app: app.to_string(),
            request: request.clone(),
        });
        let creates = state
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count();
        match state.creates.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(Error::http(message)),
            None => Ok(CreateResponse {
                status: STATUS_OK,
                id: ProvisionedId::Assigned(format!("instance-{creates}")),
                body: String::new(),
            }),
        }
    }

    fn update_instance(&self, id: &str, request: &UpdateInstanceRequest) -> Result<u16> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            id: id.to_string(),
            request: request.clone(),
        });
        match state.updates.pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(Error::http(message)),
            None => Ok(STATUS_OK),
        }
    }

    fn list_instances(&self, request: &ListInstancesRequest) -> Result<InstanceList> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List {
            request: request.clone(),
        });
        match state.lists.pop_front() {
            Some(Ok(list)) => Ok(list),
            Some(Err(message)) => Err(Error::http(message)),
            None => Ok(InstanceList {
                status: STATUS_OK,
                items: Vec::new(),
            }),
        }
    }
}
