//! Request and response models for the deployment API.

use serde::{Deserialize, Deserializer, Serialize};

/// API version sent in every request body.
pub const API_VERSION: &str = "v1alpha3";

/// Default API base URL.
///
/// Port 18080 talks to the API server directly; the 443 proxy in front of it
/// tends to time out from CI runners.
pub const DEFAULT_API_BASE: &str = "https://api.slateci.io:18080/v1alpha3";

/// HTTP status the API returns on success.
pub const STATUS_OK: u16 = 200;

/// Instance ID as reported by a create response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionedId {
    /// The response carried a usable ID.
    Assigned(String),
    /// `metadata.id` was present but blank.
    Blank,
    /// `metadata` or `metadata.id` was missing.
    Absent,
}

impl ProvisionedId {
    /// The assigned ID, if any.
    #[must_use]
    pub fn assigned(&self) -> Option<&str> {
        match self {
            Self::Assigned(id) => Some(id),
            Self::Blank | Self::Absent => None,
        }
    }
}

/// Outcome of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResponse {
    /// HTTP status code.
    pub status: u16,
    /// Instance ID extracted from `metadata.id`.
    pub id: ProvisionedId,
    /// Raw response body, kept for diagnostics.
    pub body: String,
}

impl CreateResponse {
    /// Build a response from a status code and raw body.
    ///
    /// Non-200 bodies are not decoded. A 200 body must be JSON.
    pub fn from_body(status: u16, body: String) -> crate::Result<Self> {
        let id = if status == STATUS_OK {
            let decoded: CreateInstanceBody = serde_json::from_str(&body)?;
            decoded.provisioned_id()
        } else {
            ProvisionedId::Absent
        };
        Ok(Self { status, id, body })
    }

    /// Whether the API accepted the request.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Outcome of a list-instances call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceList {
    /// HTTP status code.
    pub status: u16,
    /// Instances reported by the API (empty on non-200).
    pub items: Vec<InstanceItem>,
}

impl InstanceList {
    /// Build a list from a status code and raw body.
    pub fn from_body(status: u16, body: &str) -> crate::Result<Self> {
        if status != STATUS_OK {
            return Ok(Self {
                status,
                items: Vec::new(),
            });
        }
        let decoded: InstanceListBody = serde_json::from_str(body)?;
        Ok(Self {
            status,
            items: decoded.items,
        })
    }

    /// First non-blank ID whose application matches `app`.
    #[must_use]
    pub fn find_app(&self, app: &str) -> Option<&str> {
        self.items
            .iter()
            .filter(|item| item.metadata.application == app)
            .map(|item| item.metadata.id.as_str())
            .find(|id| !id.trim().is_empty())
    }
}

/// One entry of an instance list.
///
/// Missing or null fields decode as blank so one odd entry cannot spoil the
/// whole listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstanceItem {
    /// Instance metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: InstanceMetadata,
}

/// Metadata of a listed instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstanceMetadata {
    /// Application name the instance runs.
    #[serde(default, deserialize_with = "null_as_default")]
    pub application: String,
    /// Instance ID.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl InstanceItem {
    /// Convenience constructor.
    pub fn new(application: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            metadata: InstanceMetadata {
                application: application.into(),
                id: id.into(),
            },
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Body of `POST /apps/{app}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    /// API version.
    pub api_version: String,
    /// Owning group.
    pub group: String,
    /// Target cluster.
    pub cluster: String,
    /// Contents of `values.yaml`, forwarded verbatim.
    pub configuration: String,
}

impl CreateInstanceRequest {
    /// Build a create request for the current API version.
    pub fn new(cluster: &str, group: &str, configuration: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            group: group.to_string(),
            cluster: cluster.to_string(),
            configuration: configuration.to_string(),
        }
    }
}

/// Body of `PUT /instances/{id}/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstanceRequest {
    /// API version.
    pub api_version: String,
    /// Contents of `values.yaml`, forwarded verbatim.
    pub configuration: String,
}

impl UpdateInstanceRequest {
    /// Build an update request for the current API version.
    pub fn new(configuration: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            configuration: configuration.to_string(),
        }
    }
}

/// Body of `POST /instances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesRequest {
    /// API version.
    pub api_version: String,
    /// Cluster to list instances for.
    pub cluster: String,
}

impl ListInstancesRequest {
    /// Build a list request for the current API version.
    pub fn new(cluster: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            cluster: cluster.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreateInstanceBody {
    metadata: Option<CreateMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CreateMetadata {
    id: Option<String>,
}

impl CreateInstanceBody {
    fn provisioned_id(self) -> ProvisionedId {
        match self.metadata.and_then(|m| m.id) {
            None => ProvisionedId::Absent,
            Some(id) if id.trim().is_empty() => ProvisionedId::Blank,
            Some(id) => ProvisionedId::Assigned(id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InstanceListBody {
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<InstanceItem>,
}
