use serde::{Deserialize, Serialize};

use crate::domain::models::{
    ConnectorType, CreatorSummary, GeoPoint, Role, StationStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// `createdBy` is the bare creator id on create/update responses and the
/// joined creator on list/nearby responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedBy {
    User(CreatorSummary),
    Id(String),
}

impl CreatedBy {
    pub fn id(&self) -> &str {
        match self {
            CreatedBy::User(creator) => &creator.id,
            CreatedBy::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub status: StationStatus,
    pub power_output: f64,
    pub connector_type: ConnectorType,
    #[serde(default)]
    pub created_by: Option<CreatedBy>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body for create and update. Unset fields are left out of the request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_output: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<ConnectorType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyParams {
    pub longitude: f64,
    pub latitude: f64,
    pub max_distance: Option<u32>,
}
