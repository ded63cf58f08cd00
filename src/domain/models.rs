use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    #[default]
    Active,
    Inactive,
}

impl StationStatus {
    pub const ALL: [StationStatus; 2] = [StationStatus::Active, StationStatus::Inactive];

    pub fn as_str(self) -> &'static str {
        match self {
            StationStatus::Active => "active",
            StationStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for StationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "station status",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connector standards a station can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorType {
    #[serde(rename = "Type 1")]
    Type1,
    #[serde(rename = "Type 2")]
    Type2,
    #[serde(rename = "CCS")]
    Ccs,
    #[serde(rename = "CHAdeMO")]
    Chademo,
    #[serde(rename = "Tesla")]
    Tesla,
}

impl ConnectorType {
    pub const ALL: [ConnectorType; 5] = [
        ConnectorType::Type1,
        ConnectorType::Type2,
        ConnectorType::Ccs,
        ConnectorType::Chademo,
        ConnectorType::Tesla,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorType::Type1 => "Type 1",
            ConnectorType::Type2 => "Type 2",
            ConnectorType::Ccs => "CCS",
            ConnectorType::Chademo => "CHAdeMO",
            ConnectorType::Tesla => "Tesla",
        }
    }
}

impl FromStr for ConnectorType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|connector| connector.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "connector type",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A longitude/latitude pair. On the wire it is a GeoJSON `Point`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "GeoJsonPoint", try_from = "GeoJsonPoint")]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type", default = "point_kind")]
    kind: String,
    coordinates: [f64; 2],
}

fn point_kind() -> String {
    "Point".to_string()
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: point_kind(),
            coordinates: [point.longitude, point.latitude],
        }
    }
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = UnknownVariant;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(UnknownVariant {
                kind: "geometry type",
                value: value.kind,
            });
        }
        let [longitude, latitude] = value.coordinates;
        Ok(Self {
            longitude,
            latitude,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub status: StationStatus,
    pub power_output: f64,
    pub connector_type: ConnectorType,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Station {
    /// Shallow merge: every supplied field replaces the stored one wholesale.
    pub fn apply(&mut self, patch: StationPatch, updated_at: String) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(power_output) = patch.power_output {
            self.power_output = power_output;
        }
        if let Some(connector_type) = patch.connector_type {
            self.connector_type = connector_type;
        }
        self.updated_at = updated_at;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStation {
    pub name: String,
    pub location: GeoPoint,
    pub status: StationStatus,
    pub power_output: f64,
    pub connector_type: ConnectorType,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationPatch {
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub status: Option<StationStatus>,
    pub power_output: Option<f64>,
    pub connector_type: Option<ConnectorType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationWithCreator {
    pub station: Station,
    pub creator: Option<CreatorSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::{ConnectorType, GeoPoint, Station, StationPatch, StationStatus};

    fn sample_station() -> Station {
        Station {
            id: "station-1".to_string(),
            name: "Station A".to_string(),
            location: GeoPoint::new(12.5, 55.6),
            status: StationStatus::Active,
            power_output: 50.0,
            connector_type: ConnectorType::Ccs,
            created_by: "user-1".to_string(),
            created_at: "2026-02-20T10:00:00.000Z".to_string(),
            updated_at: "2026-02-20T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn serializes_location_as_geojson_point() {
        let json = serde_json::to_value(GeoPoint::new(12.5, 55.6)).expect("point should serialize");
        assert_eq!(
            json,
            serde_json::json!({ "type": "Point", "coordinates": [12.5, 55.6] })
        );
    }

    #[test]
    fn rejects_non_point_geometry() {
        let result = serde_json::from_value::<GeoPoint>(
            serde_json::json!({ "type": "LineString", "coordinates": [1.0, 2.0] }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn connector_type_uses_display_names_on_the_wire() {
        let json = serde_json::to_value(ConnectorType::Type2).expect("connector should serialize");
        assert_eq!(json, "Type 2");
        assert_eq!("CHAdeMO".parse::<ConnectorType>(), Ok(ConnectorType::Chademo));
        assert!("Schuko".parse::<ConnectorType>().is_err());
    }

    #[test]
    fn apply_overwrites_only_supplied_fields() {
        let mut station = sample_station();
        station.apply(
            StationPatch {
                power_output: Some(150.0),
                status: Some(StationStatus::Inactive),
                ..StationPatch::default()
            },
            "2026-02-21T10:00:00.000Z".to_string(),
        );

        assert_eq!(station.name, "Station A");
        assert_eq!(station.power_output, 150.0);
        assert_eq!(station.status, StationStatus::Inactive);
        assert_eq!(station.created_by, "user-1");
        assert_eq!(station.updated_at, "2026-02-21T10:00:00.000Z");
    }
}
