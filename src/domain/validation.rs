use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::models::{
    ConnectorType, GeoPoint, NewStation, NewUser, StationPatch, StationStatus,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Create,
    Update,
}

pub fn validate_new_station(body: &Value) -> Result<NewStation, Vec<FieldError>> {
    let fields = as_object(body)?;
    let mut errors = Vec::new();

    let name = check_name(fields.get("name"), Mode::Create, &mut errors);
    let location = check_location(fields.get("location"), Mode::Create, &mut errors);
    let status = check_status(fields.get("status"), &mut errors);
    let power_output = check_power_output(fields.get("powerOutput"), Mode::Create, &mut errors);
    let connector_type =
        check_connector_type(fields.get("connectorType"), Mode::Create, &mut errors);

    match (name, location, power_output, connector_type) {
        (Some(name), Some(location), Some(power_output), Some(connector_type))
            if errors.is_empty() =>
        {
            Ok(NewStation {
                name,
                location,
                status: status.unwrap_or_default(),
                power_output,
                connector_type,
            })
        }
        _ => Err(errors),
    }
}

/// Only fields present in the body are checked. Unknown keys, including
/// `createdBy`, `id` and timestamps, are ignored.
pub fn validate_station_patch(body: &Value) -> Result<StationPatch, Vec<FieldError>> {
    let fields = as_object(body)?;
    let mut errors = Vec::new();

    let patch = StationPatch {
        name: check_name(fields.get("name"), Mode::Update, &mut errors),
        location: check_location(fields.get("location"), Mode::Update, &mut errors),
        status: check_status(fields.get("status"), &mut errors),
        power_output: check_power_output(fields.get("powerOutput"), Mode::Update, &mut errors),
        connector_type: check_connector_type(
            fields.get("connectorType"),
            Mode::Update,
            &mut errors,
        ),
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

pub fn validate_new_user(body: &Value) -> Result<NewUser, Vec<FieldError>> {
    let fields = as_object(body)?;
    let mut errors = Vec::new();

    let name = non_empty_str(fields.get("name"));
    if name.is_none() {
        errors.push(FieldError::new("name", "Name is required"));
    }

    let email = non_empty_str(fields.get("email")).filter(|email| email.contains('@'));
    if email.is_none() {
        errors.push(FieldError::new("email", "Please include a valid email"));
    }

    let password = fields
        .get("password")
        .and_then(Value::as_str)
        .filter(|password| password.chars().count() >= MIN_PASSWORD_LEN);
    if password.is_none() {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }

    match (name, email, password) {
        (Some(name), Some(email), Some(password)) => Ok(NewUser {
            name,
            email: email.to_lowercase(),
            password: password.to_string(),
        }),
        _ => Err(errors),
    }
}

pub fn validate_credentials(body: &Value) -> Result<(String, String), Vec<FieldError>> {
    let fields = as_object(body)?;
    let mut errors = Vec::new();

    let email = non_empty_str(fields.get("email"));
    if email.is_none() {
        errors.push(FieldError::new("email", "Email is required"));
    }
    let password = fields.get("password").and_then(Value::as_str);
    if password.is_none_or(str::is_empty) {
        errors.push(FieldError::new("password", "Password is required"));
    }

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => {
            Ok((email.to_lowercase(), password.to_string()))
        }
        _ => Err(errors),
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    body.as_object()
        .ok_or_else(|| vec![FieldError::new("body", "Request body must be a JSON object")])
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn check_name(value: Option<&Value>, mode: Mode, errors: &mut Vec<FieldError>) -> Option<String> {
    if mode == Mode::Update && value.is_none() {
        return None;
    }

    let name = non_empty_str(value);
    if name.is_none() {
        let message = match mode {
            Mode::Create => "Name is required",
            Mode::Update => "Name cannot be empty",
        };
        errors.push(FieldError::new("name", message));
    }
    name
}

fn check_location(
    value: Option<&Value>,
    mode: Mode,
    errors: &mut Vec<FieldError>,
) -> Option<GeoPoint> {
    if mode == Mode::Update && value.is_none() {
        return None;
    }

    let location = value.and_then(Value::as_object);

    if let Some(kind) = location.and_then(|location| location.get("type"))
        && kind.as_str() != Some("Point")
    {
        errors.push(FieldError::new("location.type", "Location type must be Point"));
    }

    let Some(coordinates) = location
        .and_then(|location| location.get("coordinates"))
        .and_then(Value::as_array)
    else {
        errors.push(FieldError::new(
            "location.coordinates",
            "Location coordinates must be an array",
        ));
        return None;
    };

    if coordinates.len() != 2 {
        errors.push(FieldError::new(
            "location.coordinates",
            "Location must have latitude and longitude",
        ));
        return None;
    }

    let (Some(longitude), Some(latitude)) = (coordinates[0].as_f64(), coordinates[1].as_f64())
    else {
        errors.push(FieldError::new(
            "location.coordinates",
            "Location coordinates must be numbers",
        ));
        return None;
    };

    if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
        errors.push(FieldError::new(
            "location.coordinates",
            "Location coordinates are out of range",
        ));
        return None;
    }

    Some(GeoPoint::new(longitude, latitude))
}

fn check_status(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<StationStatus> {
    let value = value?;
    let status = value
        .as_str()
        .and_then(|raw| raw.parse::<StationStatus>().ok());
    if status.is_none() {
        errors.push(FieldError::new("status", "Invalid status"));
    }
    status
}

fn check_power_output(
    value: Option<&Value>,
    mode: Mode,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    if mode == Mode::Update && value.is_none() {
        return None;
    }

    // Numeric strings are accepted alongside JSON numbers.
    let number = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    };

    match number {
        None => {
            errors.push(FieldError::new("powerOutput", "Power output must be a number"));
            None
        }
        Some(power) if power < 0.0 => {
            errors.push(FieldError::new(
                "powerOutput",
                "Power output must not be negative",
            ));
            None
        }
        Some(power) => Some(power),
    }
}

fn check_connector_type(
    value: Option<&Value>,
    mode: Mode,
    errors: &mut Vec<FieldError>,
) -> Option<ConnectorType> {
    if mode == Mode::Update && value.is_none() {
        return None;
    }

    let connector = value
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<ConnectorType>().ok());
    if connector.is_none() {
        errors.push(FieldError::new("connectorType", "Invalid connector type"));
    }
    connector
}
