use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, ResponseError, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::adapters::auth::AuthenticatedUser;
use crate::app::services::{
    AuthHandler, AuthSession, ServiceError, SqliteAuthService, SqliteStationService,
    StationCommandHandler, StationQueryHandler,
};
use crate::domain::geo::DEFAULT_NEARBY_DISTANCE_M;
use crate::domain::models::{
    ConnectorType, CreatorSummary, GeoPoint, Role, Station, StationStatus, StationWithCreator,
};
use crate::domain::validation::{
    FieldError, validate_credentials, validate_new_station, validate_new_user,
    validate_station_patch,
};

#[derive(Clone)]
pub struct ApiState {
    pub stations: SqliteStationService,
    pub auth: SqliteAuthService,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Not authorized")]
    Forbidden,
    #[error("Charging station not found")]
    NotFound,
    #[error("Server error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(errors) => {
                HttpResponse::build(self.status_code()).json(serde_json::json!({ "errors": errors }))
            }
            other => HttpResponse::build(other.status_code())
                .json(serde_json::json!({ "message": other.to_string() })),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound => ApiError::NotFound,
            ServiceError::Forbidden => ApiError::Forbidden,
            ServiceError::EmailTaken => ApiError::BadRequest("User already exists".to_string()),
            ServiceError::InvalidCredentials => {
                ApiError::BadRequest("Invalid credentials".to_string())
            }
            other @ (ServiceError::DbLockPoisoned
            | ServiceError::Database(_)
            | ServiceError::PasswordHash(_)) => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal
            }
        }
    }
}

/// Station document as returned to clients. `C` is either the creator id or
/// the joined creator summary.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationResponse<C> {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub status: StationStatus,
    pub power_output: f64,
    pub connector_type: ConnectorType,
    pub created_by: C,
    pub created_at: String,
    pub updated_at: String,
}

impl<C> StationResponse<C> {
    fn with_creator(station: Station, created_by: C) -> Self {
        Self {
            id: station.id,
            name: station.name,
            location: station.location,
            status: station.status,
            power_output: station.power_output,
            connector_type: station.connector_type,
            created_by,
            created_at: station.created_at,
            updated_at: station.updated_at,
        }
    }
}

impl From<Station> for StationResponse<String> {
    fn from(station: Station) -> Self {
        let created_by = station.created_by.clone();
        Self::with_creator(station, created_by)
    }
}

impl From<StationWithCreator> for StationResponse<Option<CreatorSummary>> {
    fn from(entry: StationWithCreator) -> Self {
        Self::with_creator(entry.station, entry.creator)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: UserResponse {
                id: session.user.id,
                name: session.user.name,
                email: session.user.email,
                role: session.user.role,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub max_distance: Option<String>,
}

impl NearbyQuery {
    fn parse(&self) -> Result<(GeoPoint, u32), ApiError> {
        let (Some(longitude), Some(latitude)) =
            (present(&self.longitude), present(&self.latitude))
        else {
            return Err(ApiError::BadRequest(
                "Longitude and latitude are required".to_string(),
            ));
        };

        let longitude = parse_coordinate(longitude, 180.0)?;
        let latitude = parse_coordinate(latitude, 90.0)?;

        let max_distance = match present(&self.max_distance) {
            None => DEFAULT_NEARBY_DISTANCE_M,
            Some(raw) => parse_max_distance(raw).ok_or_else(|| {
                ApiError::BadRequest("maxDistance must be a non-negative integer".to_string())
            })?,
        };

        Ok((GeoPoint::new(longitude, latitude), max_distance))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_coordinate(raw: &str, bound: f64) -> Result<f64, ApiError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && value.abs() <= bound)
        .ok_or_else(|| {
            ApiError::BadRequest("Longitude and latitude must be valid coordinates".to_string())
        })
}

/// Integer meters; a fractional value is truncated.
fn parse_max_distance(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0 && *value <= f64::from(u32::MAX))
            .map(|value| value.trunc() as u32)
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|error, _req| {
        ApiError::BadRequest(format!("Invalid JSON body: {error}")).into()
    }))
    .service(
        web::scope("/api")
            .service(health)
            .service(register_endpoint)
            .service(login_endpoint)
            .service(nearby_stations_endpoint)
            .service(list_stations_endpoint)
            .service(create_station_endpoint)
            .service(update_station_endpoint)
            .service(delete_station_endpoint),
    );
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[post("/auth/register")]
async fn register_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let new_user = validate_new_user(&body).map_err(ApiError::Validation)?;
    let session = state.auth.register(new_user)?;
    Ok(HttpResponse::Created().json(AuthResponse::from(session)))
}

#[post("/auth/login")]
async fn login_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let (email, password) = validate_credentials(&body).map_err(ApiError::Validation)?;
    let session = state.auth.login(&email, &password)?;
    Ok(HttpResponse::Ok().json(AuthResponse::from(session)))
}

#[get("/stations")]
async fn list_stations_endpoint(
    _user: AuthenticatedUser,
    state: web::Data<ApiState>,
) -> Result<HttpResponse, ApiError> {
    let stations: Vec<StationResponse<Option<CreatorSummary>>> = state
        .stations
        .list_stations()?
        .into_iter()
        .map(StationResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(stations))
}

#[post("/stations")]
async fn create_station_endpoint(
    user: AuthenticatedUser,
    state: web::Data<ApiState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let new_station = validate_new_station(&body).map_err(ApiError::Validation)?;
    let station = state.stations.create_station(&user.0, new_station)?;
    Ok(HttpResponse::Created().json(StationResponse::from(station)))
}

#[put("/stations/{id}")]
async fn update_station_endpoint(
    user: AuthenticatedUser,
    state: web::Data<ApiState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let patch = validate_station_patch(&body).map_err(ApiError::Validation)?;
    let station = state.stations.update_station(&user.0, &path, patch)?;
    Ok(HttpResponse::Ok().json(StationResponse::from(station)))
}

#[delete("/stations/{id}")]
async fn delete_station_endpoint(
    user: AuthenticatedUser,
    state: web::Data<ApiState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state.stations.delete_station(&user.0, &path)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Charging station deleted" })))
}

#[get("/stations/nearby")]
async fn nearby_stations_endpoint(
    _user: AuthenticatedUser,
    state: web::Data<ApiState>,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, ApiError> {
    let (center, max_distance) = query.parse()?;
    let stations: Vec<StationResponse<Option<CreatorSummary>>> = state
        .stations
        .nearby_stations(center, max_distance)?
        .into_iter()
        .map(StationResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(stations))
}
