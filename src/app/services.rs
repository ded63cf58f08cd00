use std::sync::{Arc, Mutex};

use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::Connection;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use thiserror::Error;

use crate::adapters::db;
use crate::adapters::db::DbError;
use crate::domain::authorization::{Access, check_station_access};
use crate::domain::models::{
    Actor, GeoPoint, NewStation, NewUser, Role, Station, StationPatch, StationWithCreator,
    UserRecord,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
    #[error("charging station not found")]
    NotFound,
    #[error("not authorized")]
    Forbidden,
    #[error("user already exists")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

pub trait StationQueryHandler {
    fn list_stations(&self) -> Result<Vec<StationWithCreator>, ServiceError>;
    fn nearby_stations(
        &self,
        center: GeoPoint,
        max_distance_m: u32,
    ) -> Result<Vec<StationWithCreator>, ServiceError>;
}

pub trait StationCommandHandler {
    fn create_station(
        &self,
        actor: &Actor,
        new_station: NewStation,
    ) -> Result<Station, ServiceError>;
    fn update_station(
        &self,
        actor: &Actor,
        id: &str,
        patch: StationPatch,
    ) -> Result<Station, ServiceError>;
    fn delete_station(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;
}

/// Session issued by register/login.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: UserRecord,
}

pub trait AuthHandler {
    fn authenticate(&self, token: &str) -> Result<Option<Actor>, ServiceError>;
    fn register(&self, new_user: NewUser) -> Result<AuthSession, ServiceError>;
    fn login(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;
}

fn with_locked<T>(
    connection: &Mutex<Connection>,
    op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let connection = connection
        .lock()
        .map_err(|_| ServiceError::DbLockPoisoned)?;
    op(&connection)
}

/// Bearer tokens stop resolving this long after they were issued.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn token_cutoff() -> String {
    let cutoff = Utc::now() - Duration::days(TOKEN_LIFETIME_DAYS);
    cutoff.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct SqliteStationService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStationService {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        with_locked(&self.connection, op)
    }

    /// Existence check first, then ownership. Both happen under the same lock
    /// as the write that follows.
    fn authorized_station(
        connection: &Connection,
        actor: &Actor,
        id: &str,
    ) -> Result<Station, ServiceError> {
        let station = db::get_station(connection, id)?.ok_or(ServiceError::NotFound)?;
        match check_station_access(actor, &station) {
            Access::Allowed => Ok(station),
            Access::Forbidden => Err(ServiceError::Forbidden),
        }
    }
}

impl StationQueryHandler for SqliteStationService {
    fn list_stations(&self) -> Result<Vec<StationWithCreator>, ServiceError> {
        self.with_connection(|connection| Ok(db::list_stations(connection)?))
    }

    fn nearby_stations(
        &self,
        center: GeoPoint,
        max_distance_m: u32,
    ) -> Result<Vec<StationWithCreator>, ServiceError> {
        self.with_connection(|connection| {
            Ok(db::nearby_stations(
                connection,
                center,
                f64::from(max_distance_m),
            )?)
        })
    }
}

impl StationCommandHandler for SqliteStationService {
    fn create_station(
        &self,
        actor: &Actor,
        new_station: NewStation,
    ) -> Result<Station, ServiceError> {
        let now = now_iso8601();
        let station = Station {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_station.name,
            location: new_station.location,
            status: new_station.status,
            power_output: new_station.power_output,
            connector_type: new_station.connector_type,
            created_by: actor.id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_connection(|connection| Ok(db::insert_station(connection, &station)?))?;

        tracing::info!(
            station_id = %station.id,
            created_by = %station.created_by,
            connector_type = %station.connector_type,
            "charging station created"
        );

        Ok(station)
    }

    fn update_station(
        &self,
        actor: &Actor,
        id: &str,
        patch: StationPatch,
    ) -> Result<Station, ServiceError> {
        let station = self.with_connection(|connection| {
            let mut station = Self::authorized_station(connection, actor, id)?;
            station.apply(patch, now_iso8601());
            if !db::update_station(connection, &station)? {
                return Err(ServiceError::NotFound);
            }
            Ok(station)
        })?;

        tracing::info!(station_id = %station.id, actor = %actor.id, "charging station updated");

        Ok(station)
    }

    fn delete_station(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        self.with_connection(|connection| {
            Self::authorized_station(connection, actor, id)?;
            if !db::delete_station(connection, id)? {
                return Err(ServiceError::NotFound);
            }
            Ok(())
        })?;

        tracing::info!(station_id = %id, actor = %actor.id, "charging station deleted");

        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteAuthService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteAuthService {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        with_locked(&self.connection, op)
    }

    fn issue_token(connection: &Connection, user: UserRecord) -> Result<AuthSession, ServiceError> {
        let pruned = db::prune_auth_tokens(connection, &token_cutoff())?;
        if pruned > 0 {
            tracing::debug!(pruned, "expired auth tokens removed");
        }

        let token = uuid::Uuid::new_v4().simple().to_string();
        db::insert_auth_token(connection, &token, &user.id, &now_iso8601())?;
        Ok(AuthSession { token, user })
    }
}

/// Argon2id in PHC string format; the salt is embedded in the result.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| ServiceError::PasswordHash(error.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|error| ServiceError::PasswordHash(error.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl AuthHandler for SqliteAuthService {
    fn authenticate(&self, token: &str) -> Result<Option<Actor>, ServiceError> {
        self.with_connection(|connection| {
            Ok(db::find_actor_by_token(connection, token, &token_cutoff())?)
        })
    }

    fn register(&self, new_user: NewUser) -> Result<AuthSession, ServiceError> {
        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name,
            email: new_user.email,
            role: Role::User,
            password_hash: hash_password(&new_user.password)?,
            created_at: now_iso8601(),
        };

        let session = self.with_connection(|connection| {
            if db::find_user_by_email(connection, &user.email)?.is_some() {
                return Err(ServiceError::EmailTaken);
            }
            db::insert_user(connection, &user)?;
            Self::issue_token(connection, user)
        })?;

        tracing::info!(user_id = %session.user.id, "user registered");

        Ok(session)
    }

    fn login(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        self.with_connection(|connection| {
            let user = db::find_user_by_email(connection, email)?
                .ok_or(ServiceError::InvalidCredentials)?;
            if !verify_password(password, &user.password_hash)? {
                return Err(ServiceError::InvalidCredentials);
            }
            Self::issue_token(connection, user)
        })
    }
}
