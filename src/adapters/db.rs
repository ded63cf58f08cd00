use std::str::FromStr;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use crate::domain::geo::{self, BoundingBox};
use crate::domain::models::{
    Actor, CreatorSummary, GeoPoint, Role, Station, StationWithCreator, UnknownVariant, UserRecord,
};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

pub const DISTANCE_FUNCTION: &str = "geo_distance_m";

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'user',
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_tokens (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_auth_tokens_created_at
ON auth_tokens (created_at);

CREATE TABLE IF NOT EXISTS stations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    longitude REAL NOT NULL,
    latitude REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    power_output REAL NOT NULL CHECK (power_output >= 0),
    connector_type TEXT NOT NULL,
    created_by TEXT NOT NULL REFERENCES users (id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stations_location
ON stations (latitude, longitude);

CREATE INDEX IF NOT EXISTS idx_stations_created_at
ON stations (created_at);
"#,
)];

const STATION_SELECT: &str = "SELECT s.id, s.name, s.longitude, s.latitude, s.status, s.power_output,
        s.connector_type, s.created_by, s.created_at, s.updated_at,
        u.id, u.name, u.email
 FROM stations s
 LEFT JOIN users u ON u.id = s.created_by";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

/// Opens the database and registers the distance function used by proximity queries.
pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    let connection = Connection::open(path)?;
    connection.pragma_update(None, "foreign_keys", true)?;
    register_geo_functions(&connection)?;
    Ok(connection)
}

fn register_geo_functions(connection: &Connection) -> Result<(), DbError> {
    connection.create_scalar_function(
        DISTANCE_FUNCTION,
        4,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let lon1 = ctx.get::<f64>(0)?;
            let lat1 = ctx.get::<f64>(1)?;
            let lon2 = ctx.get::<f64>(2)?;
            let lat2 = ctx.get::<f64>(3)?;
            Ok(geo::distance_m(lon1, lat1, lon2, lat2))
        },
    )?;
    Ok(())
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn parse_column<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(index)?;
    raw.parse::<T>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn station_from_row(row: &Row<'_>) -> rusqlite::Result<Station> {
    Ok(Station {
        id: row.get(0)?,
        name: row.get(1)?,
        location: GeoPoint::new(row.get(2)?, row.get(3)?),
        status: parse_column(row, 4)?,
        power_output: row.get(5)?,
        connector_type: parse_column(row, 6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn station_with_creator_from_row(row: &Row<'_>) -> rusqlite::Result<StationWithCreator> {
    let station = station_from_row(row)?;
    let creator_id: Option<String> = row.get(10)?;
    let creator = match creator_id {
        Some(id) => Some(CreatorSummary {
            id,
            name: row.get(11)?,
            email: row.get(12)?,
        }),
        None => None,
    };

    Ok(StationWithCreator { station, creator })
}

pub fn insert_station(connection: &Connection, station: &Station) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO stations (id, name, longitude, latitude, status, power_output, connector_type, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            station.id,
            station.name,
            station.location.longitude,
            station.location.latitude,
            station.status.as_str(),
            station.power_output,
            station.connector_type.as_str(),
            station.created_by,
            station.created_at,
            station.updated_at,
        ],
    )?;

    Ok(())
}

pub fn get_station(connection: &Connection, id: &str) -> Result<Option<Station>, DbError> {
    let station = connection
        .query_row(
            &format!("{STATION_SELECT} WHERE s.id = ?1"),
            params![id],
            station_from_row,
        )
        .optional()?;

    Ok(station)
}

pub fn list_stations(connection: &Connection) -> Result<Vec<StationWithCreator>, DbError> {
    let mut statement =
        connection.prepare(&format!("{STATION_SELECT} ORDER BY s.created_at ASC, s.id ASC"))?;

    let rows = statement.query_map([], station_with_creator_from_row)?;

    let mut stations = Vec::new();
    for row in rows {
        stations.push(row?);
    }

    Ok(stations)
}

/// Overwrites every mutable column of the row. `created_by` and `created_at`
/// are never written. Returns false when no row matched.
pub fn update_station(connection: &Connection, station: &Station) -> Result<bool, DbError> {
    let changed = connection.execute(
        "UPDATE stations
         SET name = ?2, longitude = ?3, latitude = ?4, status = ?5, power_output = ?6,
             connector_type = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            station.id,
            station.name,
            station.location.longitude,
            station.location.latitude,
            station.status.as_str(),
            station.power_output,
            station.connector_type.as_str(),
            station.updated_at,
        ],
    )?;

    Ok(changed > 0)
}

pub fn delete_station(connection: &Connection, id: &str) -> Result<bool, DbError> {
    let changed = connection.execute("DELETE FROM stations WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Stations within `max_distance_m` of `center`, nearest first.
pub fn nearby_stations(
    connection: &Connection,
    center: GeoPoint,
    max_distance_m: f64,
) -> Result<Vec<StationWithCreator>, DbError> {
    let bbox = BoundingBox::around(center, max_distance_m);
    let mut statement = connection.prepare(&format!(
        "{STATION_SELECT}
         WHERE s.latitude BETWEEN ?3 AND ?4
           AND s.longitude BETWEEN ?5 AND ?6
           AND {DISTANCE_FUNCTION}(s.longitude, s.latitude, ?1, ?2) <= ?7
         ORDER BY {DISTANCE_FUNCTION}(s.longitude, s.latitude, ?1, ?2) ASC, s.id ASC"
    ))?;

    let rows = statement.query_map(
        params![
            center.longitude,
            center.latitude,
            bbox.min_latitude,
            bbox.max_latitude,
            bbox.min_longitude,
            bbox.max_longitude,
            max_distance_m,
        ],
        station_with_creator_from_row,
    )?;

    let mut stations = Vec::new();
    for row in rows {
        stations.push(row?);
    }

    Ok(stations)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: parse_column(row, 3)?,
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_user(connection: &Connection, user: &UserRecord) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO users (id, name, email, role, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.name,
            user.email,
            user.role.as_str(),
            user.password_hash,
            user.created_at,
        ],
    )?;

    Ok(())
}

pub fn find_user_by_email(
    connection: &Connection,
    email: &str,
) -> Result<Option<UserRecord>, DbError> {
    let user = connection
        .query_row(
            "SELECT id, name, email, role, password_hash, created_at
             FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        )
        .optional()?;

    Ok(user)
}

pub fn set_user_role(connection: &Connection, email: &str, role: Role) -> Result<bool, DbError> {
    let changed = connection.execute(
        "UPDATE users SET role = ?2 WHERE email = ?1",
        params![email, role.as_str()],
    )?;
    Ok(changed > 0)
}

pub fn insert_auth_token(
    connection: &Connection,
    token: &str,
    user_id: &str,
    created_at: &str,
) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, created_at],
    )?;
    Ok(())
}

/// Removes tokens issued before `issued_before`. Returns the number removed.
pub fn prune_auth_tokens(connection: &Connection, issued_before: &str) -> Result<usize, DbError> {
    let removed = connection.execute(
        "DELETE FROM auth_tokens WHERE created_at < ?1",
        params![issued_before],
    )?;
    Ok(removed)
}

/// Tokens issued before `issued_before` no longer resolve.
pub fn find_actor_by_token(
    connection: &Connection,
    token: &str,
    issued_before: &str,
) -> Result<Option<Actor>, DbError> {
    let actor = connection
        .query_row(
            "SELECT u.id, u.role
             FROM auth_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token = ?1 AND t.created_at >= ?2",
            params![token, issued_before],
            |row| {
                Ok(Actor {
                    id: row.get(0)?,
                    role: parse_column(row, 1)?,
                })
            },
        )
        .optional()?;

    Ok(actor)
}
