use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::db::{open_connection, run_migrations};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::{SqliteAuthService, SqliteStationService};

fn ensure_parent_dir(db_path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(AppError::database_init)?;
    }
    Ok(())
}

pub fn build_state(config: &AppConfig) -> Result<ApiState, AppError> {
    ensure_parent_dir(&config.db_path)?;
    let mut connection = open_connection(&config.db_path).map_err(AppError::database_init)?;
    run_migrations(&mut connection).map_err(AppError::database_init)?;

    let shared_connection = Arc::new(Mutex::new(connection));
    Ok(ApiState {
        stations: SqliteStationService::new(Arc::clone(&shared_connection)),
        auth: SqliteAuthService::new(shared_connection),
    })
}

fn cors(allowed_origin: Option<&str>) -> Cors {
    let cors = match allowed_origin {
        Some(origin) => Cors::default().allowed_origin(origin),
        None => Cors::default().allow_any_origin(),
    };
    cors.allow_any_method().allow_any_header().max_age(3600)
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let api_state = build_state(&config)?;

    tracing::info!(bind = %config.http_bind, "http server starting");

    actix_web::rt::System::new()
        .block_on(async move {
            let cors_origin = config.cors_allowed_origin.clone();
            let mut server = HttpServer::new(move || {
                App::new()
                    .wrap(Logger::default())
                    .wrap(cors(cors_origin.as_deref()))
                    .app_data(web::Data::new(api_state.clone()))
                    .configure(configure_routes)
            });
            if let Some(workers) = config.http_workers {
                server = server.workers(workers);
            }

            server.bind(&config.http_bind)?.run().await
        })
        .map_err(AppError::runtime)
}
