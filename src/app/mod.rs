mod config;
mod error;
mod logging;
mod runtime;
pub mod services;

pub use config::AppConfig;
pub use error::AppError;
pub use logging::{CLI_DEFAULT_DIRECTIVES, SERVER_DEFAULT_DIRECTIVES, init as init_logging};
pub use runtime::build_state;

pub fn run() -> Result<(), AppError> {
    let env_file = dotenvy::dotenv();
    logging::init(SERVER_DEFAULT_DIRECTIVES)?;

    match env_file {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(error = %error, "ignoring unreadable environment file"),
    }

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        db_path = %config.db_path,
        http_bind = %config.http_bind,
        http_workers = ?config.http_workers,
        cors_allowed_origin = ?config.cors_allowed_origin,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
