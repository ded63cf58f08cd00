use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

pub const SERVER_DEFAULT_DIRECTIVES: &str = "info";
pub const CLI_DEFAULT_DIRECTIVES: &str = "warn";

/// `RUST_LOG` wins over `default_directives` when set.
pub fn init(default_directives: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(AppError::logging_init)
}
