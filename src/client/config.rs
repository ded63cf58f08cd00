pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Base URL of the API. Baked in at build time from `EV_STATIONS_API_URL`,
/// falling back to the local development endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: resolve_api_url(option_env!("EV_STATIONS_API_URL")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn resolve_api_url(build_time: Option<&'static str>) -> &'static str {
    build_time
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_URL)
}
