use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::client::models::{
    AuthPayload, Credentials, NearbyParams, Registration, Station, StationDraft,
};
use crate::client::storage::{KeyValueStorage, TOKEN_KEY};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl GatewayError {
    /// The `message` field of an error response, if the server sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Calls into the stations API. One attempt per call; failures are returned
/// unchanged.
#[allow(async_fn_in_trait)]
pub trait StationGateway {
    async fn register(&self, registration: &Registration) -> Result<AuthPayload, GatewayError>;
    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, GatewayError>;
    async fn list_stations(&self) -> Result<Vec<Station>, GatewayError>;
    async fn create_station(&self, draft: &StationDraft) -> Result<Station, GatewayError>;
    async fn update_station(
        &self,
        id: &str,
        draft: &StationDraft,
    ) -> Result<Station, GatewayError>;
    async fn delete_station(&self, id: &str) -> Result<(), GatewayError>;
    async fn nearby_stations(&self, params: NearbyParams) -> Result<Vec<Station>, GatewayError>;
}

pub struct HttpGateway<S> {
    client: reqwest::Client,
    base_url: String,
    storage: Arc<S>,
}

impl<S: KeyValueStorage> HttpGateway<S> {
    pub fn new(base_url: &str, storage: Arc<S>) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(GatewayError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            storage,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token is read from storage on every call, so a login or logout
    /// through the store takes effect on the next request.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        match self.storage.get(TOKEN_KEY) {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let response = builder.send().await.map_err(GatewayError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<Value>().await.ok();
        let message = body
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(ToString::to_string);

        tracing::debug!(status = status.as_u16(), message = ?message, "api request rejected");

        Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, GatewayError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(GatewayError::Decode)
    }
}

impl<S: KeyValueStorage> StationGateway for HttpGateway<S> {
    async fn register(&self, registration: &Registration) -> Result<AuthPayload, GatewayError> {
        Self::send_json(self.request(Method::POST, "/auth/register").json(registration)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, GatewayError> {
        Self::send_json(self.request(Method::POST, "/auth/login").json(credentials)).await
    }

    async fn list_stations(&self) -> Result<Vec<Station>, GatewayError> {
        Self::send_json(self.request(Method::GET, "/stations")).await
    }

    async fn create_station(&self, draft: &StationDraft) -> Result<Station, GatewayError> {
        Self::send_json(self.request(Method::POST, "/stations").json(draft)).await
    }

    async fn update_station(
        &self,
        id: &str,
        draft: &StationDraft,
    ) -> Result<Station, GatewayError> {
        Self::send_json(self.request(Method::PUT, &format!("/stations/{id}")).json(draft)).await
    }

    async fn delete_station(&self, id: &str) -> Result<(), GatewayError> {
        Self::send(self.request(Method::DELETE, &format!("/stations/{id}"))).await?;
        Ok(())
    }

    async fn nearby_stations(&self, params: NearbyParams) -> Result<Vec<Station>, GatewayError> {
        let mut query = vec![
            ("longitude", params.longitude.to_string()),
            ("latitude", params.latitude.to_string()),
        ];
        if let Some(max_distance) = params.max_distance {
            query.push(("maxDistance", max_distance.to_string()));
        }

        Self::send_json(self.request(Method::GET, "/stations/nearby").query(&query)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, HttpServer, web};

    use super::{GatewayError, HttpGateway, StationGateway};
    use crate::adapters::api::configure_routes;
    use crate::app::{AppConfig, build_state};
    use crate::client::models::{
        CreatedBy, Credentials, NearbyParams, Registration, StationDraft,
    };
    use crate::client::storage::{KeyValueStorage, MemoryStorage, TOKEN_KEY};
    use crate::domain::models::{ConnectorType, GeoPoint};

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let gateway = HttpGateway::new(
            "http://localhost:5000/api/",
            Arc::new(MemoryStorage::default()),
        )
        .expect("gateway should build");
        assert_eq!(gateway.base_url(), "http://localhost:5000/api");
    }

    #[actix_web::test]
    async fn talks_to_a_running_server_with_the_stored_token() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = AppConfig {
            db_path: dir
                .path()
                .join("gateway.sqlite")
                .to_string_lossy()
                .into_owned(),
            http_bind: "127.0.0.1:0".to_string(),
            http_workers: Some(1),
            cors_allowed_origin: None,
        };
        let state = build_state(&config).expect("state should build");

        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes)
        })
        .workers(1)
        .bind(config.http_bind.as_str())
        .expect("server should bind");
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let storage = Arc::new(MemoryStorage::default());
        let gateway = HttpGateway::new(&format!("http://{addr}/api"), Arc::clone(&storage))
            .expect("gateway should build");

        let error = gateway
            .list_stations()
            .await
            .expect_err("anonymous list should be rejected");
        assert_eq!(error.status(), Some(401));
        assert_eq!(
            error.server_message(),
            Some("No token, authorization denied")
        );

        let session = gateway
            .register(&Registration {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .expect("register should succeed");
        storage
            .set(TOKEN_KEY, &session.token)
            .expect("token should be stored");

        let created = gateway
            .create_station(&StationDraft {
                name: Some("Station A".to_string()),
                location: Some(GeoPoint::new(12.5, 55.6)),
                power_output: Some(50.0),
                connector_type: Some(ConnectorType::Ccs),
                ..StationDraft::default()
            })
            .await
            .expect("create should succeed");
        assert_eq!(
            created.created_by,
            Some(CreatedBy::Id(session.user.id.clone()))
        );

        let nearby = gateway
            .nearby_stations(NearbyParams {
                longitude: 12.5,
                latitude: 55.6,
                max_distance: Some(100),
            })
            .await
            .expect("nearby should succeed");
        assert_eq!(nearby.len(), 1);
        assert_eq!(
            nearby[0].created_by.as_ref().map(CreatedBy::id),
            Some(session.user.id.as_str())
        );

        let invalid = gateway
            .create_station(&StationDraft {
                name: Some("Broken".to_string()),
                ..StationDraft::default()
            })
            .await
            .expect_err("incomplete station should be rejected");
        assert!(matches!(invalid, GatewayError::Status { status: 400, .. }));
        assert_eq!(invalid.server_message(), None);

        gateway
            .delete_station(&created.id)
            .await
            .expect("delete should succeed");
        assert!(
            gateway
                .list_stations()
                .await
                .expect("list should succeed")
                .is_empty()
        );

        let login = gateway
            .login(&Credentials {
                email: "ada@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .expect_err("bad credentials should be rejected");
        assert_eq!(login.server_message(), Some("Invalid credentials"));

        handle.stop(true).await;
    }
}
