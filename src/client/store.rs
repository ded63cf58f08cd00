use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use thiserror::Error;

use crate::client::gateway::{GatewayError, StationGateway};
use crate::client::models::{
    AuthPayload, Credentials, NearbyParams, Registration, Station, StationDraft, User,
};
use crate::client::storage::{KeyValueStorage, StorageError, TOKEN_KEY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("failed to persist auth token: {0}")]
    Storage(#[from] StorageError),
}

/// Client-side view of the session and the last fetched station list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub stations: Vec<Station>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ClientState {
    /// Starts unauthenticated unless a token was persisted by an earlier session.
    pub fn restore<S: KeyValueStorage + ?Sized>(storage: &S) -> Self {
        Self {
            token: storage.get(TOKEN_KEY).filter(|token| !token.is_empty()),
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Holds the loading flag up for as long as it lives, so the flag is cleared
/// on success, failure and when the action future is dropped mid-flight.
struct Loading<'a>(&'a mut ClientState);

impl<'a> Loading<'a> {
    fn begin(state: &'a mut ClientState) -> Self {
        state.loading = true;
        Self(state)
    }
}

impl Deref for Loading<'_> {
    type Target = ClientState;

    fn deref(&self) -> &ClientState {
        &*self.0
    }
}

impl DerefMut for Loading<'_> {
    fn deref_mut(&mut self) -> &mut ClientState {
        &mut *self.0
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.loading = false;
    }
}

fn commit_token<S: KeyValueStorage + ?Sized>(
    state: &mut ClientState,
    storage: &S,
    token: Option<String>,
) -> Result<(), StorageError> {
    match token.filter(|token| !token.is_empty()) {
        Some(token) => {
            storage.set(TOKEN_KEY, &token)?;
            state.token = Some(token);
        }
        None => {
            state.token = None;
            storage.remove(TOKEN_KEY)?;
        }
    }
    Ok(())
}

fn commit_session<S: KeyValueStorage + ?Sized>(
    state: &mut ClientState,
    storage: &S,
    payload: AuthPayload,
) -> Result<User, StoreError> {
    commit_token(state, storage, Some(payload.token))?;
    state.user = Some(payload.user.clone());
    Ok(payload.user)
}

fn settle<T>(
    state: &mut ClientState,
    result: Result<T, StoreError>,
    fallback: &str,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            state.error = None;
            Ok(value)
        }
        Err(error) => {
            let message = match &error {
                StoreError::Gateway(gateway_error) => gateway_error.server_message(),
                StoreError::Storage(_) => None,
            };
            state.error = Some(message.unwrap_or(fallback).to_string());
            tracing::debug!(error = %error, "store action failed");
            Err(error)
        }
    }
}

/// The single owner of [`ClientState`]. State only changes through the
/// action methods below.
pub struct AppStore<G, S> {
    state: ClientState,
    gateway: G,
    storage: Arc<S>,
}

impl<G, S> AppStore<G, S>
where
    G: StationGateway,
    S: KeyValueStorage,
{
    pub fn new(gateway: G, storage: Arc<S>) -> Self {
        Self {
            state: ClientState::restore(storage.as_ref()),
            gateway,
            storage,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn all_stations(&self) -> &[Station] {
        &self.state.stations
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<User, StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = match self.gateway.login(credentials).await {
            Ok(payload) => commit_session(&mut state, self.storage.as_ref(), payload),
            Err(error) => Err(error.into()),
        };
        settle(&mut state, result, "Login failed")
    }

    pub async fn register(&mut self, registration: &Registration) -> Result<User, StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = match self.gateway.register(registration).await {
            Ok(payload) => commit_session(&mut state, self.storage.as_ref(), payload),
            Err(error) => Err(error.into()),
        };
        settle(&mut state, result, "Registration failed")
    }

    /// Local only. The in-memory session is dropped even if the persisted
    /// token cannot be removed.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.state.user = None;
        commit_token(&mut self.state, self.storage.as_ref(), None)?;
        Ok(())
    }

    pub async fn fetch_stations(&mut self) -> Result<Vec<Station>, StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = match self.gateway.list_stations().await {
            Ok(stations) => {
                state.stations = stations.clone();
                Ok(stations)
            }
            Err(error) => Err(error.into()),
        };
        settle(&mut state, result, "Failed to fetch stations")
    }

    pub async fn create_station(&mut self, draft: &StationDraft) -> Result<Station, StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = match self.gateway.create_station(draft).await {
            Ok(station) => {
                state.stations.push(station.clone());
                Ok(station)
            }
            Err(error) => Err(error.into()),
        };
        settle(&mut state, result, "Failed to create station")
    }

    pub async fn update_station(
        &mut self,
        id: &str,
        draft: &StationDraft,
    ) -> Result<Station, StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = match self.gateway.update_station(id, draft).await {
            Ok(updated) => {
                for station in state.stations.iter_mut().filter(|station| station.id == id) {
                    *station = updated.clone();
                }
                Ok(updated)
            }
            Err(error) => Err(error.into()),
        };
        settle(&mut state, result, "Failed to update station")
    }

    pub async fn delete_station(&mut self, id: &str) -> Result<(), StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = match self.gateway.delete_station(id).await {
            Ok(()) => {
                state.stations.retain(|station| station.id != id);
                Ok(())
            }
            Err(error) => Err(error.into()),
        };
        settle(&mut state, result, "Failed to delete station")
    }

    /// Nearby results are returned to the caller; the station list is left alone.
    pub async fn fetch_nearby(&mut self, params: NearbyParams) -> Result<Vec<Station>, StoreError> {
        let mut state = Loading::begin(&mut self.state);
        let result = self
            .gateway
            .nearby_stations(params)
            .await
            .map_err(StoreError::from);
        settle(&mut state, result, "Failed to fetch nearby stations")
    }
}
