//! Client side of the stations API: an HTTP gateway, a state store that
//! mirrors server responses, and the navigation guard that gates views on
//! authentication.

pub mod config;
pub mod gateway;
pub mod models;
pub mod router;
pub mod storage;
pub mod store;
