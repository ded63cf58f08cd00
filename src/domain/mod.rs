pub mod authorization;
pub mod geo;
pub mod models;
pub mod validation;
