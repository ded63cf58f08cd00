pub mod adapters;
pub mod app;
pub mod client;
pub mod domain;

#[cfg(test)]
mod test_support;
