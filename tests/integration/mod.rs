//! Integration tests against real git repositories.

pub mod test_utils;

mod config_integration;
mod orchestra_integration;
mod provision_integration;
mod service_integration;
mod store_integration;
