pub mod authentication;
pub mod cache;
pub mod compiler;
pub mod configuration;
pub mod dispatch;
pub mod domain;
pub mod email_client;
pub mod ledger;
pub mod routes;
pub mod session_state;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
