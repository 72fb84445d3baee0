// Library crate for integration tests.
// main.rs has its own mod declarations; this re-exports all modules.

pub mod alerts;
pub mod analysis;
pub mod config;
pub mod db;
pub mod decimal;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;
pub mod websites;
