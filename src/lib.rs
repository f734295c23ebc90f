pub mod accounts;
pub mod api;
pub mod auth;
pub mod config;
pub mod connections;
pub mod database;
pub mod error;
pub mod notifications;
pub mod posting;
pub mod telemetry;
pub mod utils;
pub mod votes;
