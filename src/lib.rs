pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod utils;
