//! Review Rota - team rosters and pull request reviewer assignment.
//!
//! The library holds the whole service: the SQLite store (`db`), row and wire
//! types (`models`), the review workflow and its HTTP surface (`services`),
//! and configuration. The `review-rota` binary wires them together.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, ErrorCode};
