//! # Taskboard API Server Library
//!
//! HTTP surface of the task board: authentication, board plumbing, and the
//! transactional task reorder endpoint.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
