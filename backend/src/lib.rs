//! Multiplayer chess server
//!
//! - [`session`] - one game: seats, move pipeline, status
//! - [`coordinator`] - registry of live sessions, computer replies, fan-out
//! - [`store`] - persistence seam (in-memory or SQLite)
//! - [`api`] - HTTP and WebSocket routes

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod session;
pub mod store;
