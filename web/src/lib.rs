//! HTTP adapter for the Brigade order pipeline.
//!
//! A thin request/response layer over the waiter and the read side:
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** the body or path parameters
//! 3. **Call** the [`Waiter`](brigade_runtime::Waiter) or a store gateway
//! 4. **Map** the result or error to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use brigade_web::{AppState, router};
//!
//! let state = AppState::new(waiter, orders, menu);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8081").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
