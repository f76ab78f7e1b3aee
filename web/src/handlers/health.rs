//! Liveness and build information.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Simple health check endpoint (for basic liveness).
///
/// Does not check the broker or the database.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Body of `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Service name
    pub name: String,
    /// Crate version
    pub version: String,
}

/// Report the running build.
///
/// # Endpoint
///
/// ```text
/// GET /version
/// ```
///
/// # Response
///
/// ```json
/// { "name": "waiter", "version": "0.1.0" }
/// ```
#[allow(clippy::unused_async)]
pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: "waiter".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_version_reports_crate_version() {
        let Json(info) = version().await;
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }
}
