//! API error body.
//!
//! The `AppError → HTTP` mapping itself lives on the error type in
//! `tavle-core` (the `IntoResponse` impl); this module only carries the
//! serialized body shape for clients that parse error responses.

use serde::{Deserialize, Serialize};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}
