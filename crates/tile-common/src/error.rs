//! Error types for the tile rendering pipeline.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Every way a tile request can fail.
///
/// Each pipeline stage returns one of these; the first failure ends the
/// request and is mapped to an HTTP status by [`TileError::http_status_code`].
#[derive(Debug, Error)]
pub enum TileError {
    // === Client Errors ===
    #[error("Invalid tile: {0}")]
    InvalidTile(String),

    #[error("Method not allowed: {0}")]
    UnsupportedMethod(String),

    // === Upstream Errors ===
    #[error("Upstream fetch failed after {attempts} attempt(s): {message}")]
    Network { attempts: u32, message: String },

    #[error("Invalid vector tile payload: {0}")]
    Decode(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    // === Service Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TileError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::InvalidTile(_) => 404,
            TileError::UnsupportedMethod(_) => 405,
            TileError::Network { .. }
            | TileError::Decode(_)
            | TileError::Render(_)
            | TileError::Encode(_)
            | TileError::Internal(_) => 500,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TileError::InvalidTile(_) => "invalid_tile",
            TileError::UnsupportedMethod(_) => "unsupported_method",
            TileError::Network { .. } => "network",
            TileError::Decode(_) => "decode",
            TileError::Render(_) => "render",
            TileError::Encode(_) => "encode",
            TileError::Internal(_) => "internal",
        }
    }

    /// Whether the failure is the client's fault rather than the server's.
    pub fn is_client_error(&self) -> bool {
        self.http_status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TileError::InvalidTile("z".into()).http_status_code(), 404);
        assert_eq!(TileError::UnsupportedMethod("POST".into()).http_status_code(), 405);
        assert_eq!(
            TileError::Network {
                attempts: 3,
                message: "timeout".into()
            }
            .http_status_code(),
            500
        );
        assert_eq!(TileError::Decode("bad".into()).http_status_code(), 500);
        assert_eq!(TileError::Encode("bad".into()).http_status_code(), 500);
    }

    #[test]
    fn test_network_error_message_carries_attempts() {
        let err = TileError::Network {
            attempts: 3,
            message: "HTTP 503".into(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream fetch failed after 3 attempt(s): HTTP 503"
        );
        assert!(!err.is_client_error());
    }
}
