//! Error types for the object registry.
//!
//! Every variant maps to one failure class from the store seams or the
//! request boundary.  The enum implements [`axum::response::IntoResponse`]
//! so handlers can simply return `Err(ObjectStoreError::NotFound { .. })`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Failure classes surfaced by the repository and the request boundary.
///
/// Store failures carry their underlying cause but are never retried or
/// rolled back here; the caller decides whether to retry the whole
/// operation.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The blob store rejected or could not complete a write.
    #[error("blob write failed for key `{key}`: {cause}")]
    BlobWrite { key: String, cause: anyhow::Error },

    /// The blob store rejected or could not complete a delete.
    #[error("blob delete failed for key `{key}`: {cause}")]
    BlobDelete { key: String, cause: anyhow::Error },

    /// The metadata record insert failed (after a successful blob write
    /// this leaves an orphaned blob behind).
    #[error("metadata write failed: {cause}")]
    MetadataWrite { cause: anyhow::Error },

    /// The metadata record delete failed (after a successful blob delete
    /// this leaves a dangling image URL behind).
    #[error("metadata delete failed for object `{id}`: {cause}")]
    MetadataDelete { id: Uuid, cause: anyhow::Error },

    /// No object with the given id exists.  A normal outcome for unknown
    /// ids, distinct from store-connectivity failures.
    #[error("object `{id}` not found")]
    NotFound { id: Uuid },

    /// A stored image URL does not carry the expected bucket prefix.
    /// Records created by this service always do, so this signals a
    /// defect, not a user error.
    #[error("image URL `{url}` does not match the configured bucket prefix")]
    InvalidLocator { url: String },

    /// A request argument is missing or malformed.
    #[error("{message}")]
    InvalidArgument { message: String },

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ObjectStoreError {
    /// Return the stable error code string used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ObjectStoreError::BlobWrite { .. } => "BlobWriteError",
            ObjectStoreError::BlobDelete { .. } => "BlobDeleteError",
            ObjectStoreError::MetadataWrite { .. } => "MetadataWriteError",
            ObjectStoreError::MetadataDelete { .. } => "MetadataDeleteError",
            ObjectStoreError::NotFound { .. } => "NotFound",
            ObjectStoreError::InvalidLocator { .. } => "InvalidLocator",
            ObjectStoreError::InvalidArgument { .. } => "InvalidArgument",
            ObjectStoreError::Internal(_) => "InternalError",
        }
    }

    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ObjectStoreError::BlobWrite { .. } => StatusCode::BAD_GATEWAY,
            ObjectStoreError::BlobDelete { .. } => StatusCode::BAD_GATEWAY,
            ObjectStoreError::MetadataWrite { .. } => StatusCode::BAD_GATEWAY,
            ObjectStoreError::MetadataDelete { .. } => StatusCode::BAD_GATEWAY,
            ObjectStoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            ObjectStoreError::InvalidLocator { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ObjectStoreError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            ObjectStoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ObjectStoreError {
    fn into_response(self) -> Response {
        let request_id = generate_request_id();
        let status = self.status_code();

        // Invariant violations are a defect signal; keep the detail out of
        // the client-facing body and in the server log instead.
        let message = match &self {
            ObjectStoreError::InvalidLocator { .. } | ObjectStoreError::Internal(_) => {
                tracing::error!(code = self.code(), %request_id, "{}", self);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "code": self.code(),
            "message": message,
            "requestId": request_id,
        });

        (
            status,
            [
                ("content-type", "application/json".to_string()),
                ("x-request-id", request_id),
            ],
            body.to_string(),
        )
            .into_response()
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            ObjectStoreError::NotFound { id }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ObjectStoreError::InvalidArgument {
                message: "title must not be empty".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ObjectStoreError::BlobWrite {
                key: "objects/x.jpg".into(),
                cause: anyhow::anyhow!("connection refused")
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ObjectStoreError::InvalidLocator {
                url: "http://elsewhere/img.png".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            ObjectStoreError::MetadataWrite {
                cause: anyhow::anyhow!("db down")
            }
            .code(),
            "MetadataWriteError"
        );
        assert_eq!(
            ObjectStoreError::MetadataDelete {
                id: Uuid::new_v4(),
                cause: anyhow::anyhow!("db down")
            }
            .code(),
            "MetadataDeleteError"
        );
        assert_eq!(
            ObjectStoreError::BlobDelete {
                key: "objects/x.jpg".into(),
                cause: anyhow::anyhow!("gone")
            }
            .code(),
            "BlobDeleteError"
        );
    }

    #[test]
    fn test_request_id_shape() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
