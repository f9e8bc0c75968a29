//! Object registry handlers.
//!
//! Create is a multipart form (`title`, `description`, `file`); the
//! remaining operations are plain JSON.  Handlers invoke the change
//! notifier only after the repository call has committed.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::errors::ObjectStoreError;
use crate::metrics;
use crate::repository::{NewObject, UploadedFile};
use crate::AppState;

/// Fallback when an upload carries no explicit content type.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// -- Request validation -------------------------------------------------------

/// Validated shape of the non-file create fields.
#[derive(Debug, garde::Validate)]
pub struct CreateObjectRequest {
    /// Object title, required and non-empty.
    #[garde(length(min = 1))]
    pub title: String,
    /// Object description, required and non-empty.
    #[garde(length(min = 1))]
    pub description: String,
}

/// Pull the create fields out of a multipart form.
///
/// Unknown fields are ignored; `title`, `description`, and `file` are all
/// required.  The file part must carry a filename so the blob key can
/// keep its extension.
async fn read_create_form(
    mut multipart: Multipart,
) -> Result<(CreateObjectRequest, UploadedFile), ObjectStoreError> {
    let mut title = None;
    let mut description = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ObjectStoreError::InvalidArgument {
            message: format!("malformed multipart body: {err}"),
        })?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = Some(field.text().await.map_err(|err| {
                    ObjectStoreError::InvalidArgument {
                        message: format!("unreadable title field: {err}"),
                    }
                })?);
            }
            Some("description") => {
                description = Some(field.text().await.map_err(|err| {
                    ObjectStoreError::InvalidArgument {
                        message: format!("unreadable description field: {err}"),
                    }
                })?);
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_string).ok_or_else(|| {
                    ObjectStoreError::InvalidArgument {
                        message: "file field must carry a filename".to_string(),
                    }
                })?;
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
                let data = field.bytes().await.map_err(|err| {
                    ObjectStoreError::InvalidArgument {
                        message: format!("unreadable file field: {err}"),
                    }
                })?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let request = CreateObjectRequest {
        title: title.ok_or_else(|| ObjectStoreError::InvalidArgument {
            message: "title field is required".to_string(),
        })?,
        description: description.ok_or_else(|| ObjectStoreError::InvalidArgument {
            message: "description field is required".to_string(),
        })?,
    };
    request
        .validate()
        .map_err(|report| ObjectStoreError::InvalidArgument {
            message: report.to_string(),
        })?;

    let file = file.ok_or_else(|| ObjectStoreError::InvalidArgument {
        message: "file field is required".to_string(),
    })?;
    if file.data.is_empty() {
        return Err(ObjectStoreError::InvalidArgument {
            message: "file must not be empty".to_string(),
        });
    }

    Ok((request, file))
}

// -- Handlers -----------------------------------------------------------------

/// `POST /objects` -- register a new object.
#[utoipa::path(
    post,
    path = "/objects",
    tag = "Objects",
    operation_id = "CreateObject",
    responses(
        (status = 201, description = "Object created", body = crate::metadata::store::ObjectRecord),
        (status = 400, description = "Missing or empty field"),
        (status = 502, description = "A backing store failed")
    )
)]
pub async fn create_object(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ObjectStoreError> {
    let (request, file) = read_create_form(multipart).await?;

    let record = state
        .repository
        .create(
            NewObject {
                title: request.title,
                description: request.description,
            },
            file,
        )
        .await?;

    // Broadcast strictly after the repository committed.
    state.notifier.broadcast_created(&record);
    metrics::count_object_created();

    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// `GET /objects` -- list all objects, newest first.
#[utoipa::path(
    get,
    path = "/objects",
    tag = "Objects",
    operation_id = "ListObjects",
    responses(
        (status = 200, description = "All objects, newest first", body = [crate::metadata::store::ObjectRecord])
    )
)]
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ObjectStoreError> {
    let records = state.repository.find_all().await?;
    Ok(Json(records).into_response())
}

/// `GET /objects/{id}` -- fetch one object.
#[utoipa::path(
    get,
    path = "/objects/{id}",
    tag = "Objects",
    operation_id = "GetObject",
    params(
        ("id" = Uuid, Path, description = "Object id"),
    ),
    responses(
        (status = 200, description = "The object", body = crate::metadata::store::ObjectRecord),
        (status = 404, description = "No such object")
    )
)]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ObjectStoreError> {
    let record = state.repository.find_one(id).await?;
    Ok(Json(record).into_response())
}

/// `DELETE /objects/{id}` -- remove an object and its image.
#[utoipa::path(
    delete,
    path = "/objects/{id}",
    tag = "Objects",
    operation_id = "DeleteObject",
    params(
        ("id" = Uuid, Path, description = "Object id"),
    ),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 404, description = "No such object"),
        (status = 502, description = "A backing store failed")
    )
)]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ObjectStoreError> {
    state.repository.delete(id).await?;

    state.notifier.broadcast_deleted(id);
    metrics::count_object_deleted();

    Ok(StatusCode::NO_CONTENT.into_response())
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_rejects_empty_title() {
        let request = CreateObjectRequest {
            title: String::new(),
            description: "something".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_accepts_valid_fields() {
        let request = CreateObjectRequest {
            title: "Vase".to_string(),
            description: "Blue ceramic vase".to_string(),
        };
        assert!(request.validate().is_ok());
    }
}
