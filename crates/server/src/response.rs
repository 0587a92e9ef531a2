//! Response envelope and error mapping shared by both gateways.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use service::ServiceError;

/// Success envelope: `{"message": <payload>}`.
pub(crate) fn success<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(json!({ "message": payload }))).into_response()
}

/// Failure envelope: `{"error": "<text>"}` with the mapped status.
pub(crate) fn failure(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "error": text.into() }))).into_response()
}

/// HTTP status for each error class.
pub(crate) fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::InsufficientStock => StatusCode::PRECONDITION_FAILED,
        // Reported as "no such owner-sku pair".
        ServiceError::OwnershipMismatch => StatusCode::NOT_FOUND,
        ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ServiceError::Db(_) | ServiceError::Stock(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(err: &ServiceError) -> Response {
    failure(status_for(err), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repository::RepositoryError;
    use stock_client::StockClientError;

    #[test]
    fn error_classes_map_to_the_documented_statuses() {
        assert_eq!(status_for(&ServiceError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&ServiceError::InsufficientStock),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            status_for(&ServiceError::OwnershipMismatch),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ServiceError::InvalidArgument("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ServiceError::Db(RepositoryError::Conflict)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&ServiceError::Stock(StockClientError::BadResponse(
                StatusCode::BAD_GATEWAY
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
