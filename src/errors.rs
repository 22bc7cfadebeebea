use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::NotFound(_) => AppError::NotFound(message),
            DomainError::InvalidArgument(msg) | DomainError::InvalidState(msg) => {
                AppError::BadRequest(msg)
            }
            DomainError::InsufficientStock { .. } => AppError::BadRequest(message),
            DomainError::Forbidden(msg) => AppError::Forbidden(msg),
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::RateLimited(msg) => AppError::TooManyRequests(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "status": "error",
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;
    use uuid::Uuid;

    async fn body_json(err: AppError) -> serde_json::Value {
        let body = to_bytes(err.error_response().into_body())
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order not found".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_error_message_is_generic() {
        let body = body_json(AppError::Internal("connection refused".to_string())).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Internal server error");
    }

    #[actix_web::test]
    async fn business_errors_keep_their_message() {
        let body = body_json(DomainError::invalid_state("cart is empty").into()).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "cart is empty");
    }

    #[test]
    fn domain_kinds_map_to_statuses() {
        let cases: Vec<(DomainError, StatusCode)> = vec![
            (DomainError::not_found("Product"), StatusCode::NOT_FOUND),
            (DomainError::invalid_argument("bad"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_state("bad"), StatusCode::BAD_REQUEST),
            (
                DomainError::InsufficientStock {
                    product_id: Uuid::nil(),
                    requested: 2,
                    available: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::forbidden("no"), StatusCode::FORBIDDEN),
            (
                DomainError::Unauthorized("who".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                DomainError::RateLimited("slow down".to_string()),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                DomainError::Internal("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (domain, status) in cases {
            let app: AppError = domain.into();
            assert_eq!(app.status_code(), status);
        }
    }

    #[test]
    fn not_found_display() {
        let app: AppError = DomainError::not_found("Order").into();
        assert_eq!(app.to_string(), "Order not found");
    }
}
