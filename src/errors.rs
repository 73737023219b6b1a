use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::InsufficientStock { .. }
            | DomainError::InvalidSignature
            | DomainError::StatusConflict(_) => AppError::BadRequest(message),
            DomainError::Forbidden(_) => AppError::Forbidden(message),
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::FulfillmentException { .. } => AppError::Conflict(message),
            DomainError::GatewayUnavailable(_) => AppError::BadGateway(message),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                error!("Internal error: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use uuid::Uuid;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                DomainError::InsufficientStock {
                    product: "T-Shirt".into(),
                    size: "M".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::InvalidSignature, StatusCode::BAD_REQUEST),
            (DomainError::StatusConflict("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (DomainError::not_found("Order"), StatusCode::NOT_FOUND),
            (
                DomainError::FulfillmentException {
                    order_id: Uuid::nil(),
                    product: "T-Shirt".into(),
                    size: "M".into(),
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::GatewayUnavailable("down".into()), StatusCode::BAD_GATEWAY),
            (DomainError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (domain, status) in cases {
            assert_eq!(AppError::from(domain).status_code(), status);
        }
    }

    #[test]
    fn not_found_keeps_message() {
        let err: AppError = DomainError::not_found("Order").into();
        assert_eq!(err.to_string(), "Order not found");
    }

    #[test]
    fn insufficient_stock_names_the_line() {
        let err: AppError = DomainError::InsufficientStock {
            product: "T-Shirt".into(),
            size: "M".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Not enough stock for T-Shirt (M)");
    }

    #[actix_web::test]
    async fn internal_error_body_is_generic() {
        let resp = AppError::Internal("connection refused at 10.0.0.3".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
