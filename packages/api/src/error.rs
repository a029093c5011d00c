use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use style_predict::PredictError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPolicy {
    Ignore,
    Report,
}

/// Error response: `{"error": "<message>"}` with a matching status code.
///
/// Server faults additionally carry an `x-error-id` header that is also
/// written to the log, so a client report can be matched to the log line.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report_policy: ReportPolicy,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, report_policy: ReportPolicy) -> Self {
        Self {
            status,
            message: message.into(),
            report_policy,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(StatusCode::BAD_REQUEST, msg, ReportPolicy::Ignore)
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Payload too large: {}", msg);
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, msg, ReportPolicy::Ignore)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            msg,
            ReportPolicy::Report,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            error: &'a str,
        }

        let mut response = (
            self.status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response();

        if self.report_policy == ReportPolicy::Report {
            let id = uuid::Uuid::new_v4().to_string();
            tracing::error!(error_id = %id, status = self.status.as_u16(), "{}", self.message);
            if let Ok(v) = HeaderValue::from_str(&id) {
                response.headers_mut().insert("x-error-id", v);
            }
        }

        response
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(msg) => Self::bad_request(msg),
            PredictError::Decode(e) => Self::internal(format!("cannot decode image: {e}")),
            PredictError::Inference(msg) => Self::internal(format!("inference failed: {msg}")),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large(err.body_text())
        } else {
            Self::bad_request(err.body_text())
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large(err.body_text())
        } else {
            Self::bad_request(err.body_text())
        }
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

#[macro_export]
macro_rules! bad_request {
    ($($arg:tt)*) => { $crate::error::ApiError::bad_request(format!($($arg)*)) };
}

#[macro_export]
macro_rules! internal {
    ($($arg:tt)*) => { $crate::error::ApiError::internal(format!($($arg)*)) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_status_codes() {
        let validation: ApiError = PredictError::Validation("missing".into()).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.message(), "missing");

        let inference: ApiError = PredictError::inference("boom").into();
        assert_eq!(inference.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(inference.message().contains("boom"));

        let decode_err = image::load_from_memory(b"nope").unwrap_err();
        let decode: ApiError = PredictError::Decode(decode_err).into();
        assert_eq!(decode.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_faults_carry_error_id() {
        let response = ApiError::internal("kaboom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key("x-error-id"));

        let response = ApiError::bad_request("nope").into_response();
        assert!(!response.headers().contains_key("x-error-id"));
    }
}
