//! Maps the domain error taxonomy onto HTTP responses.

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domains::AppError;
use serde_json::json;

pub const LOGIN_PATH: &str = "/login/";

#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    /// Where an anonymous caller returns after logging in.
    next: Option<String>,
}

impl ApiError {
    pub fn resume_at(mut self, path: impl Into<String>) -> Self {
        self.next = Some(path.into());
        self
    }

    fn login_location(&self) -> String {
        match &self.next {
            Some(next) => format!("{LOGIN_PATH}?next={next}"),
            None => LOGIN_PATH.to_string(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        ApiError { error, next: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.error {
            AppError::AuthenticationRequired => {
                return (StatusCode::FOUND, [(LOCATION, self.login_location())]).into_response();
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.error.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.error.to_string()),
            AppError::ValidationFailed(_) | AppError::VerificationFailed => {
                (StatusCode::BAD_REQUEST, self.error.to_string())
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.error.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.error.to_string()),
            AppError::UpstreamUnavailable(msg) => {
                tracing::warn!(%msg, "upstream unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".to_string())
            }
            AppError::UnknownPermission(_) | AppError::Internal(_) => {
                tracing::error!(error = %self.error, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Option<String>, Value) {
        let response = err.into_response();
        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, location, body)
    }

    #[tokio::test]
    async fn anonymous_callers_are_redirected_with_next() {
        let err = ApiError::from(AppError::AuthenticationRequired).resume_at("/news/4/");
        let (status, location, body) = render(err).await;

        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.as_deref(), Some("/login/?next=/news/4/"));
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn redirect_without_next_goes_to_plain_login() {
        let (_, location, _) = render(AppError::AuthenticationRequired.into()).await;
        assert_eq!(location.as_deref(), Some(LOGIN_PATH));
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let cases = [
            (AppError::not_found("newspost 9"), StatusCode::NOT_FOUND),
            (AppError::Forbidden("view_newspost".into()), StatusCode::FORBIDDEN),
            (AppError::ValidationFailed("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::VerificationFailed, StatusCode::BAD_REQUEST),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::Conflict("taken".into()), StatusCode::CONFLICT),
        ];

        for (err, expected) in cases {
            let message = err.to_string();
            let (status, _, body) = render(err.into()).await;
            assert_eq!(status, expected);
            assert_eq!(body["error"], message);
            assert_eq!(body["status"], expected.as_u16());
        }
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, _, body) = render(AppError::internal("disk on fire").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");

        let (status, _, _) = render(AppError::UnknownPermission("fly".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _, body) = render(AppError::UpstreamUnavailable("timeout".into()).into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service unavailable");
    }
}
