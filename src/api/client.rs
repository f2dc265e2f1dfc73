use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::models::{ComponentRecord, Device, Role, User};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the monitoring backend: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from the monitoring backend: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("login response carried no session token")]
    MissingToken,
    #[error("backend session is no longer valid")]
    Unauthorized,
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_code: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    requires_2fa: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Success { token: String, user: User },
    /// Credentials were accepted but a TOTP code is still needed.
    TwoFactorRequired,
    Rejected { message: String },
}

/// Client for the device-monitoring REST backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginOutcome, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .header("X-Requested-With", "XMLHttpRequest")
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        classify_login(status, &text)
    }

    pub async fn list_devices(&self, token: &str, role: Role) -> Result<Vec<Device>, ApiError> {
        let path = match role {
            Role::Worker => "/users/devices",
            Role::Admin | Role::Unknown => "/devices",
        };
        self.get_json(token, path).await
    }

    pub async fn device_components(
        &self,
        token: &str,
        device_id: &str,
    ) -> Result<Vec<ComponentRecord>, ApiError> {
        self.get_json(token, &format!("/devices/{}/components", device_id))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn classify_login(status: StatusCode, body: &str) -> Result<LoginOutcome, ApiError> {
    if !status.is_success() {
        let parsed: LoginResponse = serde_json::from_str(body).unwrap_or_default();
        return Ok(LoginOutcome::Rejected {
            message: parsed
                .error
                .unwrap_or_else(|| "Invalid credentials".to_string()),
        });
    }

    let parsed: LoginResponse = serde_json::from_str(body)?;
    if parsed.requires_2fa {
        return Ok(LoginOutcome::TwoFactorRequired);
    }
    match (parsed.token, parsed.user) {
        (Some(token), Some(user)) => Ok(LoginOutcome::Success { token, user }),
        _ => Err(ApiError::MissingToken),
    }
}

/// Identifiers that can be spliced into a backend path as-is.
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api/v1", addr)
    }

    async fn mock_login(Json(body): Json<Value>) -> axum::response::Response {
        match body["email"].as_str() {
            Some("ok@river.io") => Json(json!({
                "token": "backend-token",
                "user": {"id": 1, "email": "ok@river.io", "role": "admin"}
            }))
            .into_response(),
            Some("totp@river.io") if body.get("totp_code").is_none() => {
                Json(json!({"requires_2fa": true})).into_response()
            }
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Wrong email or password"})),
            )
                .into_response(),
        }
    }

    async fn mock_components(
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> axum::response::Response {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer t") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!([
            {"id": 1, "component_name": format!("Sensor {}", id), "category_name": "Optics",
             "status": "ok"}
        ]))
        .into_response()
    }

    fn backend() -> Router {
        Router::new()
            .route("/api/v1/auth/login", post(mock_login))
            .route("/api/v1/devices/{id}/components", get(mock_components))
    }

    fn credentials<'a>(email: &'a str, totp_code: Option<&'a str>) -> LoginRequest<'a> {
        LoginRequest {
            email,
            password: "secret123",
            totp_code,
        }
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let client = ApiClient::new(&spawn_backend(backend()).await).unwrap();

        match client.login(&credentials("ok@river.io", None)).await.unwrap() {
            LoginOutcome::Success { token, user } => {
                assert_eq!(token, "backend-token");
                assert_eq!(user.role, Role::Admin);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert!(matches!(
            client.login(&credentials("totp@river.io", None)).await.unwrap(),
            LoginOutcome::TwoFactorRequired
        ));

        match client.login(&credentials("bad@river.io", None)).await.unwrap() {
            LoginOutcome::Rejected { message } => assert_eq!(message, "Wrong email or password"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&format!("http://{}/api/v1", addr)).unwrap();
        let result = client.login(&credentials("ok@river.io", None)).await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn test_device_components() {
        let client = ApiClient::new(&spawn_backend(backend()).await).unwrap();

        let records = client.device_components("t", "dev-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].component_name, "Sensor dev-1");

        assert!(matches!(
            client.device_components("stale", "dev-1").await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_is_safe_id() {
        assert!(is_safe_id("dev-1_A"));
        assert!(!is_safe_id("../admin"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id(&"a".repeat(65)));
    }

    #[test]
    fn test_classify_login_without_json_body() {
        let outcome = classify_login(StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap();
        assert!(
            matches!(outcome, LoginOutcome::Rejected { message } if message == "Invalid credentials")
        );
        assert!(matches!(
            classify_login(StatusCode::OK, "{}"),
            Err(ApiError::MissingToken)
        ));
    }
}
