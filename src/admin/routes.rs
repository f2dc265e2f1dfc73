use std::sync::Arc;

use askama::Template;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use super::session::DashboardSession;
use super::throttle::ThrottleView;
use super::validation::validate_login;
use crate::api::client::{ApiError, LoginOutcome, LoginRequest};
use crate::api::models::{Device, User};
use crate::components::view::ComponentView;
use crate::events;
use crate::state::AppState;

const CLIENT_COOKIE: &str = "client";
const SESSION_COOKIE: &str = "session";
const CLIENT_COOKIE_MAX_AGE: u64 = 400 * 24 * 3600;

// Templates

#[derive(Template, Default)]
#[template(path = "login.html")]
struct LoginTemplate {
    email: String,
    error: Option<String>,
    info: Option<String>,
    lockout_seconds: Option<u64>,
    remaining_attempts: Option<u32>,
    show_totp: bool,
}

impl LoginTemplate {
    fn for_view(view: ThrottleView) -> Self {
        match view {
            ThrottleView::Open { remaining_attempts } => LoginTemplate {
                remaining_attempts,
                ..Default::default()
            },
            ThrottleView::Locked { seconds_left } => LoginTemplate {
                lockout_seconds: Some(seconds_left),
                ..Default::default()
            },
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    user: User,
    devices: Vec<Device>,
    error: Option<String>,
}

// Form structs

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
    #[serde(default)]
    totp_code: Option<String>,
}

// Cookie helpers

pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    headers
        .get(COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()).map(|v| v.to_string()))
        .filter(|v| !v.is_empty())
}

pub fn get_session_token(headers: &HeaderMap) -> Option<String> {
    get_cookie(headers, SESSION_COOKIE)
}

/// The browser's client id, or a fresh one when the cookie is missing or forged.
fn client_id(headers: &HeaderMap) -> (String, bool) {
    match get_cookie(headers, CLIENT_COOKIE).filter(|id| uuid::Uuid::parse_str(id).is_ok()) {
        Some(id) => (id, false),
        None => (uuid::Uuid::new_v4().to_string(), true),
    }
}

fn client_cookie(id: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        CLIENT_COOKIE, id, CLIENT_COOKIE_MAX_AGE
    )
}

fn set_session_cookie(token: &str) -> String {
    format!("{}={}; HttpOnly; SameSite=Strict; Path=/", SESSION_COOKIE, token)
}

fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", SESSION_COOKIE)
}

fn append_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid cookie header: {}", e),
    }
}

fn render_login(
    status: StatusCode,
    template: LoginTemplate,
    client: &(String, bool),
) -> Response {
    let html = template.render().unwrap_or_default();
    let mut response = (status, Html(html)).into_response();
    if client.1 {
        append_cookie(&mut response, &client_cookie(&client.0));
    }
    response
}

// Handlers

pub async fn root(headers: HeaderMap) -> Redirect {
    if get_session_token(&headers).is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

pub async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let client = client_id(&headers);
    let view = state.throttles.lock().await.view(&client.0);
    render_login(StatusCode::OK, LoginTemplate::for_view(view), &client)
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let client = client_id(&headers);

    // Locked clients are turned away before anything reaches the backend.
    let view = state.throttles.lock().await.view(&client.0);
    if let ThrottleView::Locked { .. } = view {
        tracing::info!("Login rejected during lockout");
        let template = LoginTemplate {
            email: form.email,
            error: Some("Too many failed attempts. Please wait before trying again.".into()),
            ..LoginTemplate::for_view(view)
        };
        return render_login(StatusCode::FORBIDDEN, template, &client);
    }

    let credentials = match validate_login(&form.email, &form.password, form.totp_code.as_deref())
    {
        Ok(c) => c,
        Err(message) => {
            let view = state.throttles.lock().await.view(&client.0);
            let template = LoginTemplate {
                email: form.email,
                error: Some(message.into()),
                ..LoginTemplate::for_view(view)
            };
            return render_login(StatusCode::BAD_REQUEST, template, &client);
        }
    };

    let request = LoginRequest {
        email: &credentials.email,
        password: &credentials.password,
        totp_code: credentials.totp_code.as_deref(),
    };
    let outcome = state.api.login(&request).await;

    let mut throttles = state.throttles.lock().await;
    match outcome {
        Ok(LoginOutcome::Success { token, user }) => {
            throttles.record_success(&client.0);
            drop(throttles);

            tracing::info!(user = %user.email, "Dashboard login");
            let view = ComponentView::new(state.visibility, state.clock.clone());
            let session = DashboardSession::new(token, user, view);
            let session_token = state.sessions.lock().await.create(session);

            let mut response = Redirect::to("/dashboard").into_response();
            append_cookie(&mut response, &set_session_cookie(&session_token));
            if client.1 {
                append_cookie(&mut response, &client_cookie(&client.0));
            }
            response
        }
        Ok(LoginOutcome::TwoFactorRequired) => {
            // Neither a success nor a failure: the attempt count is left as is.
            let template = LoginTemplate {
                email: credentials.email,
                info: Some("Enter the code from your authenticator app".into()),
                show_totp: true,
                ..LoginTemplate::for_view(throttles.view(&client.0))
            };
            render_login(StatusCode::OK, template, &client)
        }
        Ok(LoginOutcome::Rejected { message }) => {
            let guard = throttles.guard(&client.0);
            guard.record_failure();
            tracing::info!(attempts = guard.attempts(), "Dashboard login rejected");
            let template = LoginTemplate {
                email: credentials.email,
                error: Some(message),
                show_totp: credentials.totp_code.is_some(),
                ..LoginTemplate::for_view(guard.view())
            };
            render_login(StatusCode::UNAUTHORIZED, template, &client)
        }
        Err(e) => {
            tracing::warn!("Login request failed: {}", e);
            let guard = throttles.guard(&client.0);
            guard.record_failure();
            let template = LoginTemplate {
                email: credentials.email,
                error: Some(login_error_message(&e).into()),
                ..LoginTemplate::for_view(guard.view())
            };
            render_login(StatusCode::BAD_GATEWAY, template, &client)
        }
    }
}

pub(crate) const UNREACHABLE_MESSAGE: &str =
    "Could not reach the monitoring server. Check your connection and try again.";
pub(crate) const BAD_RESPONSE_MESSAGE: &str =
    "The monitoring server sent an unexpected response. Please try again.";

fn login_error_message(error: &ApiError) -> &'static str {
    match error {
        ApiError::Transport(_) => UNREACHABLE_MESSAGE,
        _ => BAD_RESPONSE_MESSAGE,
    }
}

/// Live lockout countdown for the login screen. Clients with nothing tracked
/// get 204, which tells the browser not to reconnect.
pub async fn lockout_events(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(client) = get_cookie(&headers, CLIENT_COOKIE) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    if uuid::Uuid::parse_str(&client).is_err() {
        return StatusCode::NO_CONTENT.into_response();
    }
    match state.throttles.lock().await.subscribe(&client) {
        Some(updates) => events::json_events(events::watch_values(updates)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = get_session_token(&headers) {
        state.sessions.lock().await.remove(&token);
    }
    let mut response = Redirect::to("/login").into_response();
    append_cookie(&mut response, &clear_session_cookie());
    response
}

pub async fn dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(token) = get_session_token(&headers) else {
        return Redirect::to("/login").into_response();
    };
    let (api_token, user) = match state.sessions.lock().await.get(&token) {
        Some(s) => (s.api_token.clone(), s.user.clone()),
        None => return Redirect::to("/login").into_response(),
    };

    let (devices, error) = match state.api.list_devices(&api_token, user.role).await {
        Ok(devices) => (devices, None),
        Err(ApiError::Unauthorized) => return expire_session(&state, &token).await,
        Err(e) => {
            tracing::warn!("Failed to load devices: {}", e);
            (Vec::new(), Some("Could not load devices".to_string()))
        }
    };

    let html = DashboardTemplate {
        user,
        devices,
        error,
    }
    .render()
    .unwrap_or_default();
    Html(html).into_response()
}

/// Drops a session the backend no longer honours and sends the user back to login.
pub async fn expire_session(state: &AppState, token: &str) -> Response {
    state.sessions.lock().await.remove(token);
    let mut response = Redirect::to("/login").into_response();
    append_cookie(&mut response, &clear_session_cookie());
    response
}
