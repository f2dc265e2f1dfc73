use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use futures::{StreamExt, future};

use super::visibility::{ComponentList, VisibleComponent};
use crate::admin::routes::{expire_session, get_session_token};
use crate::api::client::{ApiError, is_safe_id};
use crate::error::AppError;
use crate::events;
use crate::state::AppState;

struct ComponentRow {
    id: String,
    name: String,
    category: String,
    status_label: &'static str,
    status_class: &'static str,
    notes: Option<String>,
    countdown: Option<String>,
}

impl From<&VisibleComponent> for ComponentRow {
    fn from(item: &VisibleComponent) -> Self {
        ComponentRow {
            id: item.record.id.clone(),
            name: item.record.component_name.clone(),
            category: item.record.category_name.clone(),
            status_label: item.record.status.label(),
            status_class: item.record.status.css_class(),
            notes: item.record.notes.clone(),
            countdown: item.countdown(),
        }
    }
}

#[derive(Template)]
#[template(path = "components.html")]
struct ComponentsTemplate {
    device_id: String,
    rows: Vec<ComponentRow>,
    live: bool,
    error: Option<String>,
}

impl ComponentsTemplate {
    fn new(device_id: &str, list: &ComponentList, live: bool) -> Self {
        ComponentsTemplate {
            device_id: device_id.to_string(),
            rows: list.items().iter().map(ComponentRow::from).collect(),
            live,
            error: None,
        }
    }
}

pub async fn device_components(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
) -> Result<Response, AppError> {
    if !is_safe_id(&device_id) {
        return Err(AppError::BadRequest(format!("Invalid device id: {}", device_id)));
    }
    let Some(token) = get_session_token(&headers) else {
        return Ok(Redirect::to("/login").into_response());
    };

    // Any countdown for a previously opened device stops before this fetch starts.
    let (ticket, api_token) = match state.sessions.lock().await.get_mut(&token) {
        Some(session) => (
            session.components.begin_load(&device_id),
            session.api_token.clone(),
        ),
        None => return Ok(Redirect::to("/login").into_response()),
    };

    let records = match state.api.device_components(&api_token, &device_id).await {
        Ok(records) => records,
        Err(ApiError::Unauthorized) => return Ok(expire_session(&state, &token).await),
        Err(e) => {
            tracing::warn!(device = %device_id, "Failed to load components: {}", e);
            let template = ComponentsTemplate {
                error: Some("Could not load components".to_string()),
                ..ComponentsTemplate::new(&device_id, &ComponentList::default(), false)
            };
            return Ok(Html(template.render()?).into_response());
        }
    };

    let installed = match state.sessions.lock().await.get_mut(&token) {
        Some(session) => session.components.finish_load(ticket, records.clone()),
        None => return Ok(Redirect::to("/login").into_response()),
    };

    let template = match installed {
        Some(list) => ComponentsTemplate::new(&device_id, &list, list.has_countdowns()),
        // Another device was opened meanwhile; show this one without a live timer.
        None => {
            let list = ComponentList::render(
                records,
                state.clock.now_ms(),
                state.visibility.window_ms(),
            );
            ComponentsTemplate::new(&device_id, &list, false)
        }
    };
    Ok(Html(template.render()?).into_response())
}

/// Countdown updates for the device list currently open in this session.
pub async fn component_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
) -> Result<Response, AppError> {
    let token = get_session_token(&headers).ok_or(AppError::Unauthorized("Not logged in"))?;
    let updates = state
        .sessions
        .lock()
        .await
        .get(&token)
        .map(|session| session.components.subscribe())
        .ok_or(AppError::Unauthorized("Not logged in"))?;

    let snapshots = events::watch_values(updates).filter(move |snapshot| {
        future::ready(snapshot.device_id.as_deref() == Some(device_id.as_str()))
    });
    Ok(events::json_events(snapshots).into_response())
}
