//! Router and handlers for the shared listener.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use hotswap_common::constants::{SESSION_HEADER, STATUS_JSON_PATH, STATUS_PATH, UPDATE_PATH};
use hotswap_runtime::coordinator::Controller;
use hotswap_runtime::embedded::EmbeddedHost;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct SurfaceState {
    /// The controller driving redeploys.
    pub controller: Arc<Controller>,
    /// The host serving deployed units' traffic.
    pub host: Arc<EmbeddedHost>,
}

/// Builds the router for the shared listener: status page, JSON status,
/// update trigger, and application traffic under mounted context paths.
#[must_use]
pub fn router(controller: Arc<Controller>, host: Arc<EmbeddedHost>) -> Router {
    let state = SurfaceState { controller, host };
    Router::new()
        .route(STATUS_PATH, get(status_page))
        .route(STATUS_JSON_PATH, get(status_json))
        .route(UPDATE_PATH, get(update))
        .fallback(app_request)
        .with_state(state)
}

/// `GET /` — HTML table of every record's coordinates and state.
async fn status_page(State(state): State<SurfaceState>) -> Html<String> {
    Html(render_status_page(&state.controller))
}

/// `GET /status.json` — machine-readable status rows.
async fn status_json(
    State(state): State<SurfaceState>,
) -> Json<Vec<hotswap_runtime::registry::AppStatus>> {
    Json(state.controller.registry().status())
}

/// `GET /update` — kicks off a resolve-and-redeploy round and redirects
/// back to the status page. The round runs on its own task; clients poll
/// the status page for progress.
async fn update(State(state): State<SurfaceState>) -> Redirect {
    tracing::info!("update triggered from the control surface");
    let controller = Arc::clone(&state.controller);
    let _ = tokio::spawn(async move {
        controller.redeploy_all().await;
    });
    Redirect::to(STATUS_PATH)
}

/// Fallback — routes `/{context}/{resource}` into the embedded host,
/// 404 for everything else.
async fn app_request(
    State(state): State<SurfaceState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().trim_start_matches('/');
    let (context_path, resource) = match path.split_once('/') {
        Some((context, rest)) => (context, if rest.is_empty() { "index.html" } else { rest }),
        None => (path, "index.html"),
    };
    if context_path.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok());
    let Some(served) = state.host.serve(context_path, resource, session_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut response = (
        [(header::CONTENT_TYPE, content_type(resource))],
        served.content,
    )
        .into_response();
    if let Some(minted) = served.minted_session {
        if let Ok(value) = HeaderValue::from_str(&minted) {
            let _ = response
                .headers_mut()
                .insert(HeaderName::from_static(SESSION_HEADER), value);
        }
    }
    response
}

/// Renders the operator-facing status table.
fn render_status_page(controller: &Controller) -> String {
    use std::fmt::Write as _;

    let mut html = String::new();
    let _ = writeln!(html, "<html><body><table border=1>");
    let _ = writeln!(
        html,
        "<tr><th>Context</th><th>Artifact</th><th>Deployed</th>\
         <th>Available</th><th>Deps</th><th>State</th></tr>"
    );
    for row in controller.registry().status() {
        let _ = writeln!(
            html,
            "<tr><td><a href='/{path}/'>{path}</a></td><td>{coordinate}</td>\
             <td>{deployed}</td><td>{available}</td><td>{deps}</td><td>{state}{note}</td></tr>",
            path = row.context_path,
            coordinate = row.coordinate,
            deployed = row.deployed_version.as_deref().unwrap_or("-"),
            available = row.resolved_version.as_deref().unwrap_or("-"),
            deps = row.dependency_count,
            state = row.state,
            note = row
                .resolution_error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default(),
        );
    }
    let _ = writeln!(html, "</table>");
    let _ = writeln!(html, "<a href='{UPDATE_PATH}'>Update all</a>");
    let _ = writeln!(html, "</body></html>");
    html
}

/// Minimal content-type guess from the resource extension.
fn content_type(resource: &str) -> &'static str {
    match resource.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
