pub mod middleware;
pub mod snippets;
pub mod users;

use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Datelike, Utc};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_sessions::{Session, SessionManagerLayer, SessionStore};

use crate::error::AppError;
use crate::state::AppState;
use crate::templates::TemplateData;
use crate::web::middleware::{CsrfToken, FLASH_KEY};

/// GET /ping -- liveness probe
async fn ping() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Assembles the fields every page render needs: one-shot flash
/// (taking it consumes it), authentication state, and the CSRF token
/// for embedded forms.
pub(crate) async fn base_template_data(
    session: &Session,
    csrf: &CsrfToken,
    is_authenticated: bool,
) -> Result<TemplateData, AppError> {
    Ok(TemplateData {
        current_year: Utc::now().year(),
        flash: session.remove::<String>(FLASH_KEY).await?,
        is_authenticated,
        csrf_token: csrf.0.clone(),
        ..TemplateData::default()
    })
}

/// Builds the full application router.
///
/// The filter order is fixed: panic recovery wraps logging wraps
/// security headers around everything; dynamic routes additionally get
/// session load/save, then the CSRF check, then authentication-state
/// injection (axum runs the last-added layer outermost). Protected
/// routes keep a per-route authentication requirement inside all of
/// that.
pub fn build_router<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let static_dir = state.config.static_dir.clone();
    let state = Arc::new(state);

    let protected = Router::new()
        .route(
            "/snippet/create",
            get(snippets::create_form).post(snippets::create_submit),
        )
        .route("/user/logout", post(users::logout))
        .route_layer(from_fn(middleware::require_authentication));

    let dynamic = Router::new()
        .route("/", get(snippets::home))
        .route("/snippet/view/{id}", get(snippets::view))
        .route(
            "/user/signup",
            get(users::signup_form).post(users::signup_submit),
        )
        .route(
            "/user/login",
            get(users::login_form).post(users::login_submit),
        )
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(from_fn_with_state(state.clone(), middleware::csrf_protect))
        .layer(sessions);

    Router::new()
        .merge(dynamic)
        .route("/ping", get(ping))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::log_requests))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .with_state(state)
}
