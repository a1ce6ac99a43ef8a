use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use bytes::Bytes;
use http_body_util::Full;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::Session;

use crate::auth::generate_csrf_token;
use crate::error::AppError;
use crate::state::AppState;

/// Session key holding the authenticated user's id.
pub const AUTH_USER_ID_KEY: &str = "authenticatedUserID";

/// Session key holding the one-shot confirmation message.
pub const FLASH_KEY: &str = "flash";

/// Cookie and form field carrying the CSRF double-submit token.
const CSRF_COOKIE: &str = "csrf_token";
const CSRF_FIELD: &str = "csrf_token";

/// Largest form body the CSRF check will buffer.
const MAX_FORM_BYTES: usize = 1 << 20;

/// Request extension describing the request's authentication state.
/// Always inserted by [`authenticate`]; `user_id` is set only after the
/// session's id was re-checked against the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthState {
    pub user_id: Option<i64>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Request extension carrying the CSRF token handlers embed into forms.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

/// Logs one line per request before handing it on.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        ip = %remote,
        proto = ?req.version(),
        method = %req.method(),
        uri = %req.uri(),
        "received request"
    );

    next.run(req).await
}

/// Sets the fixed security header set on every response.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
        ),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    response
}

/// Double-submit cookie CSRF protection.
///
/// Issues a per-session token cookie when absent. State-changing
/// methods must echo the token in a `csrf_token` form field; the body
/// is buffered for the comparison and handed to the handler untouched.
/// Mismatch or a missing token rejects the request before any handler
/// runs. Safe methods are never checked.
pub async fn csrf_protect(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let existing = cookie_value(req.headers(), CSRF_COOKIE);
    let issue_cookie = existing.is_none();
    let token = existing.unwrap_or_else(generate_csrf_token);

    let req = if safe_method(req.method()) {
        let mut req = req;
        req.extensions_mut().insert(CsrfToken(token.clone()));
        req
    } else {
        if issue_cookie {
            // No cookie yet means nothing the form field could match.
            return Err(AppError::BadRequest);
        }
        let (mut parts, body) = req.into_parts();
        let bytes = to_bytes(body, MAX_FORM_BYTES)
            .await
            .map_err(|_| AppError::BadRequest)?;
        let fields: Vec<(String, String)> =
            serde_urlencoded::from_bytes(&bytes).map_err(|_| AppError::BadRequest)?;
        let submitted = fields
            .iter()
            .find(|(name, _)| name == CSRF_FIELD)
            .map(|(_, value)| value.as_str());
        if submitted != Some(token.as_str()) {
            return Err(AppError::BadRequest);
        }
        parts.extensions.insert(CsrfToken(token.clone()));
        Request::from_parts(parts, Body::from(bytes))
    };

    let mut response = next.run(req).await;

    if issue_cookie {
        let mut cookie = format!("{CSRF_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
        if state.config.session.secure {
            cookie.push_str("; Secure");
        }
        response
            .headers_mut()
            .append(header::SET_COOKIE, HeaderValue::from_str(&cookie)?);
    }

    Ok(response)
}

/// Marks the request authenticated when the session's user id still
/// exists in the store. A stale id (account deleted since login) is
/// dropped from the session so it degrades to a clean anonymous one.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut auth = AuthState::default();
    if let Some(user_id) = session.get::<i64>(AUTH_USER_ID_KEY).await? {
        if state.users.exists(user_id).await? {
            auth.user_id = Some(user_id);
        } else {
            session.remove::<i64>(AUTH_USER_ID_KEY).await?;
        }
    }
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Redirects anonymous requests to the login page without invoking the
/// inner chain; authenticated responses are marked uncacheable.
pub async fn require_authentication(req: Request, next: Next) -> Response {
    let authenticated = req
        .extensions()
        .get::<AuthState>()
        .is_some_and(AuthState::is_authenticated);
    if !authenticated {
        return Redirect::to("/user/login").into_response();
    }

    let mut response = next.run(req).await;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

/// Converts an escaped panic into a generic server error and marks the
/// connection for closure; the serving loop keeps running.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::http::Response<Full<Bytes>> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "recovered from panic while serving request");

    axum::http::Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONNECTION, "close")
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::from("Internal Server Error"))
        .expect("panic response is built from constants")
}

fn safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                cookie
                    .trim()
                    .strip_prefix(&format!("{name}="))
                    .map(|value| value.to_string())
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_methods() {
        assert!(safe_method(&Method::GET));
        assert!(safe_method(&Method::HEAD));
        assert!(safe_method(&Method::OPTIONS));
        assert!(!safe_method(&Method::POST));
        assert!(!safe_method(&Method::PUT));
        assert!(!safe_method(&Method::DELETE));
    }

    #[test]
    fn test_cookie_value_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("id=abc123; csrf_token=deadbeef; theme=dark"),
        );
        assert_eq!(
            cookie_value(&headers, "csrf_token").as_deref(),
            Some("deadbeef")
        );
        assert_eq!(cookie_value(&headers, "id").as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_no_header() {
        let headers = HeaderMap::new();
        assert_eq!(cookie_value(&headers, "csrf_token"), None);
    }

    #[test]
    fn test_cookie_value_does_not_match_suffix_names() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("x_csrf_token=wrong"),
        );
        assert_eq!(cookie_value(&headers, "csrf_token"), None);
    }
}
