use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use kladde_common::{validate, Validator};
use kladde_db::StoreError;

use crate::error::AppError;
use crate::state::AppState;
use crate::web::base_template_data;
use crate::web::middleware::{AuthState, CsrfToken, FLASH_KEY};

/// Field mapping for the create form; names match the form's `name`
/// attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expires: i32,
    #[serde(skip_deserializing, default)]
    pub errors: Validator,
}

/// GET / -- list the latest snippets
#[tracing::instrument(skip_all)]
pub async fn home(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, AppError> {
    let snippets = state.snippets.latest().await?;

    let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
    data.snippets = snippets;

    state.templates.render_response("home.html", StatusCode::OK, &data)
}

/// GET /snippet/view/{id} -- show one snippet
///
/// A non-numeric or sub-1 id is answered exactly like a missing row.
#[tracing::instrument(skip_all)]
pub async fn view(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let snippet_id: i64 = id
        .parse()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(AppError::NotFound)?;

    let snippet = match state.snippets.get(snippet_id).await {
        Ok(snippet) => snippet,
        Err(StoreError::NoRecord) => return Err(AppError::NotFound),
        Err(err) => return Err(err.into()),
    };

    let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
    data.snippet = Some(snippet);

    state.templates.render_response("view.html", StatusCode::OK, &data)
}

/// GET /snippet/create -- show the create form
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, AppError> {
    let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
    data.form = Some(serde_json::to_value(SnippetForm {
        title: String::new(),
        content: String::new(),
        expires: 365,
        errors: Validator::default(),
    })?);

    state.templates.render_response("create.html", StatusCode::OK, &data)
}

/// POST /snippet/create -- validate and store a snippet
#[tracing::instrument(skip_all)]
pub async fn create_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
    form: Result<Form<SnippetForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(|_| AppError::BadRequest)?;

    form.errors.check_field(
        validate::not_blank(&form.title),
        "title",
        "This field cannot be blank",
    );
    form.errors.check_field(
        validate::max_chars(&form.title, 100),
        "title",
        "This field cannot be more than 100 characters long",
    );
    form.errors.check_field(
        validate::not_blank(&form.content),
        "content",
        "This field cannot be blank",
    );
    form.errors.check_field(
        validate::permitted_value(&form.expires, &[1, 7, 365]),
        "expires",
        "This field must equal 1, 7 or 365",
    );

    if !form.errors.valid() {
        let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
        data.form = Some(serde_json::to_value(&form)?);
        return state.templates.render_response(
            "create.html",
            StatusCode::UNPROCESSABLE_ENTITY,
            &data,
        );
    }

    let snippet_id = state
        .snippets
        .insert(&form.title, &form.content, form.expires)
        .await?;

    session.insert(FLASH_KEY, "Snippet successfully created!").await?;

    Ok(Redirect::to(&format!("/snippet/view/{snippet_id}")).into_response())
}
