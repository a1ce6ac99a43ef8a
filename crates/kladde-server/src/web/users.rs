use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use kladde_common::validate::{self, EMAIL_RX};
use kladde_common::Validator;
use kladde_db::StoreError;

use crate::auth::{authenticate, hash_password, AuthError};
use crate::error::AppError;
use crate::state::AppState;
use crate::web::base_template_data;
use crate::web::middleware::{AuthState, CsrfToken, AUTH_USER_ID_KEY, FLASH_KEY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip_deserializing, default)]
    pub errors: Validator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip_deserializing, default)]
    pub errors: Validator,
}

/// GET /user/signup
pub async fn signup_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, AppError> {
    let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
    data.form = Some(serde_json::to_value(SignupForm {
        name: String::new(),
        email: String::new(),
        password: String::new(),
        errors: Validator::default(),
    })?);

    state.templates.render_response("signup.html", StatusCode::OK, &data)
}

/// POST /user/signup -- create an account
#[tracing::instrument(skip_all)]
pub async fn signup_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
    form: Result<Form<SignupForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(|_| AppError::BadRequest)?;

    form.errors.check_field(
        validate::not_blank(&form.name),
        "name",
        "This field cannot be blank",
    );
    form.errors.check_field(
        validate::not_blank(&form.email),
        "email",
        "This field cannot be blank",
    );
    form.errors.check_field(
        validate::matches(&form.email, &EMAIL_RX),
        "email",
        "This field must be a valid email address",
    );
    form.errors.check_field(
        validate::not_blank(&form.password),
        "password",
        "This field cannot be blank",
    );
    form.errors.check_field(
        validate::min_chars(&form.password, 8),
        "password",
        "This field must be at least 8 characters long",
    );

    if !form.errors.valid() {
        let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
        data.form = Some(serde_json::to_value(&form)?);
        return state.templates.render_response(
            "signup.html",
            StatusCode::UNPROCESSABLE_ENTITY,
            &data,
        );
    }

    let password_hash = hash_password(&form.password)?;

    match state.users.insert(&form.name, &form.email, &password_hash).await {
        Ok(()) => {}
        Err(StoreError::DuplicateEmail) => {
            form.errors.add_field_error("email", "Email address is already in use");
            let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
            data.form = Some(serde_json::to_value(&form)?);
            return state.templates.render_response(
                "signup.html",
                StatusCode::UNPROCESSABLE_ENTITY,
                &data,
            );
        }
        Err(err) => return Err(err.into()),
    }

    session
        .insert(FLASH_KEY, "Your signup was successful. Please log in.")
        .await?;

    Ok(Redirect::to("/user/login").into_response())
}

/// GET /user/login
pub async fn login_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, AppError> {
    let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
    data.form = Some(serde_json::to_value(LoginForm {
        email: String::new(),
        password: String::new(),
        errors: Validator::default(),
    })?);

    state.templates.render_response("login.html", StatusCode::OK, &data)
}

/// POST /user/login -- verify credentials and open a session
#[tracing::instrument(skip_all)]
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(csrf): Extension<CsrfToken>,
    Extension(auth): Extension<AuthState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(|_| AppError::BadRequest)?;

    form.errors.check_field(
        validate::not_blank(&form.email),
        "email",
        "This field cannot be blank",
    );
    form.errors.check_field(
        validate::matches(&form.email, &EMAIL_RX),
        "email",
        "This field must be a valid email address",
    );
    form.errors.check_field(
        validate::not_blank(&form.password),
        "password",
        "This field cannot be blank",
    );

    if !form.errors.valid() {
        let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
        data.form = Some(serde_json::to_value(&form)?);
        return state.templates.render_response(
            "login.html",
            StatusCode::UNPROCESSABLE_ENTITY,
            &data,
        );
    }

    let user_id = match authenticate(state.users.as_ref(), &form.email, &form.password).await {
        Ok(user_id) => user_id,
        Err(AuthError::InvalidCredentials) => {
            form.errors.add_non_field_error("Email or password is incorrect");
            let mut data = base_template_data(&session, &csrf, auth.is_authenticated()).await?;
            data.form = Some(serde_json::to_value(&form)?);
            return state.templates.render_response(
                "login.html",
                StatusCode::UNPROCESSABLE_ENTITY,
                &data,
            );
        }
        Err(err) => return Err(err.into()),
    };

    // Rotate the session id on the privilege change, then mark the
    // session authenticated.
    session.cycle_id().await?;
    session.insert(AUTH_USER_ID_KEY, user_id).await?;

    Ok(Redirect::to("/snippet/create").into_response())
}

/// POST /user/logout
#[tracing::instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Response, AppError> {
    session.cycle_id().await?;
    session.remove::<i64>(AUTH_USER_ID_KEY).await?;
    session
        .insert(FLASH_KEY, "You've been logged out successfully!")
        .await?;

    Ok(Redirect::to("/").into_response())
}
