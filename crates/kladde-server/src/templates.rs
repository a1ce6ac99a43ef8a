use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::DateTime;
use minijinja::Environment;
use serde::Serialize;

use crate::error::AppError;
use kladde_db::Snippet;

/// Page bodies renderable by name. Each composes the base layout and
/// the shared partials with its own body at parse time.
const PAGES: &[(&str, &str)] = &[
    ("home.html", include_str!("../templates/pages/home.html")),
    ("view.html", include_str!("../templates/pages/view.html")),
    ("create.html", include_str!("../templates/pages/create.html")),
    ("signup.html", include_str!("../templates/pages/signup.html")),
    ("login.html", include_str!("../templates/pages/login.html")),
];

/// The data bundle handed to every page render.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    /// Page-specific form state (entered values + validation errors),
    /// absent on pages without a form.
    pub form: Option<serde_json::Value>,
}

/// All page templates, parsed once at startup and immutable afterwards.
pub struct TemplateCache {
    env: Environment<'static>,
}

impl TemplateCache {
    /// Parses every embedded template. Any syntax error aborts startup;
    /// the process must not serve traffic with a broken cache.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_filter("human_date", human_date);

        env.add_template("base.html", include_str!("../templates/base.html"))
            .context("Failed to parse base layout")?;
        env.add_template("partials/nav.html", include_str!("../templates/partials/nav.html"))
            .context("Failed to parse nav partial")?;
        for (name, source) in PAGES {
            env.add_template(name, source)
                .with_context(|| format!("Failed to parse page template {name}"))?;
        }

        Ok(Self { env })
    }

    /// Renders a page fully into memory. Asking for a page that was
    /// never registered is a programming error and surfaces as a
    /// server failure, not a 404.
    pub fn render(&self, page: &str, data: &TemplateData) -> Result<String> {
        let template = self
            .env
            .get_template(page)
            .with_context(|| format!("Template {page} does not exist in the cache"))?;
        let html = template
            .render(data)
            .with_context(|| format!("Failed to render {page}"))?;
        Ok(html)
    }

    /// Render buffered, then emit: the status line is only written once
    /// the whole body exists, so a late template error can never
    /// truncate a response.
    pub fn render_response(
        &self,
        page: &str,
        status: StatusCode,
        data: &TemplateData,
    ) -> Result<Response, AppError> {
        let html = self.render(page, data)?;
        Ok((status, Html(html)).into_response())
    }
}

/// `{{ value | human_date }}` -- formats an RFC 3339 timestamp like
/// "09 Mar 2024 at 14:30".
fn human_date(value: String) -> Result<String, minijinja::Error> {
    let parsed = DateTime::parse_from_rfc3339(&value).map_err(|err| {
        minijinja::Error::new(
            minijinja::ErrorKind::InvalidOperation,
            format!("human_date expects an RFC 3339 timestamp: {err}"),
        )
    })?;
    Ok(parsed.format("%d %b %Y at %H:%M").to_string())
}
