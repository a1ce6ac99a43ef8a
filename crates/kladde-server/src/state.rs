use crate::config::ServerConfig;
use crate::templates::TemplateCache;
use kladde_db::{SnippetStore, UserStore};
use std::sync::Arc;

/// Shared application state
///
/// Every dependency a handler needs, constructed once at startup and
/// passed by reference into the router. The stores are trait objects so
/// tests can swap in the in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub snippets: Arc<dyn SnippetStore>,
    pub users: Arc<dyn UserStore>,
    pub templates: Arc<TemplateCache>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        templates: TemplateCache,
        config: ServerConfig,
    ) -> Self {
        Self {
            snippets,
            users,
            templates: Arc::new(templates),
            config: Arc::new(config),
        }
    }
}
