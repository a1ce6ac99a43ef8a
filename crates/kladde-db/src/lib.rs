pub mod error;
pub mod pool;
pub mod repos;

// Re-export commonly used items
pub use error::StoreError;
pub use pool::{create_pool, run_migrations};
pub use repos::mock::{MemorySnippetStore, MemoryUserStore};
pub use repos::snippet::{PgSnippetStore, Snippet, SnippetStore};
pub use repos::user::{PgUserStore, User, UserStore};
