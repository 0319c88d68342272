use std::sync::Arc;

use p100_db::Database;
use p100_storage::Store;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub store: Store,
    /// Base URL public object URLs are composed against, e.g.
    /// `https://p100.example.com`.
    pub public_base: String,
}
