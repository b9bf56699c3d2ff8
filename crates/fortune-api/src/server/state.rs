//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::store::FortuneStore;

/// Application state shared across all request handlers.
///
/// Cloned per request; the store handle is the only shared resource.
#[derive(Clone)]
pub struct AppState {
    /// Gateway to the fortune table.
    pub store: Arc<dyn FortuneStore>,
}

impl AppState {
    /// Create a new [`AppState`] around `store`.
    pub fn new(store: Arc<dyn FortuneStore>) -> Self {
        Self { store }
    }
}
