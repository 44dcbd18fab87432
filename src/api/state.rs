use std::sync::Arc;

use crate::analytics::AnalyticsContext;
use crate::cache::{InvalidationSender, ResultCache};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<ResultCache>,
    pub invalidation: InvalidationSender,
}

impl AppState {
    pub fn analytics(&self) -> AnalyticsContext {
        AnalyticsContext::new(self.store.clone(), self.cache.clone())
    }
}
