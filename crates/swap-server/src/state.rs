use std::sync::Arc;

use swap_match::Matcher;
use swap_store::RequestStore;

/// Shared handles passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    pub matcher: Arc<Matcher>,
}

impl AppState {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        let matcher = Arc::new(Matcher::new(Arc::clone(&store)));
        Self { store, matcher }
    }
}
