use std::sync::Arc;
use style_predict::ServingContext;

/// Read-only context shared by every request.
pub type AppState = Arc<ServingContext>;
