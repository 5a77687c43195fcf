//! Shared application state

use std::sync::Arc;

use super::api::{build_schema, QuerySchema};
use crate::service::StatsService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Stats service the query handlers read from
    pub stats: Arc<StatsService>,
    /// Query schema, built once
    pub schema: QuerySchema,
}

impl AppState {
    /// Create new app state
    pub fn new(stats: Arc<StatsService>) -> Self {
        Self {
            stats,
            schema: build_schema(),
        }
    }
}
