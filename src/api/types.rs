//! Shared types for the query API.

use std::sync::Arc;

use crate::analytics::AnalyticsEngine;
use crate::store::RecordStore;

/// Header carrying the caller's identity, set by the upstream auth layer.
pub const USER_HEADER: &str = "X-User-Id";

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub engine: Arc<AnalyticsEngine>,
    pub store: Arc<dyn RecordStore>,
}

impl ApiContext {
    pub fn new(engine: Arc<AnalyticsEngine>, store: Arc<dyn RecordStore>) -> Self {
        Self { engine, store }
    }
}

/// Current user, injected into request extensions by the user middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}
