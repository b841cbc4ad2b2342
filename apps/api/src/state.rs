use crate::generation::coordinator::{GenerationCoordinator, SharedConfigs, SharedRecords};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Record store; the in-memory copy is authoritative after startup.
    pub records: SharedRecords,
    pub configs: SharedConfigs,
    /// Holds its own handles to both stores plus the generation client.
    pub coordinator: GenerationCoordinator,
}
