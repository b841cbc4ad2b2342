// Record store: schema validation, ingestion, index assignment and the
// merge pipeline that folds generation results back into records.

pub mod error;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod schema;
pub mod store;
