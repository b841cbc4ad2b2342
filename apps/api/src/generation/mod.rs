// Cover letter generation: prompt assembly, per-record transactions and the
// coordinator that folds results back into the record and config stores.
// All service calls go through llm_client::GenerationClient.

pub mod coordinator;
pub mod handlers;
pub mod prompts;
pub mod transaction;
