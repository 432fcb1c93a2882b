//! Tour progress: completion/skip records per page, cached for the session
//! and persisted through the remote progress API.

pub mod api;
pub mod model;
pub mod routes;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpProgressApi, ProgressApi};
pub use model::{ProgressEntry, ProgressEvent, ProgressMap, ProgressPatch};
pub use routes::{ProgressBackend, progress_routes};
pub use store::{LoadOutcome, LoadState, ProgressStore};
