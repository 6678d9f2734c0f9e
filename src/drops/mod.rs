/// Drop domain: the durable unit of content pairing an uploaded image
/// with a resolved geographic location.

pub mod models;
pub mod query;
pub mod service;

pub use models::{Confidence, Drop, ResolvedLocation};
pub use query::DropQueryService;
pub use service::{DropService, UploadRequest};
