mod blob_id;
mod error;
mod traits;

pub mod filesystem;

pub use blob_id::BlobId;
pub use error::StorageError;
pub use traits::{BlobStore, BoxReader};

/// Maximum size of a stored content blob: 200 MiB.
pub const MAX_CONTENT_SIZE: u64 = 200 * 1024 * 1024;
