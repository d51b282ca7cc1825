//! Archive backends for receipt files: a local directory or an
//! S3-compatible bucket.

mod key;
mod local;
mod s3;

pub use key::{extension, object_key, sanitize_merchant};
pub use local::{DEFAULT_DIRECTORY, LocalArchive};
pub use s3::{DEFAULT_REGION, S3Archive, S3ArchiveBuilder};
