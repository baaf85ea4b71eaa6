//! Object storage browsing for kubeapps.
//!
//! [`ObjectStore`] is the port used by the HTTP layer; [`S3ObjectStore`] implements it
//! with `aws-sdk-s3`.

pub mod s3;
pub mod store;

pub use s3::S3ObjectStore;
pub use store::{
    format_bytes, BucketSummary, ObjectListing, ObjectStore, ObjectSummary, StorageError,
    MAX_LIST_KEYS,
};
