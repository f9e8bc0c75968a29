//! Blob storage backends.
//!
//! The [`client::BlobStore`] trait abstracts over where blob bytes
//! physically live.  Implementations include an S3-compatible gateway
//! (MinIO et al.), local disk, and an in-memory map for tests.

pub mod client;
pub mod local;
pub mod memory;
pub mod s3;
