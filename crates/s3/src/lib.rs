//! gsw-s3: S3 SDK adapter for the gsw Google Cloud Storage wrapper
//!
//! This crate provides the implementation of the ObjectStore trait
//! using the aws-sdk-s3 crate against an S3-interoperable endpoint
//! (Google Cloud Storage by default). It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;

pub use client::S3Client;
