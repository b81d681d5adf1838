//! gsw-core: Core library for the gsw Google Cloud Storage wrapper
//!
//! This crate provides gsutil-compatible operations over a mixed address
//! space of local paths and `gs://` object locations, including:
//! - Address classification and trailing-separator aware path algebra
//! - gsutil-ordered listings
//! - Copy destination planning and a bounded batch executor
//! - POSIX metadata round-tripping and integrity checks
//! - Configuration management
//!
//! This crate is designed to be independent of any specific storage SDK;
//! the network side is reached through the [`ObjectStore`] trait.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod integrity;
pub mod listing;
pub mod local;
pub mod location;
pub mod memory;
pub mod metadata;
pub mod path;
pub mod planner;
pub mod traits;

pub use client::{BlobStat, Client};
pub use config::{Config, ConfigManager, StorageConfig};
pub use error::{Error, Result};
pub use executor::{BatchExecutor, ExecutorConfig};
pub use listing::ListingEntry;
pub use location::{ResourceLocation, classify};
pub use memory::MemoryStore;
pub use metadata::PosixMetadata;
pub use path::PathState;
pub use planner::{CopyOptions, CopyPlanEntry, CopyReport};
pub use traits::{ListResult, ObjectInfo, ObjectStore};
