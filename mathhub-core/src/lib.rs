//! Mock reference-resolution engine for flat, id-linked datasets.
//!
//! This crate takes a dataset of shallowly-linked records (entities
//! referencing each other only by identifier) and materializes fully
//! populated, strongly typed object graphs on demand:
//!
//! - The dataset is supplied wholesale by an async loader and memoized
//!   with single-flight semantics: concurrent queries share one load.
//! - Shallow references (kind, id, display fields, one parent level)
//!   are built cheaply for listings and parent chains.
//! - Full materialization resolves parent chains and, for containers,
//!   merges heterogeneous narrative children (opaque blocks,
//!   sub-documents, declared modules) into one collection.
//! - Dangling references, unknown kinds, and structural
//!   inconsistencies degrade into structured warnings instead of
//!   failing a whole query; only load failures and top-level
//!   not-found conditions surface as errors.
//!
//! # Quick Start
//!
//! ```ignore
//! use mathhub_core::MockClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MockClient::from_json_file("assets/mock.json");
//!
//!     let archive = client.get_archive("MMT/examples").await?;
//!     println!("{}", archive.value.narrative_root.reference.name);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod dataset;
pub mod entities;
pub mod error;
pub mod loader;
pub mod refs;
pub mod testing;

mod resolve;

// Primary public API
pub use client::{ClientConfig, MockClient};
pub use dataset::{DataSet, Kind, VersionInfo};
pub use error::{Error, LoadError, Resolved, Warning};
pub use loader::{json_file_loader, loader_fn, static_loader, DatasetLoader};
pub use resolve::ParentProbePolicy;
