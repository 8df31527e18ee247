//! Read-only access to the static host that serves edition PDFs.
//!
//! Storage backends speak to a concrete host (HTTP, a local directory, or an
//! in-memory map for tests) and report every failure as an error. The
//! [`DocumentStore`] client sits on top and is what the rest of the workspace
//! uses: it turns "does this file exist" into a plain boolean and knows how
//! to build the canonical [`Document`] path used as a cache key.

pub mod backend;
mod client;
mod document;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::client::DocumentStore;
pub use crate::document::Document;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
