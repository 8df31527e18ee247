//! Cover cache for edition thumbnails.
//!
//! Rendering a cover means downloading a whole PDF and rasterizing it, so
//! every cover is kept twice: in process memory for the session, and in a
//! [`DurableStore`] across sessions. The durable tier is a plain string
//! key-value store under keys `cover::<document path>`; it is never the
//! source of truth and can be deleted at any time.
//!
//! # Tiers
//! - **Memory**: every successfully rendered or loaded cover, for the life of
//!   the [`CoverCache`].
//! - **Durable**: [`SqliteStore`] in production, [`MemoryStore`] for tests and
//!   ephemeral sessions. Only covers below the admission threshold are
//!   written; oversized covers would crowd out the rest.

mod cache;
mod db;
pub mod error;
mod store;

pub use crate::cache::{CoverCache, DEFAULT_ADMISSION_THRESHOLD};
pub use crate::db::SqliteStore;
pub use crate::store::{DurableStore, MemoryStore};
use std::sync::Arc;

pub type DurableHandle = Arc<dyn DurableStore + Send + Sync>;
