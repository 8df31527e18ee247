//! The edition gallery: which editions exist, in what order, and their
//! covers.
//!
//! The [`Resolver`] discovers edition files once (manifest first, filename
//! probing otherwise). The [`Gallery`] turns them into sorted [`Edition`]s and
//! streams [`GalleryEvent`]s as covers arrive from the cover cache, which the
//! presentation layer folds into a [`GalleryView`].

mod edition;
pub mod error;
mod exclude;
mod gallery;
mod resolve;
mod view;

pub use crate::edition::{DEFAULT_PUBLICATION, Edition, editions, parse_id};
pub use crate::exclude::{EDITION_FOUR, ExclusionRule};
pub use crate::gallery::{DEFAULT_CONCURRENCY, Gallery, GalleryEvent};
pub use crate::resolve::{DEFAULT_CANDIDATES, DEFAULT_MANIFEST, Discovery, Resolver, Source, variants};
pub use crate::view::{CoverState, GalleryView};
