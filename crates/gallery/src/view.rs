use crate::edition::Edition;
use crate::gallery::GalleryEvent;
use editions_render::Cover;
use std::collections::{HashMap, HashSet};

/// What the presentation layer should show in place of a cover.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverState {
    /// Never requested.
    Absent,
    /// Requested and not (yet) available; shown as a placeholder. A failed
    /// cover stays here until a later attempt succeeds.
    Pending,
    Ready(Cover),
}

/// Presentation-side state of the gallery, folded from [`GalleryEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct GalleryView {
    editions: Vec<Edition>,
    covers: HashMap<String, Cover>,
    requested: HashSet<String>,
    discovered: bool,
}

impl GalleryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &GalleryEvent) {
        match event {
            GalleryEvent::Started | GalleryEvent::Complete => {},
            GalleryEvent::Discovered(editions) => {
                self.editions = editions.clone();
                self.discovered = true;
            },
            GalleryEvent::CoverRequested(path) => {
                self.requested.insert(path.clone());
            },
            GalleryEvent::CoverReady { path, cover } => {
                self.covers.insert(path.clone(), cover.clone());
            },
            GalleryEvent::CoverFailed { .. } => {},
        }
    }

    /// All editions, newest first.
    pub fn editions(&self) -> &[Edition] {
        &self.editions
    }

    pub fn latest(&self) -> Option<&Edition> {
        self.editions.first()
    }

    /// Every edition but the latest.
    pub fn older(&self) -> &[Edition] {
        self.editions.get(1..).unwrap_or_default()
    }

    pub fn cover(&self, path: &str) -> CoverState {
        match (self.covers.get(path), self.requested.contains(path)) {
            (Some(cover), _) => CoverState::Ready(cover.clone()),
            (None, true) => CoverState::Pending,
            (None, false) => CoverState::Absent,
        }
    }

    /// Whether discovery has finished.
    pub fn discovered(&self) -> bool {
        self.discovered
    }

    /// `true` only once discovery has finished and found nothing; an
    /// undiscovered gallery is loading, not empty.
    pub fn is_empty(&self) -> bool {
        self.discovered && self.editions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edition::{DEFAULT_PUBLICATION, editions};

    fn cover(tag: &str) -> Cover {
        Cover::from(format!("data:image/jpeg;base64,{tag}"))
    }

    #[test]
    fn test_empty_only_after_discovery() {
        let mut view = GalleryView::new();
        assert!(!view.discovered());
        assert!(!view.is_empty());
        assert_eq!(view.latest(), None);
        view.apply(&GalleryEvent::Started);
        assert!(!view.is_empty());
        view.apply(&GalleryEvent::Discovered(vec![]));
        assert!(view.discovered());
        assert!(view.is_empty());
        assert!(view.older().is_empty());
    }

    #[test]
    fn test_latest_and_older() {
        let mut view = GalleryView::new();
        let files = ["Edition 9.pdf", "Edition 7_.pdf", "Edition 5.pdf"];
        view.apply(&GalleryEvent::Discovered(editions(files, DEFAULT_PUBLICATION)));
        assert_eq!(view.latest().map(|e| e.id), Some(9));
        let older: Vec<u32> = view.older().iter().map(|e| e.id).collect();
        assert_eq!(older, [7, 5]);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_single_edition_has_no_older() {
        let mut view = GalleryView::new();
        view.apply(&GalleryEvent::Discovered(editions(["Edition 9.pdf"], DEFAULT_PUBLICATION)));
        assert_eq!(view.latest().map(|e| e.id), Some(9));
        assert!(view.older().is_empty());
    }

    #[test]
    fn test_cover_states() {
        let mut view = GalleryView::new();
        let (nine, eight) = ("/docs/Edition%209.pdf", "/docs/Edition%208.pdf");
        assert_eq!(view.cover(nine), CoverState::Absent);
        view.apply(&GalleryEvent::CoverRequested(nine.to_string()));
        view.apply(&GalleryEvent::CoverRequested(eight.to_string()));
        assert_eq!(view.cover(nine), CoverState::Pending);
        view.apply(&GalleryEvent::CoverReady { path: nine.to_string(), cover: cover("NINE") });
        view.apply(&GalleryEvent::CoverFailed { path: eight.to_string(), reason: "corrupt".to_string() });
        assert_eq!(view.cover(nine), CoverState::Ready(cover("NINE")));
        assert_eq!(view.cover(eight), CoverState::Pending);

        // A later success replaces the placeholder.
        view.apply(&GalleryEvent::CoverRequested(eight.to_string()));
        view.apply(&GalleryEvent::CoverReady { path: eight.to_string(), cover: cover("EIGHT") });
        assert_eq!(view.cover(eight), CoverState::Ready(cover("EIGHT")));
    }
}
