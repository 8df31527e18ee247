use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::{Regex, RegexBuilder};

/// Matches filenames of edition 4 however they are spaced or cased, without
/// catching editions 40-49.
pub const EDITION_FOUR: &str = r"edition\s*4(?:\D|$)";

/// Filenames that must never be shown, as case-insensitive patterns.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    patterns: Vec<Regex>,
}

impl ExclusionRule {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    /// A rule that excludes nothing.
    pub fn none() -> Self {
        Self { patterns: Vec::new() }
    }

    pub fn is_excluded(&self, file: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(file))
    }
}

impl Default for ExclusionRule {
    fn default() -> Self {
        // The default pattern is a constant known to compile.
        Self::new([EDITION_FOUR]).unwrap_or_else(|_| Self::none())
    }
}
