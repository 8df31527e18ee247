use std::fmt;

/// Publication name used in edition titles unless configured otherwise.
pub const DEFAULT_PUBLICATION: &str = "Transylvania Insights";

/// One issue of the publication, backed by a single PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    /// Edition number; `0` when the filename carries none.
    pub id: u32,
    /// Filename relative to the document prefix.
    pub file: String,
    pub title: String,
}

impl Edition {
    pub fn new(file: impl Into<String>, publication: &str) -> Self {
        let file = file.into();
        let id = parse_id(&file);
        Self { id, title: format!("{publication} — Edition {id}"), file }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.file)
    }
}

/// The first run of ASCII digits in `file`, or `0` if there is none (or it
/// does not fit a `u32`).
pub fn parse_id(file: &str) -> u32 {
    let digits: String = file.chars().skip_while(|c| !c.is_ascii_digit()).take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Editions for `files`, newest first.
///
/// The sort is stable: editions sharing a number keep the order in which
/// their files were discovered.
pub fn editions<I, S>(files: I, publication: &str) -> Vec<Edition>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut editions: Vec<Edition> = files.into_iter().map(|file| Edition::new(file, publication)).collect();
    editions.sort_by(|a, b| b.id.cmp(&a.id));
    editions
}
