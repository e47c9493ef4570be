/// Page kind definitions for classified pages
///
/// Every fetched page is classified as exactly one of these kinds.
use std::fmt;

/// Classification of a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Non-leaf page whose value is its outbound links
    Theme,

    /// Leaf page holding one question/answer record
    Question,

    /// Neither signature present; discarded
    Unknown,
}

impl PageKind {
    /// Parses the text of the page's label marker
    ///
    /// Returns `Unknown` for anything other than the two known labels.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Theme" => Self::Theme,
            "Question" => Self::Question,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Question => "question",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
