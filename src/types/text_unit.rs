/// One unit of assistant text extracted from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextUnit {
    /// An incremental fragment of a reply that is still being produced.
    Delta(String),

    /// A complete assistant message.
    Full(String),
}

impl TextUnit {
    /// Returns the carried text.
    pub fn text(&self) -> &str {
        match self {
            TextUnit::Delta(text) | TextUnit::Full(text) => text,
        }
    }

    /// Returns true for incremental fragments.
    pub fn is_delta(&self) -> bool {
        matches!(self, TextUnit::Delta(_))
    }
}
