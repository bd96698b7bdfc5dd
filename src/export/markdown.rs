//! Reduction of assistant markdown to printable text.

use std::sync::LazyLock;

use regex::Regex;

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("image pattern is valid"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern is valid"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#{1,6}\s").expect("heading pattern is valid"));
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`{1,3}(.*?)`{1,3}").expect("code pattern is valid"));
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Extended_Pictographic}").expect("emoji pattern is valid")
});

/// Text that replaces an inline image in the printed body.
pub const IMAGE_PLACEHOLDER: &str = "[Image Below]";

/// An image referenced with `![alt](url)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Alternative text, `Image` when empty.
    pub alt: String,
    /// Where to fetch the image from.
    pub url: String,
}

/// Returns the images referenced by `text`, in order of appearance.
pub fn extract_images(text: &str) -> Vec<ImageRef> {
    IMAGE
        .captures_iter(text)
        .map(|caps| {
            let alt = caps.get(1).map_or("", |m| m.as_str());
            ImageRef {
                alt: if alt.is_empty() { "Image" } else { alt }.to_string(),
                url: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            }
        })
        .collect()
}

/// Strips markdown formatting, leaving a placeholder where images were.
pub fn clean_markdown(text: &str) -> String {
    let text = IMAGE.replace_all(text, IMAGE_PLACEHOLDER);
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = CODE.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Returns the pictographic characters of `text`, in order.
pub fn extract_emojis(text: &str) -> Vec<char> {
    EMOJI
        .find_iter(text)
        .filter_map(|m| m.as_str().chars().next())
        .collect()
}

/// Replaces every pictographic character with a single space.
pub fn blank_emojis(text: &str) -> String {
    EMOJI.replace_all(text, " ").into_owned()
}
