//! Page layout of an exported transcript.
//!
//! Layout is pure: it decides what goes on which page, in millimetres from the
//! top-left corner of an A4 page, without touching the network or a PDF
//! backend.

use crate::export::assets::AssetRef;
use crate::export::markdown::{blank_emojis, clean_markdown, extract_emojis, extract_images};
use crate::types::{ChatMessage, Role};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 20.0;
pub const TEXT_WIDTH: f32 = PAGE_WIDTH - MARGIN * 2.0;

/// Lines and emojis below this mark start a new page.
const BREAK_AT: f32 = PAGE_HEIGHT - 20.0;
/// Images below this mark start a new page.
const IMAGE_BREAK_AT: f32 = PAGE_HEIGHT - 80.0;
const CONTENT_TOP: f32 = 25.0;
const CONTINUED_TOP: f32 = 20.0;
const LINE_ADVANCE: f32 = 6.0;
const EMOJI_SIZE: f32 = 6.0;
const EMOJI_ADVANCE: f32 = 7.0;
const IMAGE_HEIGHT: f32 = 60.0;
const IMAGE_ADVANCE: f32 = IMAGE_HEIGHT + 10.0;

/// Assistant messages containing this are the canned greeting and are not exported.
pub const GREETING_MARKER: &str = "Namaste";

const TITLE: &str = "Pungde";
const SUBTITLE: &str = "AI Farming Consultation Report";
const FOOTER: &str = "Generated by Pungde AI Farming Assistant";

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colour(pub u8, pub u8, pub u8);

const COVER_BACKGROUND: Colour = Colour(15, 17, 21);
const COVER_TEXT: Colour = Colour(235, 235, 235);
const QUESTION_TEXT: Colour = Colour(45, 49, 56);
const ANSWER_TEXT: Colour = Colour(10, 120, 10);
const BODY_TEXT: Colour = Colour(60, 60, 60);
const FOOTER_TEXT: Colour = Colour(150, 150, 150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in points.
    pub size: f32,
    pub weight: Weight,
    pub colour: Colour,
}

impl TextStyle {
    const fn new(size: f32, weight: Weight, colour: Colour) -> Self {
        Self {
            size,
            weight,
            colour,
        }
    }
}

/// One drawing operation. `y` is the text baseline, or the top edge of an image.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Fill the whole page.
    Fill { colour: Colour },
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        asset: AssetRef,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

/// A laid-out document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every asset the document draws, in document order, without repeats.
    pub fn assets(&self) -> Vec<AssetRef> {
        let mut assets: Vec<AssetRef> = Vec::new();
        for op in self.pages.iter().flat_map(|page| page.ops.iter()) {
            if let DrawOp::Image { asset, .. } = op
                && !assets.contains(asset)
            {
                assets.push(asset.clone());
            }
        }
        assets
    }
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn new_page(&mut self, y: f32) {
        self.pages.push(Page::default());
        self.y = y;
    }

    fn break_below(&mut self, mark: f32) {
        if self.y > mark {
            self.new_page(CONTINUED_TOP);
        }
    }

    fn text(&mut self, x: f32, text: impl Into<String>, style: TextStyle) {
        let y = self.y;
        self.push(DrawOp::Text {
            x,
            y,
            text: text.into(),
            style,
        });
    }

    fn centered(&mut self, y: f32, text: &str, style: TextStyle) {
        let x = (PAGE_WIDTH - text_width(text, style.size)) / 2.0;
        self.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            style,
        });
    }
}

/// Lay out `messages` behind a cover page dated `date_label`.
pub fn layout_transcript(messages: &[ChatMessage], date_label: &str) -> Document {
    let mut cursor = Cursor {
        pages: vec![Page::default()],
        y: 0.0,
    };

    cursor.push(DrawOp::Fill {
        colour: COVER_BACKGROUND,
    });
    cursor.centered(100.0, TITLE, TextStyle::new(32.0, Weight::Bold, COVER_TEXT));
    cursor.centered(120.0, SUBTITLE, TextStyle::new(14.0, Weight::Regular, COVER_TEXT));
    cursor.centered(135.0, date_label, TextStyle::new(10.0, Weight::Regular, COVER_TEXT));

    cursor.new_page(CONTENT_TOP);
    let body = TextStyle::new(10.0, Weight::Regular, BODY_TEXT);
    let mut questions = 0;

    for message in messages {
        if message.role == Role::Assistant && message.content.contains(GREETING_MARKER) {
            continue;
        }

        cursor.break_below(BREAK_AT);
        match message.role {
            Role::User => {
                questions += 1;
                cursor.text(
                    MARGIN,
                    format!("Q{questions}:"),
                    TextStyle::new(12.0, Weight::Bold, QUESTION_TEXT),
                );
            }
            Role::Assistant => {
                cursor.text(
                    MARGIN,
                    "Answer:",
                    TextStyle::new(11.0, Weight::Bold, ANSWER_TEXT),
                );
            }
        }
        cursor.y += LINE_ADVANCE;

        let cleaned = clean_markdown(&message.content);
        for line in wrap_text(&blank_emojis(&cleaned), TEXT_WIDTH, body.size) {
            cursor.break_below(BREAK_AT);
            if !line.is_empty() {
                cursor.text(MARGIN, line, body);
            }
            cursor.y += LINE_ADVANCE;
        }

        for emoji in extract_emojis(&cleaned) {
            cursor.break_below(BREAK_AT);
            let y = cursor.y;
            cursor.push(DrawOp::Image {
                x: MARGIN,
                y,
                width: EMOJI_SIZE,
                height: EMOJI_SIZE,
                asset: AssetRef::Emoji(emoji),
            });
            cursor.y += EMOJI_ADVANCE;
        }

        cursor.y += 5.0;

        for image in extract_images(&message.content) {
            cursor.break_below(IMAGE_BREAK_AT);
            let y = cursor.y;
            cursor.push(DrawOp::Image {
                x: MARGIN,
                y,
                width: TEXT_WIDTH,
                height: IMAGE_HEIGHT,
                asset: AssetRef::Image(image.url),
            });
            cursor.y += IMAGE_ADVANCE;
        }

        cursor.y += 10.0;
    }

    cursor.centered(
        PAGE_HEIGHT - 10.0,
        FOOTER,
        TextStyle::new(8.0, Weight::Regular, FOOTER_TEXT),
    );

    Document {
        pages: cursor.pages,
    }
}

/// Approximate Helvetica advance width of `text` in millimetres.
pub fn text_width(text: &str, size: f32) -> f32 {
    let em = size * 25.4 / 72.0;
    text.chars().map(|c| glyph_width(c) * em).sum()
}

fn glyph_width(c: char) -> f32 {
    match c {
        ' ' | 'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.28,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.33,
        'm' | 'w' => 0.83,
        'M' | 'W' => 0.89,
        'A'..='Z' => 0.67,
        _ => 0.56,
    }
}

/// Greedy word wrap to `width` millimetres. Each `\n` starts a new line;
/// words wider than a line are split between characters.
pub fn wrap_text(text: &str, width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if text_width(&candidate, size) <= width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for c in word.chars() {
                line.push(c);
                if text_width(&line, size) > width {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(c);
                }
            }
        }
        lines.push(line);
    }
    lines
}
