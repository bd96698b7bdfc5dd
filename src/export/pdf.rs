//! Rendering a laid-out [`Document`] to PDF bytes.

use std::collections::HashMap;

use printpdf::image_crate::{DynamicImage, Rgb as PixelRgb, RgbImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rect, Rgb,
};

use crate::error::{Error, Result};
use crate::export::assets::AssetRef;
use crate::export::layout::{Colour, Document, DrawOp, PAGE_HEIGHT, PAGE_WIDTH, Weight};

/// Resolution images are embedded at before scaling to their box.
const IMAGE_DPI: f32 = 300.0;
const LAYER: &str = "content";

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, weight: Weight) -> &IndirectFontRef {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

fn pdf_error(err: printpdf::Error) -> Error {
    Error::pdf(err.to_string())
}

/// Render `document`, drawing every image from `assets`.
///
/// Every asset the document references must be present.
pub fn render(
    document: &Document,
    assets: &HashMap<AssetRef, DynamicImage>,
    title: &str,
) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?,
    };

    for (index, page) in document.pages().iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            doc.get_page(page).get_layer(layer)
        };
        for op in &page.ops {
            draw(&layer, op, &fonts, assets)?;
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn draw(
    layer: &PdfLayerReference,
    op: &DrawOp,
    fonts: &Fonts,
    assets: &HashMap<AssetRef, DynamicImage>,
) -> Result<()> {
    match op {
        DrawOp::Fill { colour } => {
            layer.set_fill_color(fill(*colour));
            layer.add_rect(Rect::new(Mm(0.0), Mm(0.0), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT)));
        }
        DrawOp::Text { x, y, text, style } => {
            layer.set_fill_color(fill(style.colour));
            layer.use_text(
                text.as_str(),
                style.size,
                Mm(*x),
                Mm(PAGE_HEIGHT - *y),
                fonts.get(style.weight),
            );
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            asset,
        } => {
            let source = assets
                .get(asset)
                .ok_or_else(|| Error::asset("image was not fetched", asset.url()))?;
            let flat = flatten(source);
            let (px_width, px_height) = (flat.width().max(1), flat.height().max(1));
            let natural_width = px_width as f32 / IMAGE_DPI * 25.4;
            let natural_height = px_height as f32 / IMAGE_DPI * 25.4;
            Image::from_dynamic_image(&DynamicImage::ImageRgb8(flat)).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(*x)),
                    translate_y: Some(Mm(PAGE_HEIGHT - *y - *height)),
                    scale_x: Some(*width / natural_width),
                    scale_y: Some(*height / natural_height),
                    dpi: Some(IMAGE_DPI),
                    ..Default::default()
                },
            );
        }
    }
    Ok(())
}

fn fill(colour: Colour) -> Color {
    let Colour(r, g, b) = colour;
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Composite over white; the PDF image has no alpha channel.
fn flatten(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        PixelRgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use printpdf::image_crate::{Rgba, RgbaImage};

    use super::*;
    use crate::export::layout::layout_transcript;
    use crate::types::ChatMessage;

    fn square(pixel: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba(pixel)))
    }

    #[test]
    fn flatten_composites_over_white() {
        let clear = flatten(&square([0, 0, 0, 0]));
        assert_eq!(clear.get_pixel(0, 0).0, [255, 255, 255]);
        let opaque = flatten(&square([10, 20, 30, 255]));
        assert_eq!(opaque.get_pixel(3, 3).0, [10, 20, 30]);
    }

    #[test]
    fn renders_text_only_document() {
        let messages = vec![
            ChatMessage::user("When should I sow wheat?"),
            ChatMessage::assistant("Sow **wheat** from late October to mid November."),
        ];
        let document = layout_transcript(&messages, "10/14/2026");
        let bytes = render(&document, &HashMap::new(), "report").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_fetched_images() {
        let messages = vec![ChatMessage::assistant(
            "Leaf spot 🍃 ![leaf](https://x.test/leaf.png)",
        )];
        let document = layout_transcript(&messages, "d");
        let assets: HashMap<AssetRef, DynamicImage> = document
            .assets()
            .into_iter()
            .map(|asset| (asset, square([0, 128, 0, 200])))
            .collect();
        let bytes = render(&document, &assets, "report").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_asset_is_an_error() {
        let messages = vec![ChatMessage::assistant("![x](https://x.test/x.png)")];
        let document = layout_transcript(&messages, "d");
        let err = render(&document, &HashMap::new(), "report").unwrap_err();
        assert!(err.is_asset());
    }
}
