//! PDF export of a conversation.
//!
//! Export runs in three steps. The transcript is laid out into pages, every
//! image the layout references is fetched, and the result is rendered to
//! PDF. Any fetch or decode failure aborts the whole export.

pub mod assets;
pub mod layout;
pub mod markdown;
pub mod pdf;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use printpdf::image_crate::{self, DynamicImage};
use time::Date;

use crate::error::{Error, Result};
use crate::observability::EXPORT_DOCUMENTS;
use crate::types::ChatMessage;
use crate::utils::time::iso_date;

pub use assets::{AssetFetcher, AssetRef, HttpAssetFetcher, emoji_asset_url};
pub use layout::{Document, layout_transcript};

const DOCUMENT_TITLE: &str = "Pungde AI Farming Consultation Report";

/// The file name an export made on `date` is saved under.
pub fn export_file_name(date: Date) -> String {
    format!("Pungde-{}.pdf", iso_date(date))
}

/// The date as printed on the cover page.
pub fn cover_date(date: Date) -> String {
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

/// Render `messages` to PDF bytes.
pub async fn export_transcript(
    messages: &[ChatMessage],
    fetcher: &dyn AssetFetcher,
    date: Date,
) -> Result<Vec<u8>> {
    let document = layout_transcript(messages, &cover_date(date));
    let mut images: HashMap<AssetRef, DynamicImage> = HashMap::new();
    for asset in document.assets() {
        let url = asset.url();
        let bytes = fetcher.fetch(&url).await?;
        let image = image_crate::load_from_memory(&bytes)
            .map_err(|e| Error::asset(format!("image could not be decoded: {e}"), url))?;
        images.insert(asset, image);
    }
    let bytes = pdf::render(&document, &images, DOCUMENT_TITLE)?;
    EXPORT_DOCUMENTS.click();
    tracing::info!(
        pages = document.page_count(),
        images = images.len(),
        bytes = bytes.len(),
        "exported transcript"
    );
    Ok(bytes)
}

/// Export `messages` into `dir` and return the path written.
pub async fn export_to_dir(
    messages: &[ChatMessage],
    fetcher: &dyn AssetFetcher,
    dir: &Path,
    date: Date,
) -> Result<PathBuf> {
    let bytes = export_transcript(messages, fetcher, date).await?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| Error::io(format!("failed to create {}", dir.display()), err))?;
    let path = dir.join(export_file_name(date));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|err| Error::io(format!("failed to write {}", path.display()), err))?;
    Ok(path)
}
