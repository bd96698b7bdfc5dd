//! Remote images drawn into an export.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::observability::{EXPORT_ASSET_ERRORS, EXPORT_ASSET_FETCHES};

/// Base of the 72x72 PNG Twemoji set used to draw emojis.
pub const TWEMOJI_BASE: &str = "https://cdnjs.cloudflare.com/ajax/libs/twemoji/14.0.2/72x72";

/// An image an exported document draws.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    /// An emoji, drawn from its Twemoji rendering.
    Emoji(char),
    /// An image embedded in a message by URL.
    Image(String),
}

impl AssetRef {
    /// Where the asset is fetched from.
    pub fn url(&self) -> String {
        match self {
            AssetRef::Emoji(emoji) => emoji_asset_url(*emoji),
            AssetRef::Image(url) => url.clone(),
        }
    }
}

/// The Twemoji image URL for a single-code-point emoji.
pub fn emoji_asset_url(emoji: char) -> String {
    format!("{TWEMOJI_BASE}/{:x}.png", emoji as u32)
}

/// Retrieves asset bytes.
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches assets over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        EXPORT_ASSET_FETCHES.click();
        let result = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::asset(format!("request failed: {e}"), url))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::asset(format!("server returned {status}"), url));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::asset(format!("body could not be read: {e}"), url))?;
            Ok(bytes.to_vec())
        }
        .await;
        if let Err(err) = &result {
            EXPORT_ASSET_ERRORS.click();
            tracing::warn!(url, error = %err, "asset fetch failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_urls_use_lowercase_hex() {
        assert_eq!(
            emoji_asset_url('🌾'),
            "https://cdnjs.cloudflare.com/ajax/libs/twemoji/14.0.2/72x72/1f33e.png"
        );
        assert_eq!(AssetRef::Emoji('☀').url(), format!("{TWEMOJI_BASE}/2600.png"));
    }

    #[test]
    fn image_url_is_verbatim() {
        let asset = AssetRef::Image("https://x.test/a b.png".to_string());
        assert_eq!(asset.url(), "https://x.test/a b.png");
    }
}
