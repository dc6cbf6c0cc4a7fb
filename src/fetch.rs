use std::time::Duration;

use crate::{
    error::{ShotreelError, ShotreelResult},
    model::{ImageLoadState, Shot},
};

/// Source of shot imagery. The pipeline only ever goes through this seam, so
/// tests can substitute an in-memory fake.
pub trait ImageSource {
    fn fetch(&self, url: &str) -> ShotreelResult<image::RgbaImage>;
}

/// Fetches `http(s)` URLs with a blocking reqwest client and treats anything
/// else as a filesystem path.
pub struct HttpImageSource {
    client: reqwest::blocking::Client,
}

impl HttpImageSource {
    pub fn new() -> ShotreelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| ShotreelError::image(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    fn fetch_http(&self, url: &str) -> ShotreelResult<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ShotreelError::image(format!("request to '{url}' failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(ShotreelError::image(format!(
                "request to '{url}' returned status {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| ShotreelError::image(format!("failed to read body of '{url}': {e}")))?;
        Ok(bytes.to_vec())
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> ShotreelResult<image::RgbaImage> {
        let bytes = if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url)?
        } else {
            std::fs::read(url)
                .map_err(|e| ShotreelError::image(format!("failed to read '{url}': {e}")))?
        };
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| ShotreelError::image(format!("failed to decode '{url}': {e}")))?;
        Ok(decoded.to_rgba8())
    }
}

/// Resolve one shot's image, absorbing every failure into the placeholder path.
/// A missing image must never stall or abort an export.
pub fn load_shot_image(source: &dyn ImageSource, shot: &Shot) -> ImageLoadState {
    let Some(url) = shot.image_url.as_deref() else {
        return ImageLoadState::Failed;
    };
    match source.fetch(url) {
        Ok(img) => ImageLoadState::Loaded(img),
        Err(e) => {
            tracing::warn!(shot = %shot.id, error = %e, "shot image fetch failed");
            ImageLoadState::Failed
        }
    }
}
