use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;

use crate::captioner::Captioner;
use crate::error::Result;
use crate::ranking::Ranker;
use crate::types::Analysis;
use crate::upload::decode_upload;

/// Upload -> description -> ranked catalog matches.
pub struct StyleMatcher {
    captioner: Arc<dyn Captioner>,
    ranker: Ranker,
}

impl StyleMatcher {
    pub fn new(captioner: Arc<dyn Captioner>, ranker: Ranker) -> Self {
        Self { captioner, ranker }
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    pub fn analyze_upload(&self, bytes: &[u8]) -> Result<Analysis> {
        let image = decode_upload(bytes)?;
        self.analyze_image(&image)
    }

    pub fn analyze_image(&self, image: &RgbImage) -> Result<Analysis> {
        self.analyze_with_k(image, self.ranker.params().top_k)
    }

    pub fn analyze_with_k(&self, image: &RgbImage, k: usize) -> Result<Analysis> {
        let started = Instant::now();
        let description = self.captioner.describe(image)?;
        tracing::info!(
            %description,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated description"
        );

        let started = Instant::now();
        let matches = self.ranker.rank_k(&description, k)?;
        tracing::info!(
            matches = matches.len(),
            top = matches.first().map(|m| m.id()).unwrap_or("-"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ranked catalog"
        );
        Ok(Analysis {
            description,
            matches,
        })
    }
}
