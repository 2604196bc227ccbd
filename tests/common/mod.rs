#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, RgbImage};
use stylematch::{Captioner, Embedder, Embedding, MatchError, OutfitEntry, Result};

const DIM: usize = 64;

/// Hashes lowercase words into a fixed number of buckets. Identical texts
/// embed identically; texts sharing words score higher.
pub struct BagOfWordsEmbedder;

impl Embedder for BagOfWordsEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut v = vec![0.0f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut h = DefaultHasher::new();
            word.to_lowercase().hash(&mut h);
            v[(h.finish() % DIM as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self) -> Option<usize> {
        Some(DIM)
    }
}

/// Returns preset vectors; unknown text is an embedding failure.
pub struct FixedEmbedder(pub HashMap<String, Embedding>);

impl FixedEmbedder {
    pub fn new<const N: usize>(pairs: [(&str, Vec<f32>); N]) -> Self {
        Self(pairs.into_iter().map(|(t, v)| (t.to_string(), v)).collect())
    }
}

impl Embedder for FixedEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.0
            .get(text)
            .cloned()
            .ok_or_else(|| MatchError::Embedding(format!("no vector for {text:?}")))
    }
}

/// Counts calls to the wrapped embedder.
pub struct CountingEmbedder<E> {
    pub inner: E,
    pub calls: AtomicUsize,
}

impl<E> CountingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: Embedder> Embedder for CountingEmbedder<E> {
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

pub struct StubCaptioner(pub String);

impl Captioner for StubCaptioner {
    fn describe(&self, _image: &RgbImage) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub struct FailingCaptioner;

impl Captioner for FailingCaptioner {
    fn describe(&self, _image: &RgbImage) -> Result<String> {
        Err(MatchError::ModelInference("model exploded".into()))
    }
}

pub fn entries(pairs: &[(&str, &str)]) -> Vec<OutfitEntry> {
    pairs.iter().map(|(id, d)| OutfitEntry::new(*id, *d)).collect()
}

pub fn encoded_image(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(16, 12, |x, y| image::Rgb([(x * 15) as u8, (y * 20) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .expect("encode test image");
    buf.into_inner()
}
