//! Nearest-centroid food classifier.
//!
//! Pipeline: decode → area-resize to 224×224 → RGB → per-channel mean
//! (the embedding) → cosine similarity against every catalog signature.
//! The highest similarity picks the label (first entry wins ties); the
//! confidence is the top probability of `softmax(8 · similarity)`.
//!
//! Classification is deterministic and holds no state beyond the catalog.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Macros};

/// Side length of the canonical square the input is resized to.
pub const INPUT_SIZE: u32 = 224;

/// Temperature applied to similarities before the softmax.
pub const CONFIDENCE_TEMPERATURE: f32 = 8.0;

const NORM_EPSILON: f32 = 1e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    #[error("invalid image content: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// In [0, 1], rounded to 4 decimal places.
    pub confidence: f64,
    pub macros: Macros,
}

/// Cheap to clone; every clone shares one catalog.
#[derive(Debug, Clone)]
pub struct Classifier {
    catalog: Arc<Catalog>,
}

impl Classifier {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn classify(&self, image_bytes: &[u8]) -> Result<ClassificationResult, ClassifyError> {
        let embedding = embed(image_bytes)?;
        Ok(self.classify_embedding(embedding))
    }

    /// Match a precomputed mean-colour embedding against the catalog.
    pub fn classify_embedding(&self, embedding: [f32; 3]) -> ClassificationResult {
        let query = l2_normalize(embedding);
        let scores = similarities(&self.catalog, query);
        let best = argmax(&scores);
        let confidence = max_softmax(&scores, CONFIDENCE_TEMPERATURE);
        let profile = &self.catalog.profiles()[best];

        ClassificationResult {
            label: profile.label.clone(),
            confidence: round4(f64::from(confidence)).clamp(0.0, 1.0),
            macros: profile.macros,
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────────────────────

/// Decode, resize and reduce an image to its mean RGB colour.
pub fn embed(image_bytes: &[u8]) -> Result<[f32; 3], ClassifyError> {
    let decoded = decode_rgb(image_bytes)?;
    let resized = resize_area(&decoded, INPUT_SIZE, INPUT_SIZE);
    Ok(channel_means(&resized))
}

/// Colour decode. Alpha is dropped and grayscale is expanded to three channels.
pub fn decode_rgb(image_bytes: &[u8]) -> Result<RgbImage, ClassifyError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ClassifyError::Decode(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ClassifyError::Decode("image has no pixels".into()));
    }
    Ok(decoded.to_rgb8())
}

/// Area-averaging resize.
///
/// Every destination pixel is the coverage-weighted mean of the source
/// pixels under its footprint, with fractional weights at the edges.
///
/// Averages are written back as 8-bit with ties to even, except for an exact
/// 2× downscale where ties round up.
pub fn resize_area(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let cols = area_spans(src.width(), width);
    let rows = area_spans(src.height(), height);
    let half_up = src.width() == width * 2 && src.height() == height * 2;
    let mut out = RgbImage::new(width, height);

    for (y, row) in rows.iter().enumerate() {
        for (x, col) in cols.iter().enumerate() {
            let mut acc = [0f64; 3];
            let mut total = 0f64;
            for &(sy, wy) in row {
                for &(sx, wx) in col {
                    let w = wy * wx;
                    let p = src.get_pixel(sx, sy);
                    for (a, v) in acc.iter_mut().zip(p.0) {
                        *a += f64::from(v) * w;
                    }
                    total += w;
                }
            }
            let px = acc.map(|v| to_u8(v / total, half_up));
            out.put_pixel(x as u32, y as u32, Rgb(px));
        }
    }
    out
}

fn to_u8(v: f64, half_up: bool) -> u8 {
    let r = if half_up {
        (v + 0.5).floor()
    } else {
        v.round_ties_even()
    };
    r.clamp(0.0, 255.0) as u8
}

/// Source (index, weight) pairs covering each destination coordinate.
fn area_spans(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f64)>> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    (0..dst_len)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = start + scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len).max(first + 1);
            (first..last)
                .filter_map(|s| {
                    let w = end.min(f64::from(s) + 1.0) - start.max(f64::from(s));
                    (w > 1e-9).then_some((s, w))
                })
                .collect()
        })
        .collect()
}

fn channel_means(img: &RgbImage) -> [f32; 3] {
    let mut sums = [0u64; 3];
    for p in img.pixels() {
        for (s, v) in sums.iter_mut().zip(p.0) {
            *s += u64::from(v);
        }
    }
    let n = (u64::from(img.width()) * u64::from(img.height())).max(1) as f64;
    sums.map(|s| (s as f64 / n) as f32)
}

// ── Similarity and confidence ─────────────────────────────────────────────────

/// Scale to unit Euclidean length. The zero vector stays zero.
pub fn l2_normalize(v: [f32; 3]) -> [f32; 3] {
    let sq: f32 = v.iter().map(|x| x * x).sum();
    let inv = 1.0 / sq.max(NORM_EPSILON).sqrt();
    v.map(|x| x * inv)
}

/// Cosine similarity of a unit-length query against every catalog entry.
pub fn similarities(catalog: &Catalog, query: [f32; 3]) -> Vec<f32> {
    catalog
        .normalized_signatures()
        .iter()
        .map(|sig| sig.iter().zip(query).map(|(a, b)| a * b).sum())
        .collect()
}

/// Index of the maximum; the earliest index wins ties.
fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

/// Largest probability of `softmax(temperature · scores)`.
pub fn max_softmax(scores: &[f32], temperature: f32) -> f32 {
    let scaled: Vec<f32> = scores.iter().map(|s| s * temperature).collect();
    let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scaled.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().copied().fold(0.0, f32::max) / sum
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
