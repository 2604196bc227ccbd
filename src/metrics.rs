const EPSILON: f32 = 1e-6;

/// Cosine similarity in `[-1, 1]`. A zero-magnitude side scores `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na < EPSILON || nb < EPSILON {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

pub fn round_score(score: f32) -> f32 {
    (score * 100.0).round() / 100.0
}
