use image::RgbImage;

use crate::error::Result;

/// Image -> short natural-language description.
///
/// Calls are blocking and may take seconds. Inputs the model cannot handle
/// fail with [`MatchError::ModelInference`](crate::MatchError::ModelInference).
pub trait Captioner: Send + Sync {
    fn describe(&self, image: &RgbImage) -> Result<String>;
}
