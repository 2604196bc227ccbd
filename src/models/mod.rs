//! Pretrained models run locally through candle; weights come from the
//! Hugging Face hub cache.

mod blip;
mod minilm;

pub use blip::BlipCaptioner;
pub use minilm::MiniLmEmbedder;

use std::path::PathBuf;

use candle_core::Device;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};

use crate::error::{MatchError, Result};

pub(crate) fn select_device(use_gpu: bool) -> Device {
    if !use_gpu {
        return Device::Cpu;
    }
    Device::cuda_if_available(0).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "CUDA not available, falling back to CPU");
        Device::Cpu
    })
}

/// Resolves `files` from `model_id@revision`, downloading on first use.
pub(crate) fn fetch_files<const N: usize>(
    model_id: &str,
    revision: &str,
    files: [&str; N],
) -> Result<[PathBuf; N]> {
    let api = Api::new().map_err(|e| MatchError::ModelLoad(e.to_string()))?;
    let repo = api.repo(Repo::with_revision(
        model_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));
    let mut paths: [PathBuf; N] = std::array::from_fn(|_| PathBuf::new());
    for (slot, name) in paths.iter_mut().zip(files) {
        *slot = repo
            .get(name)
            .map_err(|e| MatchError::ModelLoad(format!("{model_id}/{name}: {e}")))?;
    }
    Ok(paths)
}
