use std::sync::Mutex;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip;
use image::imageops::FilterType;
use image::RgbImage;
use tokenizers::Tokenizer;

use crate::captioner::Captioner;
use crate::error::{MatchError, Result};

const IMAGE_SIZE: u32 = 384;
const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];
/// `[DEC]` starts generation, `[SEP]` ends it.
const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;

/// BLIP image captioner with greedy decoding.
pub struct BlipCaptioner {
    // text decoding mutates the KV cache
    model: Mutex<blip::BlipForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    max_tokens: usize,
}

impl BlipCaptioner {
    pub fn load(model_id: &str, revision: &str, max_tokens: usize, use_gpu: bool) -> Result<Self> {
        let started = Instant::now();
        let device = super::select_device(use_gpu);
        let [tokenizer_path, weights_path] =
            super::fetch_files(model_id, revision, ["tokenizer.json", "model.safetensors"])?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| MatchError::ModelLoad(format!("tokenizer: {e}")))?;
        let config = blip::Config::image_captioning_large();
        // SAFETY: the hub cache file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device) }
            .map_err(|e| MatchError::ModelLoad(e.to_string()))?;
        let model = blip::BlipForConditionalGeneration::new(&config, vb)
            .map_err(|e| MatchError::ModelLoad(e.to_string()))?;

        tracing::info!(
            model = model_id,
            device = ?device,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded caption model"
        );
        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            max_tokens: max_tokens.max(1),
        })
    }

    /// Resize to 384x384, scale to [0, 1] and normalise per channel. Output is CHW.
    fn preprocess(&self, image: &RgbImage) -> candle_core::Result<Tensor> {
        let resized = image::imageops::resize(image, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);
        let side = IMAGE_SIZE as usize;
        let data = Tensor::from_vec(resized.into_raw(), (side, side, 3), &Device::Cpu)?
            .permute((2, 0, 1))?;
        let mean = Tensor::new(&MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
        let std = Tensor::new(&STD, &Device::Cpu)?.reshape((3, 1, 1))?;
        (data.to_dtype(DType::F32)? / 255.)?
            .broadcast_sub(&mean)?
            .broadcast_div(&std)?
            .to_device(&self.device)
    }

    fn generate(
        &self,
        model: &mut blip::BlipForConditionalGeneration,
        pixels: &Tensor,
    ) -> candle_core::Result<Vec<u32>> {
        let image_embeds = pixels.unsqueeze(0)?.apply(model.vision_model())?;
        // no temperature: argmax, so captions are deterministic
        let mut logits_processor = LogitsProcessor::new(0, None, None);
        let mut token_ids = vec![BOS_TOKEN_ID];
        for index in 0..self.max_tokens {
            let context_size = if index > 0 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = model.text_decoder().forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
        }
        Ok(token_ids)
    }
}

impl Captioner for BlipCaptioner {
    fn describe(&self, image: &RgbImage) -> Result<String> {
        if image.width() == 0 || image.height() == 0 {
            return Err(MatchError::ModelInference("image has no pixels".into()));
        }
        let pixels = self
            .preprocess(image)
            .map_err(|e| MatchError::ModelInference(e.to_string()))?;

        let mut model = self
            .model
            .lock()
            .map_err(|_| MatchError::ModelInference("caption model poisoned by an earlier panic".into()))?;
        let generated = self.generate(&mut model, &pixels);
        model.reset_kv_cache();
        drop(model);

        let token_ids = generated.map_err(|e| MatchError::ModelInference(e.to_string()))?;
        let text = self
            .tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|e| MatchError::ModelInference(format!("detokenize: {e}")))?;
        Ok(text.trim().to_string())
    }
}
