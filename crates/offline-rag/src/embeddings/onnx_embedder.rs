//! ONNX-based embedding generation
//!
//! Runs bge-small-en-v1.5 (384 dimensions) locally. Model and tokenizer are
//! read from `model_dir` when present, otherwise downloaded once into
//! `cache_dir`.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::{EmbeddingConfig, Pooling};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

use super::l2_normalize;

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    dimensions: usize,
    batch_size: usize,
}

struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    dimensions: usize,
    max_length: usize,
    pooling: Pooling,
}

impl OnnxEmbedder {
    /// Load the model, downloading it if no local copy exists
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let (model_path, tokenizer_path) = resolve_model_files(config).await?;

        let session = Session::builder()
            .map_err(|e| Error::embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::embedding(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::embedding(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::embedding(format!("Failed to load tokenizer: {}", e)))?;

        tracing::info!("ONNX embedder initialized ({:?} pooling)", config.pooling);

        Ok(Self {
            model: Arc::new(Mutex::new(OnnxModel {
                session,
                tokenizer,
                dimensions: config.dimensions,
                max_length: config.max_length,
                pooling: config.pooling,
            })),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn run_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(|t| t.as_str()).collect();
            model.lock().embed_batch(&refs)
        })
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run_blocking(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.run_blocking(batch.to_vec()).await?);
        }
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

impl OnnxModel {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("Input tensor creation failed: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| Error::embedding(format!("Attention mask tensor creation failed: {}", e)))?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
                .map_err(|e| Error::embedding(format!("Token type tensor creation failed: {}", e)))?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::embedding(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::embedding("No output tensor"))?;

        let (tensor_shape, hidden) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        pool(
            hidden,
            &dims,
            &attention_mask,
            (batch_size, max_len),
            self.pooling,
            self.dimensions,
        )
    }
}

/// Pool a `[batch, seq, hidden]` output into one unit vector per input.
///
/// `attention_mask` is laid out `[batch, seq]` like the model inputs.
fn pool(
    hidden: &[f32],
    dims: &[usize],
    attention_mask: &[i64],
    (batch_size, max_len): (usize, usize),
    pooling: Pooling,
    expected: usize,
) -> Result<Vec<Vec<f32>>> {
    if dims.len() != 3 || dims[0] != batch_size || dims[1] != max_len {
        return Err(Error::embedding(format!(
            "Unexpected output shape {:?}, expected [{}, {}, {}]",
            dims, batch_size, max_len, expected
        )));
    }
    let hidden_size = dims[2];
    if hidden_size != expected {
        return Err(Error::embedding(format!(
            "Model produces {}-dimensional vectors, config expects {}",
            hidden_size, expected
        )));
    }
    if hidden.len() != batch_size * max_len * hidden_size {
        return Err(Error::embedding(format!(
            "Output holds {} values for shape {:?}",
            hidden.len(),
            dims
        )));
    }

    let mut embeddings = Vec::with_capacity(batch_size);
    for i in 0..batch_size {
        let token = |j: usize| {
            let offset = i * max_len * hidden_size + j * hidden_size;
            &hidden[offset..offset + hidden_size]
        };

        let mut pooled = match pooling {
            Pooling::Cls => token(0).to_vec(),
            Pooling::Mean => {
                let mut sum = vec![0.0f32; hidden_size];
                let mut count = 0.0f32;
                for j in 0..max_len {
                    if attention_mask[i * max_len + j] > 0 {
                        for (acc, val) in sum.iter_mut().zip(token(j)) {
                            *acc += val;
                        }
                        count += 1.0;
                    }
                }
                if count > 0.0 {
                    for val in &mut sum {
                        *val /= count;
                    }
                }
                sum
            }
        };

        l2_normalize(&mut pooled);
        embeddings.push(pooled);
    }

    Ok(embeddings)
}

/// Local `model_dir` first, then the download cache
async fn resolve_model_files(config: &EmbeddingConfig) -> Result<(PathBuf, PathBuf)> {
    let local_model = config.model_dir.join("model.onnx");
    let local_tokenizer = config.model_dir.join("tokenizer.json");
    if local_model.exists() && local_tokenizer.exists() {
        tracing::info!("Using local model files in {}", config.model_dir.display());
        return Ok((local_model, local_tokenizer));
    }

    let cache_dir = config.cache_dir.join(config.model.replace('/', "--"));
    std::fs::create_dir_all(&cache_dir)
        .map_err(|e| Error::config(format!("Failed to create cache directory: {}", e)))?;

    let model_path = cache_dir.join("model.onnx");
    let tokenizer_path = cache_dir.join("tokenizer.json");

    if !model_path.exists() {
        download(&config.model, "onnx/model.onnx", &model_path).await?;
    }
    if !tokenizer_path.exists() {
        download(&config.model, "tokenizer.json", &tokenizer_path).await?;
    }

    Ok((model_path, tokenizer_path))
}

/// Fetch one file of a HuggingFace model repository
async fn download(model_name: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        model_name, file
    );

    tracing::info!("Downloading {} from: {}", file, url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::embedding(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::embedding(format!("Failed to read {} bytes: {}", file, e)))?;

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| Error::embedding(format!("Failed to save {}: {}", file, e)))?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pooling_skips_padding() {
        // one input, three positions, the last one padding
        let hidden = [1.0, 0.0, 0.0, 1.0, 9.0, 9.0];
        let mask = [1, 1, 0];
        let pooled = pool(&hidden, &[1, 3, 2], &mask, (1, 3), Pooling::Mean, 2).unwrap();

        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((pooled[0][0] - expected).abs() < 1e-6);
        assert!((pooled[0][1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_cls_pooling_takes_first_token() {
        let hidden = [3.0, 4.0, 1.0, 1.0];
        let pooled = pool(&hidden, &[1, 2, 2], &[1, 1], (1, 2), Pooling::Cls, 2).unwrap();
        assert!((pooled[0][0] - 0.6).abs() < 1e-6);
        assert!((pooled[0][1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_two_dimensional_output_rejected() {
        // a pooled [batch, hidden] output instead of per-token states
        let hidden = [0.5; 4];
        let err = pool(&hidden, &[1, 4], &[1, 1, 1], (1, 3), Pooling::Mean, 4).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[test]
    fn test_short_output_rejected() {
        let hidden = [0.5; 3];
        assert!(pool(&hidden, &[1, 2, 2], &[1, 1], (1, 2), Pooling::Cls, 2).is_err());
    }
}
