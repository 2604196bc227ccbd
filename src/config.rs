use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Process configuration: `stylematch.toml` (optional) overridden by
/// `STYLEMATCH__*` environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upload size cap in MB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON catalog to use instead of the built-in outfits
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub ranking: Params,

    #[serde(default)]
    pub models: ModelConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub embedding_model: String,
    pub embedding_revision: String,
    pub caption_model: String,
    pub caption_revision: String,
    pub max_caption_tokens: usize,
    pub use_gpu: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_revision: "main".to_string(),
            caption_model: "Salesforce/blip-image-captioning-large".to_string(),
            // safetensors weights live on this PR ref
            caption_revision: "refs/pr/18".to_string(),
            max_caption_tokens: 20,
            use_gpu: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
            log_level: default_log_level(),
            catalog_path: None,
            ranking: Params::default(),
            models: ModelConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `path` if given, otherwise `./stylematch.toml` when present, then
    /// applies environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("stylematch").required(false),
        };
        let cfg: AppConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("STYLEMATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("reading configuration")?
            .try_deserialize()
            .context("parsing configuration")?;
        if cfg.ranking.top_k == 0 {
            anyhow::bail!("ranking.top_k must be at least 1");
        }
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.bind_addr, self.port);
        addr.parse()
            .with_context(|| format!("invalid bind address {addr}"))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_max_upload_mb() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.port, 8501);
        assert_eq!(cfg.bind_addr, "127.0.0.1");
        assert_eq!(cfg.ranking.top_k, 3);
        assert!(!cfg.ranking.cache_catalog_embeddings);
        assert_eq!(cfg.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(cfg.socket_addr().unwrap().port(), 8501);
    }

    #[test]
    fn loads_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "port = 9000\n\n[ranking]\ntop_k = 2\ncache_catalog_embeddings = true\n\n[models]\nmax_caption_tokens = 30"
        )
        .unwrap();
        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.bind_addr, "127.0.0.1");
        assert_eq!(cfg.ranking.top_k, 2);
        assert!(cfg.ranking.cache_catalog_embeddings);
        assert_eq!(cfg.models.max_caption_tokens, 30);
        assert_eq!(cfg.models.embedding_model, "sentence-transformers/all-MiniLM-L6-v2");
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ranking]\ntop_k = 0").unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
