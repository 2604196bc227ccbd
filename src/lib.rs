//! Describe an outfit photo and rank a small catalog of outfit descriptions
//! by semantic similarity to it.

pub mod captioner;
pub mod catalog;
pub mod config;
pub mod embedder;
pub mod error;
pub mod metrics;
#[cfg(feature = "models")]
pub mod models;
pub mod params;
pub mod pipeline;
pub mod ranking;
pub mod server;
pub mod types;
pub mod upload;
pub mod view;

pub use captioner::Captioner;
pub use catalog::Catalog;
pub use config::AppConfig;
pub use embedder::Embedder;
pub use error::{MatchError, Result};
pub use params::Params;
pub use pipeline::StyleMatcher;
pub use ranking::{rank, Ranker};
pub use types::{Analysis, Embedding, OutfitEntry, ScoredMatch};
