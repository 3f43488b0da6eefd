//! Model asset loading from the Hugging Face Hub or a local directory.
//!
//! ## Main Types
//!
//! - [`ModelSource`] - Where the classifier's files live (hub repo or local dir)
//! - [`HfLoader`] - Single-file hub download with retry on lock contention
//! - [`TokenizerLoader`] - Loads `tokenizer.json`
//! - [`WeightsLoader`] - Finds `model.safetensors`, falling back to `pytorch_model.bin`
//!
//! Hub downloads land in the shared hf-hub cache, so only the first start
//! on a machine touches the network.

use hf_hub::{Repo, RepoType};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub revision: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, revision: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
            filename: filename.into(),
        }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        let hf_api = hf_hub::api::tokio::ApiBuilder::new()
            .with_chunk_size(None)
            .build()?;
        let hf_api = hf_api.repo(Repo::with_revision(
            self.repo.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        // Concurrent downloads of the same repo contend for the cache lock.
        let max_retries = 3;
        let mut attempt = 0;
        loop {
            match hf_api.get(self.filename.as_str()).await {
                Ok(path) => return Ok(path),
                Err(e)
                    if e.to_string().contains("Lock acquisition failed")
                        && attempt < max_retries - 1 =>
                {
                    let wait_time = std::time::Duration::from_millis(100 * (1 << attempt));
                    tracing::debug!(
                        repo = %self.repo,
                        file = %self.filename,
                        attempt,
                        "hub cache locked, retrying"
                    );
                    tokio::time::sleep(wait_time).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "Failed to fetch {} from {}@{}: {e}",
                        self.filename,
                        self.repo,
                        self.revision
                    ))
                }
            }
        }
    }
}

/// Location of the classifier's `config.json`, `tokenizer.json` and weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Hub { repo: String, revision: String },
    Local(PathBuf),
}

impl ModelSource {
    /// Resolve `filename` to a path on disk, downloading it if needed.
    pub async fn fetch(&self, filename: &str) -> anyhow::Result<PathBuf> {
        match self {
            ModelSource::Hub { repo, revision } => {
                HfLoader::new(repo, revision, filename).load().await
            }
            ModelSource::Local(dir) => {
                let path = dir.join(filename);
                if path.is_file() {
                    Ok(path)
                } else {
                    anyhow::bail!("{} not found in {}", filename, dir.display())
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    source: ModelSource,
}

impl TokenizerLoader {
    pub fn new(source: ModelSource) -> Self {
        Self { source }
    }

    pub async fn load(&self) -> anyhow::Result<Tokenizer> {
        let path = self.source.fetch("tokenizer.json").await?;
        Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Failed to load tokenizer {}: {e}", path.display())
        })
    }
}

#[derive(Debug, Clone)]
pub struct WeightsLoader {
    source: ModelSource,
}

impl WeightsLoader {
    pub fn new(source: ModelSource) -> Self {
        Self { source }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        match self.source.fetch("model.safetensors").await {
            Ok(path) => Ok(path),
            Err(safetensors_err) => self.source.fetch("pytorch_model.bin").await.map_err(|e| {
                anyhow::anyhow!(
                    "Model weights not found. Expected `model.safetensors` ({safetensors_err}) or `pytorch_model.bin` ({e})"
                )
            }),
        }
    }
}

/// Fetch and deserialize a JSON file such as `config.json`.
pub async fn load_json<T: DeserializeOwned>(source: &ModelSource, filename: &str) -> anyhow::Result<T> {
    let path = source.fetch(filename).await?;
    read_json(&path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))
}
