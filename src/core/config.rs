//! Runtime configuration for the triage service.
//!
//! Server settings come from command-line flags with environment-variable
//! fallbacks. Ingestion limits travel separately in [`Limits`] so tests can
//! shrink them without touching the CLI surface.

use crate::models::implementations::bert::{ComplaintBertOptions, DEFAULT_MODEL_ID};
use crate::pipelines::utils::DeviceRequest;
use clap::Parser;
use std::path::PathBuf;

/// Maximum number of records accepted in one bulk upload.
pub const MAX_RECORDS: usize = 20_000;

/// Cleaned messages are hard-cut to this many characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Number of messages fed to the model per forward pass.
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Enforced limits for bulk ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_records: usize,
    pub max_message_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_records: MAX_RECORDS,
            max_message_chars: MAX_MESSAGE_CHARS,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "complaint-triage",
    version,
    about = "Customer complaint sentiment and priority analyzer"
)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "TRIAGE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "TRIAGE_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Hugging Face repository holding the fine-tuned classifier
    #[arg(long, env = "TRIAGE_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    #[arg(long, env = "TRIAGE_MODEL_REVISION", default_value = "main")]
    pub revision: String,

    /// Load config.json, tokenizer.json and weights from this directory
    /// instead of the hub
    #[arg(long, env = "TRIAGE_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Messages per forward pass
    #[arg(long, env = "TRIAGE_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// Force CPU inference even when CUDA is available
    #[arg(long, env = "TRIAGE_CPU")]
    pub cpu: bool,

    #[arg(long, env = "TRIAGE_CUDA_DEVICE", conflicts_with = "cpu")]
    pub cuda_device: Option<usize>,

    /// Directory served under /static (index.html is served at /)
    #[arg(long, env = "TRIAGE_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "TRIAGE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn device_request(&self) -> DeviceRequest {
        match (self.cpu, self.cuda_device) {
            (true, _) => DeviceRequest::Cpu,
            (false, Some(index)) => DeviceRequest::Cuda(index),
            (false, None) => DeviceRequest::Default,
        }
    }

    pub fn model_options(&self) -> ComplaintBertOptions {
        ComplaintBertOptions {
            model_id: self.model_id.clone(),
            revision: self.revision.clone(),
            local_dir: self.model_dir.clone(),
            ..ComplaintBertOptions::default()
        }
    }
}

fn parse_batch_size(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
