//! BERT sequence classifier used for complaint sentiment.
//!
//! Classic post-norm BERT encoder with learned absolute position embeddings,
//! a tanh pooler over the `[CLS]` token and a linear classification head.
//! The weight layout follows `BertForSequenceClassification` checkpoints:
//!
//! - `bert.embeddings.{word,position,token_type}_embeddings`, `bert.embeddings.LayerNorm`
//! - `bert.encoder.layer.{i}.attention.self.{query,key,value}`
//! - `bert.encoder.layer.{i}.attention.output.{dense,LayerNorm}`
//! - `bert.encoder.layer.{i}.{intermediate,output}.dense`, `bert.encoder.layer.{i}.output.LayerNorm`
//! - `bert.pooler.dense`, `classifier`

use crate::core::ModelOptions;
use crate::loaders::{load_json, ModelSource, TokenizerLoader, WeightsLoader};
use crate::pipelines::sentiment_analysis_pipeline::Sentiment;
use anyhow::Error as E;
use anyhow::Result as AnyhowResult;
use candle_core::{DType, Device, IndexOp, Result, Tensor, D};
use candle_nn::{
    embedding, linear, ops::softmax, Embedding, LayerNorm, Linear, Module, VarBuilder,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

/// Fine-tuned complaint classifier published on the Hugging Face Hub.
pub const DEFAULT_MODEL_ID: &str = "HrishiShah/customer-complaint-priority-bert";

/// Token budget per message. Longer inputs are truncated by the tokenizer.
pub const MAX_SEQUENCE_TOKENS: usize = 64;

const MIN_VALUE_F64: f64 = f32::MIN as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum HiddenAct {
    #[default]
    #[serde(rename = "gelu")]
    Gelu,
    #[serde(alias = "gelu_new", alias = "gelu_pytorch_tanh")]
    GeluApproximate,
    #[serde(rename = "relu")]
    Relu,
}

impl HiddenAct {
    fn apply(self, xs: &Tensor) -> Result<Tensor> {
        match self {
            HiddenAct::Gelu => xs.gelu_erf(),
            HiddenAct::GeluApproximate => xs.gelu(),
            HiddenAct::Relu => xs.relu(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    #[serde(default)]
    pub hidden_act: HiddenAct,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

fn default_type_vocab_size() -> usize {
    2
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl Config {
    /// Number of output classes; checkpoints without `id2label` are assumed
    /// to use the three sentiment classes.
    pub fn num_labels(&self) -> usize {
        if self.id2label.is_empty() {
            Sentiment::ALL.len()
        } else {
            self.id2label.len()
        }
    }
}

/// Loads a LayerNorm, accepting both `weight`/`bias` and the older
/// `gamma`/`beta` tensor names.
fn layer_norm(size: usize, eps: f64, vb: VarBuilder) -> Result<LayerNorm> {
    match candle_nn::layer_norm(size, eps, vb.clone()) {
        Ok(norm) => Ok(norm),
        Err(_) => {
            let weight = vb.get(size, "gamma")?;
            let bias = vb.get(size, "beta")?;
            Ok(LayerNorm::new(weight, bias, eps))
        }
    }
}

#[derive(Debug, Clone)]
struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    norm: LayerNorm,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            word_embeddings: embedding(
                config.vocab_size,
                config.hidden_size,
                vb.pp("word_embeddings"),
            )?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type_embeddings: embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, input_ids: &Tensor, token_type_ids: &Tensor) -> Result<Tensor> {
        let seq_len = input_ids.dim(1)?;
        let positions = Tensor::arange(0u32, seq_len as u32, input_ids.device())?.unsqueeze(0)?;

        let embeddings = input_ids
            .apply(&self.word_embeddings)?
            .broadcast_add(&positions.apply(&self.position_embeddings)?)?;
        let embeddings = (embeddings + token_type_ids.apply(&self.token_type_embeddings)?)?;
        embeddings.apply(&self.norm)
    }
}

/// Multi-head self-attention followed by the residual output projection.
#[derive(Debug, Clone)]
struct Attention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    output_norm: LayerNorm,
    num_attention_heads: usize,
    attention_head_size: usize,
}

impl Attention {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let hidden_size = config.hidden_size;
        Ok(Self {
            query: linear(hidden_size, hidden_size, vb.pp("self.query"))?,
            key: linear(hidden_size, hidden_size, vb.pp("self.key"))?,
            value: linear(hidden_size, hidden_size, vb.pp("self.value"))?,
            output: linear(hidden_size, hidden_size, vb.pp("output.dense"))?,
            output_norm: layer_norm(
                hidden_size,
                config.layer_norm_eps,
                vb.pp("output.LayerNorm"),
            )?,
            num_attention_heads: config.num_attention_heads,
            attention_head_size: hidden_size / config.num_attention_heads,
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize, seq_len: usize) -> Result<Tensor> {
        xs.reshape((
            batch,
            seq_len,
            self.num_attention_heads,
            self.attention_head_size,
        ))?
        .transpose(1, 2)?
        .contiguous()
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, hidden_size) = hidden_states.dims3()?;

        let q = self.split_heads(&hidden_states.apply(&self.query)?, batch, seq_len)?;
        let k = self.split_heads(&hidden_states.apply(&self.key)?, batch, seq_len)?;
        let v = self.split_heads(&hidden_states.apply(&self.value)?, batch, seq_len)?;

        let scale = (self.attention_head_size as f64).powf(-0.5);
        let q = (q * scale)?;

        let attention_scores = q.matmul(&k.transpose(D::Minus2, D::Minus1)?.contiguous()?)?;
        let attention_scores = attention_scores.broadcast_add(attention_mask)?;
        let attention_probs = softmax(&attention_scores, D::Minus1)?;

        let context = attention_probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden_size))?;

        let output = context.apply(&self.output)?;
        (output + hidden_states)?.apply(&self.output_norm)
    }
}

#[derive(Debug, Clone)]
struct FeedForward {
    intermediate: Linear,
    output: Linear,
    norm: LayerNorm,
    activation: HiddenAct,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate.dense"),
            )?,
            output: linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output.dense"),
            )?,
            norm: layer_norm(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("output.LayerNorm"),
            )?,
            activation: config.hidden_act,
        })
    }
}

impl Module for FeedForward {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let hidden = self.activation.apply(&xs.apply(&self.intermediate)?)?;
        (hidden.apply(&self.output)? + xs)?.apply(&self.norm)
    }
}

#[derive(Debug, Clone)]
struct TransformerLayer {
    attention: Attention,
    feed_forward: FeedForward,
}

impl TransformerLayer {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            attention: Attention::load(vb.pp("attention"), config)?,
            feed_forward: FeedForward::load(vb, config)?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        self.attention
            .forward(hidden_states, attention_mask)?
            .apply(&self.feed_forward)
    }
}

/// Encoder weights shared by every clone of the model.
#[derive(Debug, Clone)]
pub struct ModelWeights {
    embeddings: Embeddings,
    layers: Vec<TransformerLayer>,
    pooler: Linear,
    dtype: DType,
}

impl ModelWeights {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let embeddings = Embeddings::load(vb.pp("embeddings"), config)?;

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for layer_idx in 0..config.num_hidden_layers {
            layers.push(TransformerLayer::load(
                vb.pp(format!("encoder.layer.{layer_idx}")),
                config,
            )?);
        }

        let pooler = linear(config.hidden_size, config.hidden_size, vb.pp("pooler.dense"))?;

        Ok(Self {
            embeddings,
            layers,
            pooler,
            dtype: vb.dtype(),
        })
    }

    /// Turn a `(batch, seq_len)` padding mask of ones and zeros into an
    /// additive `(batch, 1, 1, seq_len)` mask.
    fn create_attention_mask(&self, mask: &Tensor) -> Result<Tensor> {
        let (batch_size, seq_len) = mask.dims2()?;
        let mask = mask
            .to_dtype(self.dtype)?
            .reshape((batch_size, 1, 1, seq_len))?;
        let inverted_mask = (1.0 - mask)?;
        (inverted_mask * MIN_VALUE_F64)?.to_dtype(self.dtype)
    }

    /// Pooled `[CLS]` representation with shape `(batch_size, hidden_size)`.
    fn forward_pooled(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let mask = self.create_attention_mask(attention_mask)?;

        let mut hidden_states = self.embeddings.forward(input_ids, token_type_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &mask)?;
        }

        hidden_states.i((.., 0))?.apply(&self.pooler)?.tanh()
    }
}

/// BERT model for sequence classification.
#[derive(Debug, Clone)]
pub struct BertForSequenceClassification {
    weights: Arc<ModelWeights>,
    classifier: Linear,
}

impl BertForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let weights = Arc::new(ModelWeights::load(vb.pp("bert"), config)?);
        let classifier = linear(config.hidden_size, config.num_labels(), vb.pp("classifier"))?;
        Ok(Self {
            weights,
            classifier,
        })
    }

    /// Classification logits with shape `(batch_size, num_labels)`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        self.weights
            .forward_pooled(input_ids, token_type_ids, attention_mask)?
            .apply(&self.classifier)
    }
}

/// Where to find the complaint classifier and how to tokenize for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintBertOptions {
    pub model_id: String,
    pub revision: String,
    /// Directory with `config.json`, `tokenizer.json` and weights; takes
    /// precedence over the hub.
    pub local_dir: Option<PathBuf>,
    pub max_length: usize,
}

impl Default for ComplaintBertOptions {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: "main".to_string(),
            local_dir: None,
            max_length: MAX_SEQUENCE_TOKENS,
        }
    }
}

impl ComplaintBertOptions {
    pub fn source(&self) -> ModelSource {
        match &self.local_dir {
            Some(dir) => ModelSource::Local(dir.clone()),
            None => ModelSource::Hub {
                repo: self.model_id.clone(),
                revision: self.revision.clone(),
            },
        }
    }
}

impl ModelOptions for ComplaintBertOptions {
    fn cache_key(&self) -> String {
        match &self.local_dir {
            Some(dir) => format!("complaint-bert-local:{}", dir.display()),
            None => format!("complaint-bert:{}@{}", self.model_id, self.revision),
        }
    }
}

/// Complaint sentiment classifier: BERT weights plus the device they live on.
#[derive(Clone)]
pub struct ComplaintBertModel {
    model: BertForSequenceClassification,
    device: Device,
}

impl ComplaintBertModel {
    pub async fn new(options: ComplaintBertOptions, device: Device) -> AnyhowResult<Self> {
        let source = options.source();

        let config: Config = load_json(&source, "config.json").await?;
        if config.num_labels() != Sentiment::ALL.len() {
            anyhow::bail!(
                "Classifier exposes {} labels, expected {} ({:?})",
                config.num_labels(),
                Sentiment::ALL.len(),
                Sentiment::ALL
            );
        }

        let weights_filename = WeightsLoader::new(source).load().await?;

        let dtype = DType::F32;
        let vb = if weights_filename
            .extension()
            .is_some_and(|ext| ext == "safetensors")
        {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_filename], dtype, &device)? }
        } else if weights_filename
            .extension()
            .is_some_and(|ext| ext == "bin")
        {
            VarBuilder::from_pth(&weights_filename, dtype, &device)?
        } else {
            anyhow::bail!("Unsupported weight file format: {:?}", weights_filename);
        };

        let model = BertForSequenceClassification::load(vb, &config)?;
        tracing::info!(
            cache_key = %options.cache_key(),
            layers = config.num_hidden_layers,
            hidden_size = config.hidden_size,
            device = ?device.location(),
            "loaded complaint classifier"
        );

        Ok(Self { model, device })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Class probabilities for each text, one row per input in input order.
    /// The tokenizer must pad to a common length.
    pub fn predict_probabilities(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
    ) -> AnyhowResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| E::msg(format!("Tokenization error: {e}")))?;

        let seq_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len())
            .max()
            .unwrap_or(0);
        if encodings
            .iter()
            .any(|encoding| encoding.get_ids().len() != seq_len)
        {
            anyhow::bail!("Tokenizer returned ragged batch; padding is not configured");
        }

        let mut input_ids = Vec::with_capacity(texts.len() * seq_len);
        let mut type_ids = Vec::with_capacity(texts.len() * seq_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * seq_len);
        for encoding in &encodings {
            input_ids.extend_from_slice(encoding.get_ids());
            type_ids.extend_from_slice(encoding.get_type_ids());
            attention_mask.extend_from_slice(encoding.get_attention_mask());
        }

        let shape = (texts.len(), seq_len);
        let input_ids = Tensor::from_vec(input_ids, shape, &self.device)?;
        let type_ids = Tensor::from_vec(type_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, shape, &self.device)?;

        let logits = self.model.forward(&input_ids, &type_ids, &attention_mask)?;
        Ok(logits_to_probabilities(&logits)?)
    }

    /// Load the tokenizer with truncation and batch padding configured.
    pub async fn get_tokenizer(options: ComplaintBertOptions) -> AnyhowResult<Tokenizer> {
        let mut tokenizer = TokenizerLoader::new(options.source()).load().await?;
        configure_tokenizer(&mut tokenizer, options.max_length)?;
        Ok(tokenizer)
    }
}

fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> AnyhowResult<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| E::msg(format!("Failed to configure truncation: {e}")))?;

    let pad_token_id = tokenizer.get_padding().map_or(0, |p| p.pad_id);
    let pp = PaddingParams {
        strategy: tokenizers::PaddingStrategy::BatchLongest,
        pad_id: pad_token_id,
        pad_token: tokenizer
            .id_to_token(pad_token_id)
            .unwrap_or_else(|| "[PAD]".to_string()),
        ..Default::default()
    };
    tokenizer.with_padding(Some(pp));
    Ok(())
}

/// Softmax over the label dimension of a `(batch, num_labels)` logits tensor.
fn logits_to_probabilities(logits: &Tensor) -> Result<Vec<Vec<f32>>> {
    softmax(&logits.to_dtype(DType::F32)?, D::Minus1)?.to_vec2::<f32>()
}

impl crate::pipelines::sentiment_analysis_pipeline::model::SentimentAnalysisModel
    for ComplaintBertModel
{
    type Options = ComplaintBertOptions;

    async fn new(options: Self::Options, device: Device) -> AnyhowResult<Self> {
        ComplaintBertModel::new(options, device).await
    }

    fn predict_probabilities(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
    ) -> AnyhowResult<Vec<Vec<f32>>> {
        self.predict_probabilities(tokenizer, texts)
    }

    async fn get_tokenizer(options: Self::Options) -> AnyhowResult<Tokenizer> {
        ComplaintBertModel::get_tokenizer(options).await
    }

    fn device(&self) -> &Device {
        self.device()
    }
}
