use tokenizers::Tokenizer;

#[allow(async_fn_in_trait)]
pub trait SentimentAnalysisModel {
    type Options: std::fmt::Debug + Clone;

    async fn new(options: Self::Options, device: candle_core::Device) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Probability distribution over [`Sentiment::ALL`](super::Sentiment::ALL)
    /// for every text, in input order.
    fn predict_probabilities(
        &self,
        tokenizer: &Tokenizer,
        texts: &[&str],
    ) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer>;

    fn device(&self) -> &candle_core::Device;
}
