pub mod bert;

pub use bert::{BertForSequenceClassification, ComplaintBertModel, ComplaintBertOptions};
