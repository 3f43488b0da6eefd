pub mod implementations;

pub use implementations::{ComplaintBertModel, ComplaintBertOptions};
