pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod llm;
pub mod prompt;
pub mod service;
pub mod store;

pub use config::{ ServiceConfig, TrainingData };
pub use error::{ Error, Result };
pub use index::{ create_similarity_index, IndexBackend, SimilarityIndex };
pub use llm::LanguageModel;
pub use service::QueryService;
pub use store::ExampleStore;
