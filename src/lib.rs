pub mod config;
pub mod debounce;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod prompt;

// Re-export main types for convenience
pub use config::{Config, Overrides, Settings};
pub use debounce::Debouncer;
pub use error::CorrectionError;
pub use gemini::GeminiClient;
pub use message::{Author, CorrectionState, Message, MessageId, MessageStore};
pub use pipeline::{CorrectionPipeline, Corrector, PipelineEvent};
