// Public modules
pub mod ai;
pub mod config;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod generator;
pub mod io;
pub mod models;
pub mod newsletter;
pub mod prompts;

// Re-export commonly used types
pub use ai::{GeneratedImage, ImageModel, TextModel};
pub use config::Config;
pub use error::NewsletterError;
pub use extractor::ResponseExtractor;
pub use gemini::{GeminiClient, GeminiConfig};
pub use generator::{NewsletterGenerator, Outcome, Phase, SessionState};
pub use io::{default_sessions_dir, list_session_files, load_session, save_session};
pub use models::{
    GenerationOptions, NewsArticle, NewsFormat, NewsletterDocument, RefinementDirective,
    SessionData, Tone,
};
pub use newsletter::NewsletterRenderer;
pub use prompts::PromptBuilder;
