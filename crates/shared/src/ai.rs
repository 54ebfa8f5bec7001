use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::error::NewsletterError;

/// Text generation boundary. Responses are untrusted free-form text.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate_text(&self, prompt: &str, use_search: bool)
        -> Result<String, NewsletterError>;
}

/// Image generation boundary.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, NewsletterError>;
}

// One client can serve as both boundaries when shared through an Arc
#[async_trait]
impl<T: TextModel + ?Sized> TextModel for Arc<T> {
    async fn generate_text(
        &self,
        prompt: &str,
        use_search: bool,
    ) -> Result<String, NewsletterError> {
        (**self).generate_text(prompt, use_search).await
    }
}

#[async_trait]
impl<T: ImageModel + ?Sized> ImageModel for Arc<T> {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, NewsletterError> {
        (**self).generate_image(prompt).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/png".to_string(),
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}
