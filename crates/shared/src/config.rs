use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::gemini::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};

const APP_DIR: &str = "newsletter-gen";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key = var("GEMINI_API_KEY").or_else(|| var("API_KEY")).context(
            "GEMINI_API_KEY not found.\n\n\
            To fix this, create ~/.config/newsletter-gen/.env with:\n  \
            GEMINI_API_KEY=your_key_here\n\n\
            Get a Gemini API key from: https://aistudio.google.com/app/apikey",
        )?;

        let gemini_base_url = match var("GEMINI_BASE_URL") {
            Some(url) => {
                url::Url::parse(&url)
                    .with_context(|| format!("Invalid GEMINI_BASE_URL: {}", url))?;
                url
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        let text_model =
            var("NEWSLETTER_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string());
        let image_model =
            var("NEWSLETTER_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());

        let max_retries = match var("NEWSLETTER_MAX_RETRIES") {
            Some(value) => value
                .parse()
                .with_context(|| format!("NEWSLETTER_MAX_RETRIES must be a number, got {}", value))?,
            None => 2,
        };

        Ok(Self {
            gemini_api_key,
            gemini_base_url,
            text_model,
            image_model,
            max_retries,
        })
    }

    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_base_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/newsletter-gen/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

pub(crate) fn app_dir_name() -> &'static str {
    APP_DIR
}
