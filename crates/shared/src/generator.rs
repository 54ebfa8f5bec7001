use std::sync::{Mutex, MutexGuard};

use crate::ai::{ImageModel, TextModel};
use crate::error::NewsletterError;
use crate::extractor::ResponseExtractor;
use crate::models::{GenerationOptions, NewsArticle, NewsletterDocument, RefinementDirective};
use crate::prompts::PromptBuilder;

pub const DEFAULT_IMAGE_KEYWORDS: &str = "modern, clean, professional, vibrant colors";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Refining,
}

/// Everything a presentation layer needs to render the current session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub error: Option<String>,
    pub options: Option<GenerationOptions>,
    pub articles: Vec<NewsArticle>,
    pub document: Option<NewsletterDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(NewsletterDocument),
    /// The draft was produced but the header image was not.
    Partial {
        document: NewsletterDocument,
        error: String,
    },
    Failed(String),
    /// Another cycle was already in flight; nothing was done.
    Skipped,
}

/// Sequences the news → draft → image calls and the refinement call.
///
/// At most one cycle runs at a time: an entry point called while another
/// cycle is active returns [`Outcome::Skipped`] without touching the session.
/// Every failure is converted into a message on the session state.
pub struct NewsletterGenerator<T, I> {
    text: T,
    image: I,
    state: Mutex<SessionState>,
}

/// Returns the session to idle when the cycle ends, however it ends.
struct CycleGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.phase = Phase::Idle;
    }
}

impl<T: TextModel, I: ImageModel> NewsletterGenerator<T, I> {
    pub fn new(text: T, image: I) -> Self {
        Self {
            text,
            image,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Resumes a previously saved session so it can be refined.
    pub fn restore(
        text: T,
        image: I,
        options: GenerationOptions,
        articles: Vec<NewsArticle>,
        document: NewsletterDocument,
    ) -> Self {
        let generator = Self::new(text, image);
        {
            let mut state = generator.lock();
            state.options = Some(options);
            state.articles = articles;
            state.document = Some(document);
        }
        generator
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, phase: Phase) -> Option<CycleGuard<'_>> {
        let mut state = self.lock();
        if state.phase != Phase::Idle {
            tracing::debug!(active = ?state.phase, requested = ?phase, "Cycle already running");
            return None;
        }
        state.phase = phase;
        state.error = None;
        Some(CycleGuard { state: &self.state })
    }

    fn fail(&self, err: NewsletterError) -> Outcome {
        let message = err.to_string();
        tracing::error!(error = ?err, "Newsletter cycle failed");
        self.lock().error = Some(message.clone());
        Outcome::Failed(message)
    }

    pub async fn run_generation(&self, mut options: GenerationOptions) -> Outcome {
        let Some(_guard) = self.begin(Phase::Generating) else {
            return Outcome::Skipped;
        };

        options.normalize_topics();
        if let Err(e) = Self::validate(&options) {
            return self.fail(e);
        }

        {
            let mut state = self.lock();
            state.options = Some(options.clone());
            state.articles.clear();
            state.document = None;
        }

        tracing::info!(topics = ?options.topics, "Starting newsletter generation");

        let articles = match self.fetch_news(&options).await {
            Ok(articles) => articles,
            Err(e) => return self.fail(e),
        };
        self.lock().articles = articles.clone();

        let document = match self.draft(&articles, &options).await {
            Ok(document) => document,
            Err(e) => return self.fail(e),
        };
        self.lock().document = Some(document.clone());

        if !options.generate_image {
            return Outcome::Completed(document);
        }

        let prompt = PromptBuilder::image(&options, DEFAULT_IMAGE_KEYWORDS);
        match self.image.generate_image(&prompt).await {
            Ok(image) => {
                let document = document.with_header_image(image.to_data_uri());
                self.lock().document = Some(document.clone());
                tracing::info!("Newsletter generation finished");
                Outcome::Completed(document)
            }
            Err(e) => {
                let error = format!("The newsletter was generated, but the header image failed: {}", e);
                tracing::warn!(error = %error, "Keeping draft without header image");
                self.lock().error = Some(error.clone());
                Outcome::Partial { document, error }
            }
        }
    }

    fn validate(options: &GenerationOptions) -> Result<(), NewsletterError> {
        if options.topics.is_empty() {
            return Err(NewsletterError::validation(
                "Please add at least one topic before generating a newsletter.",
            ));
        }
        if options.word_length == 0 {
            return Err(NewsletterError::validation(
                "The summary length must be at least one word.",
            ));
        }
        if options.min_articles == 0 {
            return Err(NewsletterError::validation(
                "Ask for at least one article.",
            ));
        }
        Ok(())
    }

    async fn fetch_news(
        &self,
        options: &GenerationOptions,
    ) -> Result<Vec<NewsArticle>, NewsletterError> {
        let prompt = PromptBuilder::news_query(&options.topics, options.min_articles);
        let response = self.text.generate_text(&prompt, true).await?;
        let articles = ResponseExtractor::extract_articles(&response)?;
        if articles.is_empty() {
            return Err(NewsletterError::EmptyResult);
        }
        tracing::info!(count = articles.len(), "Fetched news articles");
        Ok(articles)
    }

    async fn draft(
        &self,
        articles: &[NewsArticle],
        options: &GenerationOptions,
    ) -> Result<NewsletterDocument, NewsletterError> {
        let prompt = PromptBuilder::draft(articles, options);
        let response = self.text.generate_text(&prompt, false).await?;
        let body = ResponseExtractor::extract_html(&response)?;
        Ok(NewsletterDocument::new(body))
    }

    pub async fn run_refinement(&self, directive: &str) -> Outcome {
        let Some(_guard) = self.begin(Phase::Refining) else {
            return Outcome::Skipped;
        };

        let directive = directive.trim();
        if directive.is_empty() {
            return self.fail(NewsletterError::validation(
                "Please describe the change you want to make.",
            ));
        }

        let (current, articles) = {
            let state = self.lock();
            (state.document.clone(), state.articles.clone())
        };
        let Some(current) = current else {
            return self.fail(NewsletterError::validation(
                "Generate a newsletter before asking for changes.",
            ));
        };

        tracing::info!(directive, "Refining newsletter");

        match self.refine(&current, &articles, directive).await {
            Ok(document) => {
                self.lock().document = Some(document.clone());
                Outcome::Completed(document)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn refine(
        &self,
        current: &NewsletterDocument,
        articles: &[NewsArticle],
        directive: &str,
    ) -> Result<NewsletterDocument, NewsletterError> {
        let prompt = PromptBuilder::refinement(&current.body_html, articles, directive);
        let response = self.text.generate_text(&prompt, false).await?;

        match ResponseExtractor::parse_refinement(&response)? {
            RefinementDirective::Image { prompt } => {
                tracing::debug!(%prompt, "Refinement requested a new header image");
                let image = self.image.generate_image(&prompt).await?;
                Ok(current.with_header_image(image.to_data_uri()))
            }
            RefinementDirective::Html { body } => Ok(current.with_body(body)),
        }
    }
}
