use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SESSION_VERSION: &str = "1.0";

/// A news item returned by the search step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub link: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Formal,
    Enthusiastic,
    Informative,
    Witty,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Formal => "formal",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Informative => "informative",
            Tone::Witty => "witty",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "friendly" => Ok(Tone::Friendly),
            "formal" => Ok(Tone::Formal),
            "enthusiastic" => Ok(Tone::Enthusiastic),
            "informative" => Ok(Tone::Informative),
            "witty" => Ok(Tone::Witty),
            other => Err(format!(
                "Unknown tone '{}'. Use professional, friendly, formal, enthusiastic, informative or witty",
                other
            )),
        }
    }
}

/// How each article summary is laid out in the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsFormat {
    #[default]
    Paragraph,
    Bullets,
}

impl NewsFormat {
    pub fn describe(&self) -> &'static str {
        match self {
            NewsFormat::Paragraph => "a single paragraph",
            NewsFormat::Bullets => "a bulleted list (<ul> with <li> items)",
        }
    }
}

impl FromStr for NewsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paragraph" | "paragraphs" => Ok(NewsFormat::Paragraph),
            "bullets" | "bullet" | "bullet-points" => Ok(NewsFormat::Bullets),
            other => Err(format!("Unknown format '{}'. Use paragraph or bullets", other)),
        }
    }
}

/// User-supplied parameters, snapshotted when a generation cycle starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub topics: Vec<String>,
    pub industry: String,
    pub company_name: String,
    pub tone: Tone,
    pub news_format: NewsFormat,
    pub word_length: u32,
    pub additional_instructions: Option<String>,
    pub min_articles: usize,
    pub generate_image: bool,
    pub image_prompt: Option<String>,
    pub image_keywords: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            industry: String::new(),
            company_name: String::new(),
            tone: Tone::default(),
            news_format: NewsFormat::default(),
            word_length: 100,
            additional_instructions: None,
            min_articles: 5,
            generate_image: true,
            image_prompt: None,
            image_keywords: None,
        }
    }
}

impl GenerationOptions {
    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        for topic in topics {
            options.add_topic(topic.as_ref());
        }
        options
    }

    /// Adds a topic unless it is blank or already present (case-insensitive).
    /// Returns whether the topic was added.
    pub fn add_topic(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        if topic.is_empty() {
            return false;
        }
        let lower = topic.to_lowercase();
        if self.topics.iter().any(|t| t.to_lowercase() == lower) {
            return false;
        }
        self.topics.push(topic.to_string());
        true
    }

    /// Re-applies the topic rules to a list that may have been set directly.
    pub fn normalize_topics(&mut self) {
        let topics = std::mem::take(&mut self.topics);
        for topic in &topics {
            self.add_topic(topic);
        }
    }

    pub fn remove_topic(&mut self, topic: &str) {
        let lower = topic.trim().to_lowercase();
        self.topics.retain(|t| t.to_lowercase() != lower);
    }
}

/// The generated newsletter. `body_html` is always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewsletterDocument {
    pub body_html: String,
    pub header_image: Option<String>,
}

impl NewsletterDocument {
    pub fn new(body_html: impl Into<String>) -> Self {
        Self {
            body_html: body_html.into(),
            header_image: None,
        }
    }

    pub fn with_header_image(&self, data_uri: String) -> Self {
        Self {
            body_html: self.body_html.clone(),
            header_image: Some(data_uri),
        }
    }

    pub fn with_body(&self, body_html: String) -> Self {
        Self {
            body_html,
            header_image: self.header_image.clone(),
        }
    }
}

/// What a refinement response asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefinementDirective {
    Image { prompt: String },
    Html { body: String },
}

/// A finished session as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub version: String,
    pub created_at: String,
    pub updated_at: String,
    pub options: GenerationOptions,
    pub articles: Vec<NewsArticle>,
    pub document: NewsletterDocument,
}

impl SessionData {
    pub fn new(
        options: GenerationOptions,
        articles: Vec<NewsArticle>,
        document: NewsletterDocument,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: SESSION_VERSION.to_string(),
            created_at: now.clone(),
            updated_at: now,
            options,
            articles,
            document,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
