use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::NewsletterDocument;

/// Turns a generated document into files a person can open, print or paste.
pub struct NewsletterRenderer;

impl NewsletterRenderer {
    /// Text of the first `<h1>` in the body, if any
    pub fn title(document: &NewsletterDocument) -> Option<String> {
        let selector = Selector::parse("h1").ok()?;
        let fragment = Html::parse_fragment(&document.body_html);
        let heading = fragment.select(&selector).next()?;
        let text = heading
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Wraps the fragment in a standalone page with the header image on top.
    pub fn render_page(document: &NewsletterDocument, date: DateTime<Utc>) -> String {
        let mut html = String::new();

        let title = Self::title(document).unwrap_or_else(|| "Newsletter".to_string());

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str(
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
        html.push_str(&format!("  <title>{}</title>\n", Self::escape_html(&title)));
        html.push_str("</head>\n");
        html.push_str("<body style=\"font-family: Arial, sans-serif; max-width: 720px; margin: 40px auto; padding: 0 20px; line-height: 1.6; color: #2c3e50;\">\n");

        if let Some(image) = &document.header_image {
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\" style=\"display: block; width: 100%; height: auto; border-radius: 8px; margin-bottom: 24px;\">\n",
                Self::escape_html(image),
                Self::escape_html(&title)
            ));
        }

        html.push_str(&document.body_html);
        html.push('\n');

        html.push_str(&format!(
            "<p style=\"margin-top: 40px; color: #7f8c8d; font-size: 0.8em; text-align: center;\">Generated {}</p>\n",
            date.format("%A, %-d %B %Y")
        ));

        html.push_str("</body>\n</html>");
        html
    }

    pub fn to_plain_text(document: &NewsletterDocument, width: usize) -> String {
        html2text::from_read(document.body_html.as_bytes(), width)
    }

    pub fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Lowercase, dash-separated file name stem
    pub fn slug(name: &str) -> String {
        let slug = name
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        if slug.is_empty() {
            "newsletter".to_string()
        } else {
            slug
        }
    }

    pub fn default_output_dir() -> PathBuf {
        dirs::document_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn save_page(content: &str, slug: &str, date: DateTime<Utc>, dir: &Path) -> Result<PathBuf> {
        Self::save(content, slug, date, dir, "html").context("Failed to write newsletter HTML file")
    }

    pub fn save_text(content: &str, slug: &str, date: DateTime<Utc>, dir: &Path) -> Result<PathBuf> {
        Self::save(content, slug, date, dir, "txt").context("Failed to write newsletter text file")
    }

    fn save(content: &str, slug: &str, date: DateTime<Utc>, dir: &Path, ext: &str) -> Result<PathBuf> {
        let filename = format!("{}-{}.{}", slug, date.format("%Y-%m-%d"), ext);

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let filepath = dir.join(filename);

        fs::write(&filepath, content)?;

        Ok(filepath)
    }
}
