use regex::Regex;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::NewsletterError;
use crate::models::{NewsArticle, RefinementDirective};

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json|html)?[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

/// Recovers structured payloads from free-form model output.
///
/// Model responses nominally hold one JSON array, one JSON object or one
/// HTML fragment, but they often arrive inside a markdown fence or with a
/// sentence of commentary around them. Every function here is pure and
/// reports a distinct error when nothing usable can be isolated.
pub struct ResponseExtractor;

impl ResponseExtractor {
    /// Trims the response and, if it contains a fenced block, returns the
    /// fenced contents. The second value tells whether a fence matched.
    pub fn strip_fences(raw: &str) -> (&str, bool) {
        let trimmed = raw.trim();
        match FENCE.captures(trimmed).and_then(|c| c.get(1)) {
            Some(inner) => (inner.as_str().trim(), true),
            None => (trimmed, false),
        }
    }

    /// Isolates the JSON array text: fenced contents if present, otherwise
    /// everything from the first `[` to the last `]`.
    pub fn isolate_json_array(raw: &str) -> Result<&str, NewsletterError> {
        let (text, fenced) = Self::strip_fences(raw);
        if fenced {
            return Ok(text);
        }

        match (text.find('['), text.rfind(']')) {
            (Some(start), Some(end)) if end > start => Ok(&text[start..=end]),
            _ => Err(NewsletterError::Extraction("a JSON array".to_string())),
        }
    }

    pub fn extract_json_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, NewsletterError> {
        let json = Self::isolate_json_array(raw)?;
        serde_json::from_str(json).map_err(|e| {
            tracing::debug!(error = %e, "JSON array failed to parse");
            NewsletterError::Parse(e.to_string())
        })
    }

    /// Parses the news-search response. An empty array is returned as-is;
    /// the caller decides that zero articles is a failure.
    pub fn extract_articles(raw: &str) -> Result<Vec<NewsArticle>, NewsletterError> {
        Self::extract_json_array(raw)
    }

    /// Isolates an HTML fragment. A full document is reduced to the inner
    /// HTML of its `<body>`.
    pub fn extract_html(raw: &str) -> Result<String, NewsletterError> {
        let (text, _) = Self::strip_fences(raw);

        let html = if text.to_ascii_lowercase().contains("<body") {
            Self::body_inner_html(text).unwrap_or_else(|| text.to_string())
        } else {
            text.to_string()
        };

        if html.trim().is_empty() {
            return Err(NewsletterError::Extraction("an HTML document".to_string()));
        }
        Ok(html)
    }

    fn body_inner_html(document: &str) -> Option<String> {
        let selector = Selector::parse("body").ok()?;
        let parsed = Html::parse_document(document);
        parsed
            .select(&selector)
            .next()
            .map(|body| body.inner_html().trim().to_string())
    }

    /// Classifies a refinement response as an image directive or a
    /// replacement HTML body.
    pub fn parse_refinement(raw: &str) -> Result<RefinementDirective, NewsletterError> {
        let (text, _) = Self::strip_fences(raw);

        if !(text.starts_with('{') && text.ends_with('}')) {
            return Self::extract_html(raw).map(|body| RefinementDirective::Html { body });
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| NewsletterError::Parse(e.to_string()))?;

        let request_type = value.get("requestType").and_then(Value::as_str);
        if request_type != Some("image") {
            return Err(NewsletterError::UnexpectedShape(
                "expected requestType \"image\"".to_string(),
            ));
        }

        match value.get("newImagePrompt").and_then(Value::as_str) {
            Some(prompt) if !prompt.trim().is_empty() => Ok(RefinementDirective::Image {
                prompt: prompt.trim().to_string(),
            }),
            _ => Err(NewsletterError::UnexpectedShape(
                "newImagePrompt is missing or empty".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_JSON: &str = r#"[{"title":"T","summary":"S","source":"Src","link":"http://x","date":"2024-01-01"}]"#;

    #[test]
    fn test_fenced_array_with_prose() {
        let raw = format!(
            "Here are the latest stories:\n```json\n{}\n```\nLet me know if you need more.",
            ARTICLE_JSON
        );
        assert_eq!(ResponseExtractor::isolate_json_array(&raw).unwrap(), ARTICLE_JSON);
    }

    #[test]
    fn test_fenced_array_yields_article_fields() {
        let raw = format!("```json\n{}\n```", ARTICLE_JSON);
        let articles = ResponseExtractor::extract_articles(&raw).unwrap();

        assert_eq!(
            articles,
            vec![NewsArticle {
                title: "T".to_string(),
                summary: "S".to_string(),
                source: "Src".to_string(),
                link: "http://x".to_string(),
                date: "2024-01-01".to_string(),
            }]
        );
    }

    #[test]
    fn test_untagged_fence() {
        let raw = "```\n[1, 2, 3]\n```";
        let values: Vec<i32> = ResponseExtractor::extract_json_array(raw).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_bracket_span_without_fence() {
        let raw = "Sure! [{\"a\": [1]}, {\"b\": 2}] Hope that helps.";
        assert_eq!(
            ResponseExtractor::isolate_json_array(raw).unwrap(),
            "[{\"a\": [1]}, {\"b\": 2}]"
        );
    }

    #[test]
    fn test_no_open_bracket_is_extraction_error() {
        let err = ResponseExtractor::isolate_json_array("No news today.]").unwrap_err();
        assert!(matches!(err, NewsletterError::Extraction(_)));
    }

    #[test]
    fn test_reversed_brackets_is_extraction_error() {
        let err = ResponseExtractor::isolate_json_array("oops ] then [").unwrap_err();
        assert!(matches!(err, NewsletterError::Extraction(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = ResponseExtractor::extract_articles("[{\"title\": \"T\",}]").unwrap_err();
        assert!(matches!(err, NewsletterError::Parse(_)));
    }

    #[test]
    fn test_objects_without_article_fields_are_parse_error() {
        let err = ResponseExtractor::extract_articles(r#"[{"unrelated":1}]"#).unwrap_err();
        assert!(matches!(err, NewsletterError::Parse(_)));
    }

    #[test]
    fn test_empty_array_is_returned_empty() {
        let articles = ResponseExtractor::extract_articles("```json\n[]\n```").unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_extraction_does_not_depend_on_call_count() {
        let raw = format!("prefix {} suffix", ARTICLE_JSON);
        let first = ResponseExtractor::extract_articles(&raw).unwrap();
        let second = ResponseExtractor::extract_articles(&raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_html_fence_is_stripped() {
        let raw = "```html\n<h1>Title</h1><p>Body</p>\n```\n";
        assert_eq!(
            ResponseExtractor::extract_html(raw).unwrap(),
            "<h1>Title</h1><p>Body</p>"
        );
    }

    #[test]
    fn test_bare_html_is_trimmed() {
        let raw = "\n  <h1>Hello</h1>\n<p>World</p>  \n";
        assert_eq!(
            ResponseExtractor::extract_html(raw).unwrap(),
            "<h1>Hello</h1>\n<p>World</p>"
        );
    }

    #[test]
    fn test_full_document_reduced_to_body() {
        let raw = "<!DOCTYPE html><html><head><title>x</title></head><body><h1>Hi</h1></body></html>";
        assert_eq!(ResponseExtractor::extract_html(raw).unwrap(), "<h1>Hi</h1>");
    }

    #[test]
    fn test_empty_html_is_extraction_error() {
        let err = ResponseExtractor::extract_html("```html\n\n```").unwrap_err();
        assert!(matches!(err, NewsletterError::Extraction(_)));
    }

    #[test]
    fn test_refinement_image_directive() {
        let raw = r#"{"requestType":"image","newImagePrompt":"mountains at dawn"}"#;
        assert_eq!(
            ResponseExtractor::parse_refinement(raw).unwrap(),
            RefinementDirective::Image {
                prompt: "mountains at dawn".to_string()
            }
        );
    }

    #[test]
    fn test_refinement_fenced_image_directive() {
        let raw = "```json\n{\"requestType\": \"image\", \"newImagePrompt\": \"a lighthouse\"}\n```";
        assert!(matches!(
            ResponseExtractor::parse_refinement(raw).unwrap(),
            RefinementDirective::Image { prompt } if prompt == "a lighthouse"
        ));
    }

    #[test]
    fn test_refinement_html_body() {
        let raw = "<h1>New</h1><p>Shorter intro.</p>";
        assert_eq!(
            ResponseExtractor::parse_refinement(raw).unwrap(),
            RefinementDirective::Html {
                body: raw.to_string()
            }
        );
    }

    #[test]
    fn test_refinement_object_without_prompt_is_unexpected_shape() {
        let err = ResponseExtractor::parse_refinement(r#"{"requestType":"image"}"#).unwrap_err();
        assert!(matches!(err, NewsletterError::UnexpectedShape(_)));
    }

    #[test]
    fn test_refinement_object_with_other_type_is_unexpected_shape() {
        let err =
            ResponseExtractor::parse_refinement(r#"{"requestType":"text","body":"x"}"#).unwrap_err();
        assert!(matches!(err, NewsletterError::UnexpectedShape(_)));
    }

    #[test]
    fn test_refinement_malformed_object_is_parse_error() {
        let err = ResponseExtractor::parse_refinement("{requestType: image}").unwrap_err();
        assert!(matches!(err, NewsletterError::Parse(_)));
    }
}
