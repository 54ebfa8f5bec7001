use crate::models::{GenerationOptions, NewsArticle};

/// Renders the prompts sent to the text and image models.
///
/// All functions are deterministic: identical inputs always produce the
/// identical prompt string.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn news_query(topics: &[String], min_articles: usize) -> String {
        let topic_list = topics
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are a news research assistant. Use web search to find the most recent news about the topics below.

TOPICS:
{topic_list}

RULES:
1. Only include articles published within the past 7 days
2. Return at least {min_articles} articles in total across all topics
3. Each article must come from a real, reputable news source with a working link
4. Respond with ONLY a JSON array, with no explanation before or after it and no markdown code fences
5. Each element must be an object with exactly these fields: "title", "summary", "source", "link", "date"

Example response:
[{{"title": "Article headline", "summary": "Two or three sentence summary.", "source": "Publication name", "link": "https://example.com/article", "date": "YYYY-MM-DD"}}]"#
        )
    }

    pub fn draft(articles: &[NewsArticle], options: &GenerationOptions) -> String {
        let company = if options.company_name.trim().is_empty() {
            "our company".to_string()
        } else {
            options.company_name.trim().to_string()
        };
        let industry = if options.industry.trim().is_empty() {
            String::new()
        } else {
            format!(" in the {} industry", options.industry.trim())
        };
        let extra = match options.additional_instructions.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => format!("\n\nADDITIONAL INSTRUCTIONS:\n{}", text),
            _ => String::new(),
        };

        format!(
            r#"You are an expert newsletter writer for {company}{industry}. Write a newsletter in a {tone} tone based on the news articles below.

ARTICLES (JSON):
{articles}

STRUCTURE:
1. Start with a single <h1> containing one compelling newsletter title
2. A short introduction paragraph
3. One section per article, each with:
   - an <h2> heading with the article title
   - the article date
   - a summary of about {words} words written as {format}
   - a link to the original article attributed to its source, e.g. <a href="LINK">Read more at SOURCE</a>
4. A brief closing remark

FORMATTING RULES:
- Respond with ONLY the HTML fragment, starting with the <h1> element
- Do not include <html>, <head> or <body> tags
- Do not use <style> blocks or external stylesheets; use inline style attributes only{extra}"#,
            tone = options.tone,
            articles = Self::articles_json(articles),
            words = options.word_length,
            format = options.news_format.describe(),
        )
    }

    pub fn refinement(current_html: &str, articles: &[NewsArticle], directive: &str) -> String {
        format!(
            r#"You are editing an HTML newsletter. Apply the user's request to the current newsletter.

CURRENT NEWSLETTER HTML:
{current_html}

SOURCE ARTICLES (JSON, for context):
{articles}

USER REQUEST:
{directive}

RESPONSE RULES:
- If the request is about changing the header image, respond with ONLY this JSON object and nothing else:
  {{"requestType": "image", "newImagePrompt": "a detailed description of the new image"}}
- Otherwise respond with ONLY the complete, updated HTML fragment (starting with the <h1> element)
- Never mix JSON and HTML in one response, and never return a diff or partial fragment
- Do not use <style> blocks; inline style attributes only"#,
            articles = Self::articles_json(articles),
            directive = directive.trim(),
        )
    }

    /// Header image prompt. An explicit override wins; otherwise the prompt is
    /// composed from company, topics, industry and visual keywords.
    pub fn image(options: &GenerationOptions, fallback_keywords: &str) -> String {
        const NO_TEXT: &str =
            "Do not include any text, letters, words, numbers or logos in the image.";

        if let Some(custom) = options.image_prompt.as_deref().map(str::trim) {
            if !custom.is_empty() {
                return format!("{} {}", custom, NO_TEXT);
            }
        }

        let mut prompt = String::from("A visually striking, professional header image for a newsletter");
        if !options.company_name.trim().is_empty() {
            prompt.push_str(&format!(" from {}", options.company_name.trim()));
        }
        if !options.topics.is_empty() {
            prompt.push_str(&format!(" about {}", options.topics.join(", ")));
        }
        if !options.industry.trim().is_empty() {
            prompt.push_str(&format!(" in the {} industry", options.industry.trim()));
        }
        prompt.push('.');

        let keywords = options
            .image_keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(fallback_keywords);
        if !keywords.trim().is_empty() {
            prompt.push_str(&format!(" Visual style: {}.", keywords.trim()));
        }

        prompt.push(' ');
        prompt.push_str(NO_TEXT);
        prompt
    }

    fn articles_json(articles: &[NewsArticle]) -> String {
        // Serialising plain string fields cannot fail
        serde_json::to_string_pretty(articles).unwrap_or_else(|_| "[]".to_string())
    }
}
