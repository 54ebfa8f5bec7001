use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{
    default_sessions_dir, save_session, Config, GeminiClient, GenerationOptions, NewsFormat,
    NewsletterGenerator, NewsletterRenderer, Outcome, SessionData, Tone,
};
use std::io::{self as stdio, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "generate-newsletter")]
#[command(about = "Research recent news on your topics and draft an HTML newsletter with Gemini")]
struct Args {
    /// Topic to cover (repeat the flag or separate with commas)
    #[arg(short, long = "topic")]
    topics: Vec<String>,

    /// Industry the newsletter is written for
    #[arg(short, long, default_value = "")]
    industry: String,

    /// Company name used in the newsletter voice
    #[arg(short, long, default_value = "")]
    company: String,

    /// Writing tone (professional, friendly, formal, enthusiastic, informative, witty)
    #[arg(long, default_value = "professional")]
    tone: Tone,

    /// Summary layout for each article (paragraph, bullets)
    #[arg(long, default_value = "paragraph")]
    format: NewsFormat,

    /// Approximate words per article summary
    #[arg(short, long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..))]
    words: u32,

    /// Minimum number of articles to request
    #[arg(
        short,
        long,
        default_value = "5",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    min_articles: usize,

    /// Extra instructions for the writer
    #[arg(long)]
    instructions: Option<String>,

    /// Skip header image generation
    #[arg(long)]
    no_image: bool,

    /// Use this prompt for the header image instead of composing one
    #[arg(long)]
    image_prompt: Option<String>,

    /// Visual keywords for the header image (e.g. "watercolor, warm light")
    #[arg(long)]
    image_keywords: Option<String>,

    /// Also write a plain-text version
    #[arg(long)]
    text: bool,

    /// Directory for the generated files (defaults to ~/Documents)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn prompt_topics() -> Result<Vec<String>> {
    print!("Which topics should the newsletter cover? (comma-separated): ");
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;

    Ok(input.split(',').map(|t| t.to_string()).collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(stdio::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let raw_topics: Vec<String> = if args.topics.is_empty() {
        prompt_topics()?
    } else {
        args.topics
            .iter()
            .flat_map(|t| t.split(','))
            .map(|t| t.to_string())
            .collect()
    };

    let mut options = GenerationOptions::with_topics(&raw_topics);
    options.industry = args.industry;
    options.company_name = args.company;
    options.tone = args.tone;
    options.news_format = args.format;
    options.word_length = args.words;
    options.min_articles = args.min_articles;
    options.additional_instructions = args.instructions;
    options.generate_image = !args.no_image;
    options.image_prompt = args.image_prompt;
    options.image_keywords = args.image_keywords;

    if options.topics.is_empty() {
        anyhow::bail!("Please provide at least one topic.");
    }

    println!("\n✓ Topics: {}", options.topics.join(", "));
    tracing::info!(
        topics = options.topics.len(),
        words = options.word_length,
        min_articles = options.min_articles,
        image = options.generate_image,
        "Starting generation"
    );

    let client = Arc::new(GeminiClient::new(config.gemini())?);
    let generator = NewsletterGenerator::new(client.clone(), client);

    println!("\n🤖 Searching for news and drafting the newsletter with Gemini...");
    println!("  (This may take a minute...)");

    let document = match generator.run_generation(options.clone()).await {
        Outcome::Completed(document) => document,
        Outcome::Partial { document, error } => {
            tracing::warn!(%error, "Newsletter drafted without a header image");
            println!("\n⚠ {}", error);
            document
        }
        Outcome::Failed(message) => anyhow::bail!(message),
        Outcome::Skipped => anyhow::bail!("A generation is already running."),
    };

    let state = generator.snapshot();
    println!("✓ Drafted from {} articles:", state.articles.len());
    for article in &state.articles {
        println!("  • {} ({})", article.title, article.source);
    }

    let now = Utc::now();
    let slug = if options.company_name.trim().is_empty() {
        NewsletterRenderer::slug(&options.topics.join(" "))
    } else {
        NewsletterRenderer::slug(&options.company_name)
    };

    let session = SessionData::new(options, state.articles, document.clone());
    let session_name = format!("{}-{}.json", slug, now.format("%Y-%m-%d-%H%M%S"));
    let session_path = save_session(&session, &default_sessions_dir()?, &session_name)
        .context("Failed to save session")?;
    tracing::info!(path = %session_path.display(), "Session saved");

    println!("\n📝 Rendering newsletter...");
    let output_dir = args
        .output_dir
        .unwrap_or_else(NewsletterRenderer::default_output_dir);
    let page = NewsletterRenderer::render_page(&document, now);
    let page_path = NewsletterRenderer::save_page(&page, &slug, now, &output_dir)?;
    tracing::info!(path = %page_path.display(), "Newsletter page written");
    println!("✓ HTML saved to: {}", page_path.display());

    if args.text {
        let text = NewsletterRenderer::to_plain_text(&document, 80);
        let text_path = NewsletterRenderer::save_text(&text, &slug, now, &output_dir)?;
        println!("✓ Text saved to: {}", text_path.display());
    }

    println!("\n✅ Done! Refine it with: refine-newsletter --file {}", session_path.display());

    Ok(())
}
