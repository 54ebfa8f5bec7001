use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{
    default_sessions_dir, list_session_files, load_session, save_session, Config, GeminiClient,
    NewsletterGenerator, NewsletterRenderer, Outcome,
};
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "refine-newsletter")]
#[command(about = "Revise a generated newsletter with a plain-language request")]
struct Args {
    /// Path to the session file (if not provided, will list available sessions)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// What to change, e.g. "make the intro shorter" or "use a photo of mountains"
    directive: Vec<String>,

    /// Also write a plain-text version
    #[arg(long)]
    text: bool,

    /// Directory for the generated files (defaults to ~/Documents)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let session_file = if let Some(path) = args.file {
        path
    } else {
        select_session_file()?
    };

    println!("📖 Reading session: {}", session_file.display());
    let mut session = load_session(&session_file)?;
    tracing::info!(
        path = %session_file.display(),
        articles = session.articles.len(),
        "Session loaded"
    );

    let directive = if args.directive.is_empty() {
        prompt_directive()?
    } else {
        args.directive.join(" ")
    };

    let client = Arc::new(GeminiClient::new(config.gemini())?);
    let generator = NewsletterGenerator::restore(
        client.clone(),
        client,
        session.options.clone(),
        session.articles.clone(),
        session.document.clone(),
    );

    println!("\n🤖 Applying your changes with Gemini...");
    let document = match generator.run_refinement(&directive).await {
        Outcome::Completed(document) => document,
        Outcome::Partial { document, error } => {
            tracing::warn!(%error, "Refinement finished with a warning");
            document
        }
        Outcome::Failed(message) => anyhow::bail!(message),
        Outcome::Skipped => anyhow::bail!("A refinement is already running."),
    };

    if document.header_image != session.document.header_image {
        println!("✓ Header image replaced");
    } else {
        println!("✓ Newsletter content updated");
    }

    session.document = document.clone();
    session.touch();

    let dir = session_file
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let filename = session_file
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid session filename"))?;
    save_session(&session, &dir, filename).context("Failed to update session file")?;
    tracing::info!(path = %session_file.display(), "Session updated");

    let now = Utc::now();
    let slug = extract_slug(filename);
    let output_dir = args
        .output_dir
        .unwrap_or_else(NewsletterRenderer::default_output_dir);

    println!("\n📝 Rendering newsletter...");
    let page = NewsletterRenderer::render_page(&document, now);
    let page_path = NewsletterRenderer::save_page(&page, &slug, now, &output_dir)?;
    tracing::info!(path = %page_path.display(), "Newsletter page written");
    println!("✓ HTML saved to: {}", page_path.display());

    if args.text {
        let text = NewsletterRenderer::to_plain_text(&document, 80);
        let text_path = NewsletterRenderer::save_text(&text, &slug, now, &output_dir)?;
        println!("✓ Text saved to: {}", text_path.display());
    }

    println!("\n✅ Done!");

    Ok(())
}

fn prompt_directive() -> Result<String> {
    print!("What would you like to change? ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_string())
}

fn select_session_file() -> Result<PathBuf> {
    let sessions = list_session_files(&default_sessions_dir()?)?;

    if sessions.is_empty() {
        anyhow::bail!("No saved newsletters found. Run generate-newsletter first.");
    }

    println!("Available newsletters:\n");
    for (i, (path, data)) in sessions.iter().enumerate() {
        let title = NewsletterRenderer::title(&data.document).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let updated = chrono::DateTime::parse_from_rfc3339(&data.updated_at)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|_| "unknown".to_string());

        println!("  {}) {} (updated: {})", i + 1, title, updated);
    }

    print!("\nSelect newsletter (1-{}): ", sessions.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let selection: usize = input
        .trim()
        .parse()
        .context("Invalid selection. Please enter a number.")?;

    if selection < 1 || selection > sessions.len() {
        anyhow::bail!("Selection out of range. Please choose 1-{}", sessions.len());
    }

    Ok(sessions[selection - 1].0.clone())
}

/// Session files are named `{slug}-{YYYY}-{MM}-{DD}-{HHMMSS}.json`
fn extract_slug(filename: &str) -> String {
    let stem = filename.strip_suffix(".json").unwrap_or(filename);
    let parts: Vec<&str> = stem.split('-').collect();

    if parts.len() > 4 {
        parts[..parts.len() - 4].join("-")
    } else {
        parts[0].to_string()
    }
}
