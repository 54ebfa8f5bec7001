use anyhow::{Context, Result};
use chrono::DateTime;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::app_dir_name;
use crate::models::{SessionData, SESSION_VERSION};

/// Get the default directory for storing session files
pub fn default_sessions_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join(app_dir_name())
        .join("sessions");

    fs::create_dir_all(&data_dir).context("Failed to create sessions directory")?;

    Ok(data_dir)
}

/// Save a session to a JSON file in `dir`
pub fn save_session(data: &SessionData, dir: &Path, filename: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("Failed to create sessions directory")?;
    let filepath = dir.join(filename);

    let json = serde_json::to_string_pretty(data).context("Failed to serialize session data")?;

    fs::write(&filepath, json).context("Failed to write session file")?;

    Ok(filepath)
}

/// Load a session from a JSON file
pub fn load_session(filepath: &Path) -> Result<SessionData> {
    if !filepath.exists() {
        anyhow::bail!("Session file not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read session file: {}", filepath.display()))?;

    let mut data: SessionData = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse session JSON from {}. The file may be corrupted or not a valid session file.",
            filepath.display()
        )
    })?;

    if data.version != SESSION_VERSION {
        anyhow::bail!(
            "Unsupported session file version: {}. Expected {}. Please regenerate the newsletter.",
            data.version,
            SESSION_VERSION
        );
    }

    if data.document.body_html.trim().is_empty() {
        anyhow::bail!(
            "Session file {} contains no newsletter. The file may be incomplete.",
            filepath.display()
        );
    }

    data.options.normalize_topics();
    if data.options.topics.is_empty() {
        anyhow::bail!(
            "Session file {} contains no topics. The file may be incomplete.",
            filepath.display()
        );
    }

    Ok(data)
}

/// List all loadable session files in `dir`, newest first
pub fn list_session_files(dir: &Path) -> Result<Vec<(PathBuf, SessionData)>> {
    let mut files = Vec::new();

    if dir.exists() {
        for entry in fs::read_dir(dir).context("Failed to read sessions directory")? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match load_session(&path) {
                    Ok(data) => files.push((path, data)),
                    Err(e) => {
                        tracing::warn!("Could not load {}: {:#}", path.display(), e);
                    }
                }
            }
        }
    }

    files.sort_by(|a, b| {
        let time_a = DateTime::parse_from_rfc3339(&a.1.updated_at).ok();
        let time_b = DateTime::parse_from_rfc3339(&b.1.updated_at).ok();
        time_b.cmp(&time_a)
    });

    Ok(files)
}
