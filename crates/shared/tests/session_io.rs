use std::fs;

use shared::{
    list_session_files, load_session, save_session, GenerationOptions, NewsArticle,
    NewsletterDocument, SessionData,
};

fn session(body: &str) -> SessionData {
    SessionData::new(
        GenerationOptions::with_topics(["AI"]),
        vec![NewsArticle {
            title: "T".to_string(),
            link: "http://x".to_string(),
            ..Default::default()
        }],
        NewsletterDocument::new(body),
    )
}

#[test]
fn test_save_then_load_session() {
    let dir = tempfile::tempdir().unwrap();
    let data = session("<h1>Hello</h1>");

    let path = save_session(&data, dir.path(), "acme-2026-02-01.json").unwrap();
    let loaded = load_session(&path).unwrap();

    assert_eq!(loaded.document, data.document);
    assert_eq!(loaded.articles, data.articles);
    assert_eq!(loaded.options.topics, vec!["AI"]);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_session(&dir.path().join("nope.json")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_load_rejects_unknown_version() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = session("<h1>Hello</h1>");
    data.version = "0.9".to_string();
    let path = save_session(&data, dir.path(), "old.json").unwrap();

    let err = load_session(&path).unwrap_err();
    assert!(err.to_string().contains("Unsupported session file version"));
}

#[test]
fn test_load_rejects_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_session(&session("   "), dir.path(), "empty.json").unwrap();

    assert!(load_session(&path).is_err());
}

#[test]
fn test_load_rejects_session_without_topics() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = session("<h1>Hello</h1>");
    data.options.topics = vec!["  ".to_string()];
    let path = save_session(&data, dir.path(), "no-topics.json").unwrap();

    let err = load_session(&path).unwrap_err();
    assert!(err.to_string().contains("contains no topics"));
}

#[test]
fn test_load_normalises_hand_edited_topics() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = session("<h1>Hello</h1>");
    data.options.topics = vec![" AI ".to_string(), "ai".to_string(), "Robotics".to_string()];
    let path = save_session(&data, dir.path(), "edited.json").unwrap();

    let loaded = load_session(&path).unwrap();
    assert_eq!(loaded.options.topics, vec!["AI", "Robotics"]);
}

#[test]
fn test_list_sessions_newest_first_and_skips_bad_files() {
    let dir = tempfile::tempdir().unwrap();

    let mut older = session("<h1>Older</h1>");
    older.updated_at = "2026-01-01T00:00:00+00:00".to_string();
    let mut newer = session("<h1>Newer</h1>");
    newer.updated_at = "2026-02-01T00:00:00+00:00".to_string();

    save_session(&older, dir.path(), "older.json").unwrap();
    save_session(&newer, dir.path(), "newer.json").unwrap();
    fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let files = list_session_files(dir.path()).unwrap();

    let bodies: Vec<_> = files
        .iter()
        .map(|(_, data)| data.document.body_html.as_str())
        .collect();
    assert_eq!(bodies, vec!["<h1>Newer</h1>", "<h1>Older</h1>"]);
}
