//! File round-trips through the CLI entry points

use copythat_cli::{load_document, ping, read_report, run_sync, summarize, SyncArgs};
use copythat_core::{Document, PLACEHOLDER_TEXT};
use copythat_test_utils::{frame, missing_font_text, text, DocumentBuilder};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_document(dir: &Path, builder: &DocumentBuilder) -> PathBuf {
    let path = dir.join("document.json");
    std::fs::write(&path, builder.snapshot().to_json_string().unwrap()).unwrap();
    path
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn landing_page() -> DocumentBuilder {
    DocumentBuilder::new()
        .page("Landing")
        .frame(
            "Hero",
            vec![text("{{greeting}}", "Lorem"), text("{{farewell}}", "Ipsum")],
        )
        .layer(missing_font_text("{{price}}", "$0"))
        .text("Footer", "© 2024")
}

async fn text_named(doc: &impl Document, name: &str) -> String {
    let node = doc.find_text_nodes_named(name).await.unwrap()[0];
    doc.characters(node).await.unwrap()
}

#[tokio::test]
async fn sync_writes_output_snapshot() {
    let dir = TempDir::new().unwrap();
    let document = write_document(dir.path(), &landing_page());
    let data = write_file(dir.path(), "data.json", r#"{"greeting": "Hello", "price": 12}"#);
    let output = dir.path().join("synced.json");

    let outcome = run_sync(&SyncArgs {
        document: document.clone(),
        data,
        output: Some(output.clone()),
        ..SyncArgs::default()
    })
    .await
    .unwrap();

    assert_eq!(outcome.replaced, 1);
    assert_eq!(outcome.not_found, 1);
    assert_eq!(outcome.missing_font, 1);
    assert!(summarize(&outcome).contains("[NOT_IN_AIRTABLE] {{farewell}}"));

    let synced = load_document(&output).unwrap();
    assert_eq!(text_named(&synced, "{{greeting}}").await, "Hello");
    assert_eq!(text_named(&synced, "{{farewell}}").await, PLACEHOLDER_TEXT);
    assert_eq!(text_named(&synced, "{{price}}").await, "$0");
    assert_eq!(text_named(&synced, "Footer").await, "© 2024");

    let original = load_document(&document).unwrap();
    assert_eq!(text_named(&original, "{{greeting}}").await, "Lorem");
}

#[tokio::test]
async fn sync_in_place_then_read_report() {
    let dir = TempDir::new().unwrap();
    let document = write_document(dir.path(), &landing_page());
    let data = write_file(dir.path(), "data.json", r#"{"greeting": "Hello"}"#);

    run_sync(&SyncArgs {
        document: document.clone(),
        data,
        ..SyncArgs::default()
    })
    .await
    .unwrap();

    let report = read_report(&document).await.unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert!(lines[0].starts_with("{{copyThat.airtable}} report — synced "));
    assert!(lines.contains(&"Landing > {{farewell}} — String wasn't found in Airtable."));
    assert!(lines.contains(&"Landing > {{price}} — Missing font. Node not updated."));
}

#[tokio::test]
async fn config_file_and_flags_apply() {
    let dir = TempDir::new().unwrap();
    let builder = DocumentBuilder::new()
        .page("Home")
        .text("<<title>>", "T")
        .text("<<subtitle>>", "S");
    let document = write_document(dir.path(), &builder);
    let data = write_file(dir.path(), "data.json", r#"{"title": "Docs", "subtitle": ""}"#);
    let config = write_file(
        dir.path(),
        "copythat.toml",
        "[binding]\nopen = \"<<\"\nclose = \">>\"\n",
    );

    let outcome = run_sync(&SyncArgs {
        document: document.clone(),
        data,
        config: Some(config),
        replace_empty: true,
        max_concurrency: Some(1),
        ..SyncArgs::default()
    })
    .await
    .unwrap();

    assert_eq!(outcome.replaced, 2);
    let synced = load_document(&document).unwrap();
    assert_eq!(text_named(&synced, "<<title>>").await, "Docs");
    assert_eq!(text_named(&synced, "<<subtitle>>").await, "");
}

#[tokio::test]
async fn invalid_inputs_are_reported_with_context() {
    let dir = TempDir::new().unwrap();
    let document = write_document(dir.path(), &landing_page());
    let data = write_file(dir.path(), "data.json", r#"["greeting"]"#);

    let err = run_sync(&SyncArgs {
        document: document.clone(),
        data: data.clone(),
        ..SyncArgs::default()
    })
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Failed to parse data"));

    let err = run_sync(&SyncArgs {
        document,
        data,
        max_concurrency: Some(0),
        ..SyncArgs::default()
    })
    .await
    .unwrap_err();
    assert!(err.to_string().contains("max_concurrent_elements"));

    let missing = dir.path().join("absent.json");
    assert!(read_report(&missing).await.is_err());
}

#[tokio::test]
async fn report_requires_a_previous_sync() {
    let dir = TempDir::new().unwrap();
    let document = write_document(dir.path(), &landing_page());

    let err = read_report(&document).await.unwrap_err();
    assert!(err.to_string().contains("has no report layer"));
}

#[tokio::test]
async fn ping_appends_test_line() {
    let dir = TempDir::new().unwrap();
    let builder = DocumentBuilder::new()
        .page("Home")
        .frame("Card", vec![text("{{title}}", "T")]);
    let document = write_document(dir.path(), &builder);

    let line = ping(&document, "{{title}}").await.unwrap();
    assert_eq!(
        line,
        "Home > {{title}} — Just testing to see if this works. Nothing to see here."
    );
    ping(&document, "{{title}}").await.unwrap();

    let report = read_report(&document).await.unwrap();
    assert_eq!(report.lines().filter(|l| *l == line).count(), 2);
    assert!(ping(&document, "{{absent}}").await.is_err());
}

#[test]
fn frames_survive_round_trip() {
    let dir = TempDir::new().unwrap();
    let builder = DocumentBuilder::new()
        .page("Home")
        .layer(frame("Outer", vec![frame("Inner", vec![text("{{x}}", "x")])]));
    let document = write_document(dir.path(), &builder);

    let doc = load_document(&document).unwrap();
    assert_eq!(&doc.snapshot().unwrap(), builder.snapshot());
}
