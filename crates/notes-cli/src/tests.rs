use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use notes_core::auth::StaticAuthProvider;
use notes_core::models::Document;
use notes_core::store::{MemoryNoteStore, NoteStore};
use notes_core::{Note, NoteId, SortOrder};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::cli::{Cli, Commands};
use crate::commands::add::add_note;
use crate::commands::common::{
    default_editor, join_editor_text, normalize_content, normalize_note_identifier,
    resolve_note_id, split_editor_text,
};
use crate::commands::config::{
    apply_profile_init, mask_secret, missing_profile_fields, normalize_url, ProfileInit,
};
use crate::commands::delete::delete_note;
use crate::commands::edit::{edit_note, merge_edits};
use crate::commands::list::list_notes;
use crate::commands::show::show_note;
use crate::commands::watch::watch_notes;
use crate::config_profiles::CliProfile;
use crate::error::CliError;
use crate::presenter::OutputFormat;

const OWNER: &str = "user-1";

fn note(id: &str, title: &str, timestamp: i64) -> Note {
    Note {
        id: NoteId::new(id),
        title: title.to_string(),
        content: format!("{title} body"),
        owner_id: OWNER.to_string(),
        timestamp,
    }
}

fn seed(store: &MemoryNoteStore, id: &str, title: &str, content: &str, timestamp: i64) {
    let Value::Object(fields) = json!({
        "title": title,
        "content": content,
        "userId": OWNER,
        "timestamp": timestamp,
    }) else {
        unreachable!("json! object literal");
    };
    store.insert_document(Document::new(id, fields)).unwrap();
}

fn seeded_store() -> Arc<MemoryNoteStore> {
    let store = MemoryNoteStore::new();
    seed(&store, "0190aaaa1111", "Groceries", "milk, eggs", 1_000);
    seed(&store, "0190bbbb2222", "Work plan", "ship the release", 3_000);
    seed(&store, "0190bbbb3333", "books", "Dune", 2_000);
    Arc::new(store)
}

async fn stored_field(store: &MemoryNoteStore, id: &str, field: &str) -> Option<Value> {
    store
        .get(&NoteId::new(id))
        .await
        .unwrap()
        .and_then(|document| document.fields.get(field).cloned())
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn normalize_note_identifier_rejects_empty() {
    assert!(matches!(
        normalize_note_identifier("   "),
        Err(CliError::EmptyNoteId)
    ));
    assert_eq!(normalize_note_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn split_editor_text_uses_first_line_as_title() {
    assert_eq!(
        split_editor_text("Title\n\nline 1\nline 2\n"),
        ("Title".to_string(), "line 1\nline 2".to_string())
    );
    assert_eq!(
        split_editor_text("\n\nOnly title"),
        ("Only title".to_string(), String::new())
    );
    assert_eq!(
        split_editor_text(&join_editor_text("Round", "trip body")),
        ("Round".to_string(), "trip body".to_string())
    );
}

#[test]
fn resolve_note_id_supports_exact_and_prefix_id() {
    let notes = vec![
        note("0190aaaa1111", "a", 1),
        note("0190bbbb2222", "b", 2),
        note("0190bbbb", "c", 3),
    ];

    assert_eq!(
        resolve_note_id(&notes, "0190aaaa").unwrap(),
        NoteId::new("0190aaaa1111")
    );
    assert_eq!(
        resolve_note_id(&notes, "0190bbbb").unwrap(),
        NoteId::new("0190bbbb")
    );
}

#[test]
fn resolve_note_id_rejects_ambiguous_prefix() {
    let notes = vec![note("0190bbbb2222", "a", 1), note("0190bbbb3333", "b", 2)];

    let error = resolve_note_id(&notes, "0190bb").unwrap_err();
    let CliError::AmbiguousNoteId(message) = error else {
        panic!("expected ambiguous id error, got {error:?}");
    };
    assert!(message.contains("0190bbbb2222"));
    assert!(message.contains("0190bbbb3333"));
}

#[test]
fn resolve_note_id_rejects_missing_note() {
    let notes = vec![note("0190aaaa1111", "a", 1)];
    assert!(matches!(
        resolve_note_id(&notes, "ffff"),
        Err(CliError::NoteNotFound(query)) if query == "ffff"
    ));
}

#[test]
fn merge_edits_keeps_fields_without_flags() {
    let current = note("id", "Old title", 1);
    assert_eq!(
        merge_edits(&current, Some("New title".to_string()), None),
        ("New title".to_string(), "Old title body".to_string())
    );
    assert_eq!(
        merge_edits(&current, None, Some(String::new())),
        ("Old title".to_string(), String::new())
    );
}

#[test]
fn sort_flag_accepts_tokens() {
    let cli = Cli::try_parse_from(["notes", "list", "--sort", "title-desc", "--search", "pl"])
        .unwrap();
    let Commands::List { sort, search, json } = cli.command else {
        panic!("expected list command");
    };
    assert_eq!(sort, SortOrder::TitleDescending);
    assert_eq!(search.as_deref(), Some("pl"));
    assert!(!json);

    assert!(Cli::try_parse_from(["notes", "list", "--sort", "sideways"]).is_err());
}

#[test]
fn profile_flag_is_global() {
    let cli = Cli::try_parse_from(["notes", "watch", "--profile", "work"]).unwrap();
    assert_eq!(cli.profile.as_deref(), Some("work"));
    let Commands::Watch { sort, search } = cli.command else {
        panic!("expected watch command");
    };
    assert_eq!(sort, SortOrder::NewestFirst);
    assert_eq!(search, None);
}

#[test]
fn only_note_commands_are_exposed() {
    assert!(Cli::try_parse_from(["notes", "completions", "bash"]).is_err());
    assert!(Cli::try_parse_from(["notes", "show", "abc"]).is_ok());
}

#[test]
fn profile_init_prefers_explicit_values_over_environment() {
    let mut profile = CliProfile {
        firebase_project_id: Some("existing-project".to_string()),
        ..CliProfile::default()
    };
    apply_profile_init(
        &mut profile,
        ProfileInit {
            api_key: Some(" explicit-key ".to_string()),
            firestore_url: Some("http://localhost:8080/v1/".to_string()),
            ..ProfileInit::default()
        },
        |key| match key {
            "NOTES_FIREBASE_API_KEY" => Some("env-key".to_string()),
            "NOTES_POLL_INTERVAL_MS" => Some("750".to_string()),
            _ => None,
        },
    )
    .unwrap();

    assert_eq!(profile.firebase_api_key.as_deref(), Some("explicit-key"));
    assert_eq!(profile.firebase_project_id.as_deref(), Some("existing-project"));
    assert_eq!(
        profile.firestore_url.as_deref(),
        Some("http://localhost:8080/v1")
    );
    assert_eq!(profile.poll_interval_ms, Some(750));
    assert!(missing_profile_fields(&profile).is_empty());
}

#[test]
fn profile_init_rejects_bad_values() {
    let mut profile = CliProfile::default();
    let bad_url = apply_profile_init(
        &mut profile,
        ProfileInit {
            auth_emulator_url: Some("localhost:9099".to_string()),
            ..ProfileInit::default()
        },
        |_| None,
    );
    assert!(matches!(bad_url, Err(CliError::Config(_))));

    let zero_interval = apply_profile_init(
        &mut profile,
        ProfileInit {
            poll_interval_ms: Some(0),
            ..ProfileInit::default()
        },
        |_| None,
    );
    assert!(matches!(zero_interval, Err(CliError::Config(_))));
    assert_eq!(missing_profile_fields(&profile), vec!["api_key", "project_id"]);
}

#[test]
fn normalize_url_requires_http_scheme() {
    assert_eq!(
        normalize_url("firestore_url", "https://firestore.example.com/v1/").unwrap(),
        "https://firestore.example.com/v1"
    );
    assert!(normalize_url("firestore_url", "firestore.example.com").is_err());
}

#[test]
fn mask_secret_keeps_last_four_characters() {
    assert_eq!(mask_secret("AIzaSyExample1234"), "****1234");
    assert_eq!(mask_secret("abc"), "****");
}

#[tokio::test]
async fn list_notes_sorts_and_filters_as_json() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    list_notes(
        store,
        &auth,
        SortOrder::TitleAscending,
        Some("O"),
        OutputFormat::Json,
        &mut out,
    )
    .await
    .unwrap();

    let items: Vec<Value> = serde_json::from_slice(&out).unwrap();
    let titles: Vec<&str> = items
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["books", "Groceries", "Work plan"]);
}

#[tokio::test]
async fn list_notes_prints_placeholder_when_nothing_matches() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    list_notes(
        store,
        &auth,
        SortOrder::NewestFirst,
        Some("zebra"),
        OutputFormat::Text,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "No notes found.\n");
}

#[tokio::test]
async fn list_notes_fails_when_store_is_unreachable() {
    let store = seeded_store();
    store.fail_fetches(Some("offline")).unwrap();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = list_notes(
        store,
        &auth,
        SortOrder::NewestFirst,
        None,
        OutputFormat::Text,
        &mut out,
    )
    .await;

    assert!(matches!(result, Err(CliError::Reported)));
    assert!(out.is_empty());
}

#[tokio::test]
async fn commands_require_signed_in_user() {
    let auth = StaticAuthProvider::signed_out();
    let mut out = Vec::new();

    let result = list_notes(
        seeded_store(),
        &auth,
        SortOrder::NewestFirst,
        None,
        OutputFormat::Text,
        &mut out,
    )
    .await;

    assert!(matches!(
        result,
        Err(CliError::Core(notes_core::Error::NotSignedIn))
    ));
}

#[tokio::test]
async fn add_note_prints_new_id() {
    let store = Arc::new(MemoryNoteStore::new());
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let id = add_note(Arc::clone(&store), &auth, "  Title ", "", &mut out)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), format!("{id}\n"));
    assert_eq!(store.document_count().unwrap(), 1);
}

#[tokio::test]
async fn add_note_rejects_blank_note() {
    let store = Arc::new(MemoryNoteStore::new());
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = add_note(Arc::clone(&store), &auth, " ", "\n", &mut out).await;

    assert!(matches!(result, Err(CliError::EmptyNote)));
    assert_eq!(store.document_count().unwrap(), 0);
}

#[tokio::test]
async fn add_note_reports_store_failure() {
    let store = Arc::new(MemoryNoteStore::new());
    store.fail_writes(Some("permission denied")).unwrap();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = add_note(Arc::clone(&store), &auth, "Title", "Body", &mut out).await;

    assert!(matches!(result, Err(CliError::Reported)));
    assert!(out.is_empty());
    assert_eq!(store.document_count().unwrap(), 0);
}

#[tokio::test]
async fn edit_note_updates_by_prefix() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let id = edit_note(
        Arc::clone(&store),
        &auth,
        "0190aaaa",
        |current| {
            assert_eq!(current.title, "Groceries");
            Ok(merge_edits(current, None, Some("milk, eggs, bread".to_string())))
        },
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(id, NoteId::new("0190aaaa1111"));
    assert_eq!(String::from_utf8(out).unwrap(), "0190aaaa1111\n");
    assert_eq!(
        stored_field(&store, "0190aaaa1111", "content").await,
        Some(json!("milk, eggs, bread"))
    );
    assert_eq!(
        stored_field(&store, "0190aaaa1111", "title").await,
        Some(json!("Groceries"))
    );
}

#[tokio::test]
async fn edit_note_without_changes_does_not_write() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    edit_note(
        Arc::clone(&store),
        &auth,
        "0190aaaa1111",
        |current| Ok(merge_edits(current, None, None)),
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        stored_field(&store, "0190aaaa1111", "timestamp").await,
        Some(json!(1_000))
    );
}

#[tokio::test]
async fn edit_note_rejects_ambiguous_prefix_before_editing() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = edit_note(
        store,
        &auth,
        "0190bbbb",
        |_| panic!("editor must not open for an ambiguous id"),
        &mut out,
    )
    .await;

    assert!(matches!(result, Err(CliError::AmbiguousNoteId(_))));
}

#[tokio::test]
async fn edit_note_rejects_blank_result() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = edit_note(
        store,
        &auth,
        "0190aaaa",
        |_| Ok((" ".to_string(), String::new())),
        &mut out,
    )
    .await;

    assert!(matches!(result, Err(CliError::EmptyNote)));
}

#[tokio::test]
async fn delete_note_removes_by_exact_and_prefix_id() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);

    let mut out = Vec::new();
    delete_note(Arc::clone(&store), &auth, "0190aaaa1111", &mut out)
        .await
        .unwrap();
    assert_eq!(store.document_count().unwrap(), 2);

    let mut out = Vec::new();
    delete_note(Arc::clone(&store), &auth, "0190bbbb3", &mut out)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "0190bbbb3333\n");
    assert_eq!(store.document_count().unwrap(), 1);
}

#[tokio::test]
async fn delete_note_reports_store_failure() {
    let store = seeded_store();
    store.fail_writes(Some("offline")).unwrap();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = delete_note(Arc::clone(&store), &auth, "0190aaaa", &mut out).await;

    assert!(matches!(result, Err(CliError::Reported)));
    assert_eq!(store.document_count().unwrap(), 3);
}

#[tokio::test]
async fn show_note_uses_placeholders_for_empty_fields() {
    let store = seeded_store();
    seed(&store, "0190cccc4444", "", "", 4_000);
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    show_note(store, &auth, "0190cccc", OutputFormat::Text, &mut out)
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Untitled");
    assert!(lines[1].starts_with("0190cccc4444  "));
    assert_eq!(lines[3], "No content");
}

#[tokio::test]
async fn show_note_as_json_keeps_raw_fields() {
    let store = seeded_store();
    seed(&store, "0190cccc4444", "", "", 4_000);
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    show_note(store, &auth, "0190cccc4444", OutputFormat::Json, &mut out)
        .await
        .unwrap();

    let item: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(item["title"], json!(""));
    assert_eq!(item["display_title"], json!("Untitled"));
    assert_eq!(item["display_content"], json!("No content"));
    assert_eq!(item["timestamp"], json!(4_000));
}

#[tokio::test]
async fn watch_notes_renders_each_change_until_stopped() {
    let store = seeded_store();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let writer = Arc::clone(&store);
    let stop = async move {
        sleep(Duration::from_millis(50)).await;
        seed(&writer, "0190dddd5555", "Late arrival", "", 9_000);
        sleep(Duration::from_millis(50)).await;
        writer.interrupt_subscribers("connection reset").unwrap();
        seed(&writer, "0190eeee6666", "Later still", "", 10_000);
        sleep(Duration::from_millis(50)).await;
    };

    watch_notes(
        Arc::clone(&store),
        &auth,
        SortOrder::NewestFirst,
        Some("late"),
        &mut out,
        stop,
    )
    .await
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("-- 0 notes at "));
    assert!(text.contains("-- 1 note at "));
    assert!(text.contains("-- 2 notes at "));
    assert!(text.contains("Late arrival"));
    assert!(text.contains("Later still"));
    assert_eq!(store.subscriber_count().unwrap(), 0);
}

#[tokio::test]
async fn watch_notes_fails_when_listener_cannot_start() {
    let store = seeded_store();
    store.fail_subscriptions(Some("denied")).unwrap();
    let auth = StaticAuthProvider::signed_in(OWNER);
    let mut out = Vec::new();

    let result = watch_notes(
        store,
        &auth,
        SortOrder::NewestFirst,
        None,
        &mut out,
        std::future::pending(),
    )
    .await;

    assert!(matches!(result, Err(CliError::Reported)));
}
