use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use reqmerge_core::merge::{merge, ConflictType};
use reqmerge_core::storage::JsonFileRemote;
use reqmerge_core::sync::{FixedChoiceResolver, RemoteCollections, ResolutionOutcome};
use reqmerge_core::{Collection, CollectionItem, ItemId, ResolutionChoice, SyncConfig};
use tempfile::tempdir;

use crate::cli::{CompletionShell, Preference};
use crate::commands::common::{
    format_conflict_line, format_merge_summary, load_state, read_collection, state_path,
    write_collection,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{apply_config_updates, format_config_lines};
use crate::commands::merge::run_merge;
use crate::commands::publish::run_publish;
use crate::commands::pull::run_pull;
use crate::commands::push::{push_with_resolver, run_push};
use crate::commands::resolve::run_resolve;
use crate::config::{CliConfig, RemoteSettings};
use crate::error::CliError;
use crate::resolver::{parse_answer, prompt_for_resolutions, Answer};

fn req(id: &str, name: &str) -> CollectionItem {
    let mut item = CollectionItem::request(name, format!("https://api.example.com/{id}"));
    item.set_id(ItemId::from(id));
    item
}

fn collection(items: Vec<CollectionItem>) -> Collection {
    Collection {
        name: "API".to_string(),
        items,
        ..Collection::default()
    }
}

fn names(collection: &Collection) -> Vec<String> {
    collection
        .items
        .iter()
        .map(|item| item.name().to_string())
        .collect()
}

fn settings(remote_dir: &Path) -> RemoteSettings {
    RemoteSettings {
        remote_dir: remote_dir.to_path_buf(),
        workspace: "team".to_string(),
        sync: SyncConfig::default(),
    }
}

fn rename_conflict() -> reqmerge_core::MergeResult {
    let base = collection(vec![req("a", "A"), req("b", "B")]);
    let local = collection(vec![req("a", "Foo"), req("b", "B local")]);
    let remote = collection(vec![req("a", "Bar")]);
    merge(&base, &local, &remote)
}

#[test]
fn test_preference_maps_to_resolution_choice() {
    assert_eq!(
        ResolutionChoice::from(Preference::Local),
        ResolutionChoice::KeepLocal
    );
    assert_eq!(
        ResolutionChoice::from(Preference::Remote),
        ResolutionChoice::KeepRemote
    );
    assert_eq!(
        ResolutionChoice::from(Preference::Both),
        ResolutionChoice::KeepBoth
    );
}

#[test]
fn test_state_path_sits_next_to_local_file() {
    assert_eq!(
        state_path(Path::new("/work/api.json")),
        PathBuf::from("/work/api.sync.json")
    );
}

#[test]
fn test_merge_summary_lists_conflicts() {
    let result = rename_conflict();
    let lines = format_merge_summary(&result);

    assert_eq!(lines[0], "0 auto-merged, 0 unchanged, 2 conflicts");
    assert!(lines[1].contains("update"));
    assert!(lines[1].contains("Foo"));
    assert!(lines[2].contains("delete-remote"));
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_conflict_line_shows_path_and_id() {
    let result = rename_conflict();
    let line = format_conflict_line(&result.conflicts[0]);
    assert!(line.ends_with("Foo  (a)"));
}

#[test]
fn test_parse_answer_accepts_short_and_long_forms() {
    assert_eq!(
        parse_answer(" L \n", ConflictType::Update),
        Some(Answer::Choose(ResolutionChoice::KeepLocal))
    );
    assert_eq!(
        parse_answer("remote", ConflictType::DeleteLocal),
        Some(Answer::Choose(ResolutionChoice::KeepRemote))
    );
    assert_eq!(
        parse_answer("b", ConflictType::Update),
        Some(Answer::Choose(ResolutionChoice::KeepBoth))
    );
    assert_eq!(parse_answer("q", ConflictType::Update), Some(Answer::Cancel));
    assert_eq!(parse_answer("maybe", ConflictType::Update), None);
}

#[test]
fn test_parse_answer_refuses_keep_both_on_deletes() {
    assert_eq!(parse_answer("both", ConflictType::DeleteRemote), None);
    assert_eq!(parse_answer("b", ConflictType::DeleteLocal), None);
}

#[test]
fn test_prompt_collects_one_choice_per_conflict() {
    let result = rename_conflict();
    let mut input = Cursor::new("x\nb\nb\nr\n");
    let mut output = Vec::new();

    let outcome =
        prompt_for_resolutions("api", &result.conflicts, &mut input, &mut output).unwrap();

    let ResolutionOutcome::Resolved(resolutions) = outcome else {
        panic!("expected resolutions");
    };
    assert_eq!(resolutions.len(), 2);
    assert_eq!(resolutions[0].choice, ResolutionChoice::KeepBoth);
    assert_eq!(resolutions[1].choice, ResolutionChoice::KeepRemote);

    let transcript = String::from_utf8(output).unwrap();
    assert!(transcript.starts_with("2 conflicts while saving api"));
    assert_eq!(transcript.matches("unrecognized answer").count(), 2);
}

#[test]
fn test_prompt_cancels_on_request_or_end_of_input() {
    let result = rename_conflict();

    let mut cancel = Cursor::new("c\n");
    let outcome =
        prompt_for_resolutions("api", &result.conflicts, &mut cancel, &mut Vec::new()).unwrap();
    assert_eq!(outcome, ResolutionOutcome::Cancelled);

    let mut eof = Cursor::new("l\n");
    let outcome =
        prompt_for_resolutions("api", &result.conflicts, &mut eof, &mut Vec::new()).unwrap();
    assert_eq!(outcome, ResolutionOutcome::Cancelled);
}

#[test]
fn test_config_updates_keep_unset_values() {
    let config = CliConfig {
        remote_dir: Some(PathBuf::from("/srv/remote")),
        workspace: Some("team".to_string()),
        sync: SyncConfig::default(),
    };

    let updated = apply_config_updates(config, None, Some(" ".to_string()), Some(3), None);
    assert_eq!(updated.remote_dir, Some(PathBuf::from("/srv/remote")));
    assert_eq!(updated.workspace.as_deref(), Some("team"));
    assert_eq!(updated.sync.max_save_attempts, 3);

    let lines = format_config_lines(&updated);
    assert_eq!(lines[0], "remote_dir: /srv/remote");
    assert_eq!(lines[3], "duplicate_suffix: \" (server)\"");
}

#[test]
fn test_completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("reqmerge"));
}

#[test]
fn test_merge_and_resolve_commands_write_files() {
    let tmp = tempdir().unwrap();
    let base = tmp.path().join("base.json");
    let local = tmp.path().join("local.json");
    let remote = tmp.path().join("remote.json");
    write_collection(&base, &collection(vec![req("a", "A")])).unwrap();
    write_collection(&local, &collection(vec![req("a", "Foo")])).unwrap();
    write_collection(&remote, &collection(vec![req("a", "Bar")])).unwrap();

    let result_path = tmp.path().join("result.json");
    run_merge(&base, &local, &remote, true, Some(&result_path)).unwrap();

    let resolutions_path = tmp.path().join("resolutions.json");
    std::fs::write(
        &resolutions_path,
        r#"[{"conflictId": "a", "choice": "keep-both"}]"#,
    )
    .unwrap();
    let resolved_path = tmp.path().join("resolved.json");
    run_resolve(
        &result_path,
        &resolutions_path,
        Some(&resolved_path),
        &SyncConfig::default(),
    )
    .unwrap();

    let resolved = read_collection(&resolved_path).unwrap();
    assert_eq!(names(&resolved), vec!["Foo", "Bar (server)"]);
}

#[test]
fn test_resolve_rejects_unknown_conflicts() {
    let tmp = tempdir().unwrap();
    let result_path = tmp.path().join("result.json");
    std::fs::write(
        &result_path,
        serde_json::to_string(&rename_conflict()).unwrap(),
    )
    .unwrap();
    let resolutions_path = tmp.path().join("resolutions.json");
    std::fs::write(
        &resolutions_path,
        r#"[{"conflictId": "zzz", "choice": "keep-local"}]"#,
    )
    .unwrap();

    let error = run_resolve(&result_path, &resolutions_path, None, &SyncConfig::default())
        .unwrap_err();
    assert!(matches!(error, CliError::Core(_)));
}

#[tokio::test]
async fn test_publish_pull_and_push_round_trip() {
    let tmp = tempdir().unwrap();
    let remote_dir = tmp.path().join("remote");
    let settings = settings(&remote_dir);

    let mine = tmp.path().join("mine.json");
    write_collection(&mine, &collection(vec![req("a", "A"), req("b", "B")])).unwrap();
    run_publish(&settings, "api", &mine).await.unwrap();

    let theirs = tmp.path().join("theirs.json");
    run_pull(&settings, "api", &theirs).await.unwrap();
    let state = load_state(&theirs).unwrap().unwrap();
    assert_eq!(state.version, "1");
    assert_eq!(state.workspace_id, "team");

    // Someone else pushes first.
    let mut their_copy = read_collection(&theirs).unwrap();
    their_copy.items[1].set_name("B theirs");
    write_collection(&theirs, &their_copy).unwrap();
    run_push(&settings, "api", &theirs, Some(Preference::Local))
        .await
        .unwrap();

    // Our push hits a stale version and merges cleanly.
    let mut my_copy = read_collection(&mine).unwrap();
    my_copy.items[0].set_name("A mine");
    write_collection(&mine, &my_copy).unwrap();
    run_push(&settings, "api", &mine, Some(Preference::Local))
        .await
        .unwrap();

    let stored = JsonFileRemote::new(&remote_dir)
        .load("team")
        .await
        .unwrap()
        .take("api")
        .unwrap();
    assert_eq!(stored.version, "3");
    assert_eq!(names(&stored.data), vec!["A mine", "B theirs"]);
    assert_eq!(read_collection(&mine).unwrap(), stored.data);
    assert_eq!(load_state(&mine).unwrap().unwrap().base, Some(stored.data));
}

#[tokio::test]
async fn test_push_resolves_conflicts_with_resolver() {
    let tmp = tempdir().unwrap();
    let remote_dir = tmp.path().join("remote");
    let settings = settings(&remote_dir);

    let mine = tmp.path().join("mine.json");
    write_collection(&mine, &collection(vec![req("a", "A")])).unwrap();
    run_publish(&settings, "api", &mine).await.unwrap();
    let theirs = tmp.path().join("theirs.json");
    run_pull(&settings, "api", &theirs).await.unwrap();

    write_collection(&theirs, &collection(vec![req("a", "Bar")])).unwrap();
    run_push(&settings, "api", &theirs, None).await.unwrap();

    write_collection(&mine, &collection(vec![req("a", "Foo")])).unwrap();
    let resolver = Arc::new(FixedChoiceResolver::new(ResolutionChoice::KeepBoth));
    push_with_resolver(&settings, "api", &mine, resolver.clone())
        .await
        .unwrap();

    assert_eq!(resolver.presented_count(), 1);
    let pushed = read_collection(&mine).unwrap();
    assert_eq!(names(&pushed), vec!["Foo", "Bar (server)"]);
}

#[tokio::test]
async fn test_push_requires_tracked_file() {
    let tmp = tempdir().unwrap();
    let settings = settings(&tmp.path().join("remote"));
    let untracked = tmp.path().join("untracked.json");
    write_collection(&untracked, &collection(Vec::new())).unwrap();

    let error = run_push(&settings, "api", &untracked, Some(Preference::Local))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::NotTracked(_)));
}

#[tokio::test]
async fn test_push_reports_deleted_collection() {
    let tmp = tempdir().unwrap();
    let remote_dir = tmp.path().join("remote");
    let settings = settings(&remote_dir);
    let mine = tmp.path().join("mine.json");
    write_collection(&mine, &collection(vec![req("a", "A")])).unwrap();
    run_publish(&settings, "api", &mine).await.unwrap();

    std::fs::remove_file(remote_dir.join("team").join("api.json")).unwrap();
    write_collection(&mine, &collection(vec![req("a", "A edited")])).unwrap();

    let error = run_push(&settings, "api", &mine, Some(Preference::Local))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Sync(_)));
    assert!(error.to_string().starts_with("sync failed"));
}
