mod common;

use common::*;
use mervin_application::TurnOutcome;
use mervin_application::bootstrap::build_session_at;
use mervin_core::ChatMode;
use mervin_core::backend::AllowAllEntitlements;
use mervin_core::conversation::ListFilter;
use mervin_core::stream::StreamUpdate;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_conversation_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "user_id = \"crew-7\"\ndefault_mode = \"agent\"\nlanguage = \"en\"\n",
    )
    .unwrap();

    let backend = ScriptedBackend::new(vec![Script::Updates(vec![
        StreamUpdate::progress("Looking up lumber prices"),
        StreamUpdate::message("A 12x16 deck runs about"),
        StreamUpdate::complete("A 12x16 deck runs about $9,000."),
    ])]);
    let chat = build_session_at(temp_dir.path(), backend.clone(), Arc::new(AllowAllEntitlements))
        .unwrap();

    let outcome = chat.send_message("How much for a 12x16 deck?", Vec::new()).await.unwrap();
    let TurnOutcome::Completed { conversation_id, persisted, .. } = outcome.turn else {
        panic!("expected completion");
    };
    assert!(persisted);
    assert_eq!(backend.requests()[0].language, "en");

    let file = temp_dir
        .path()
        .join("conversations/crew-7")
        .join(format!("{}.toml", conversation_id));
    let raw = std::fs::read_to_string(&file).unwrap();
    assert!(raw.contains("schema_version = \"1.0.0\""));
    assert!(raw.contains("ai_model = \"mervin-agent\""));

    let restarted = build_session_at(
        temp_dir.path(),
        ScriptedBackend::new(Vec::new()),
        Arc::new(AllowAllEntitlements),
    )
    .unwrap();

    let list = restarted.list_conversations(&ListFilter::default()).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.iter().next().unwrap().title, "How much for a 12x16 deck?");

    restarted.select_conversation(&conversation_id).await.unwrap();
    let view = restarted.view().await;
    assert_eq!(view.mode, ChatMode::Agent);
    assert_eq!(view.turns.len(), 2);
    assert_eq!(view.turns[1].content, "A 12x16 deck runs about $9,000.");
    assert_eq!(open_turns(&view), 0);

    restarted.delete_conversation(&conversation_id).await.unwrap();
    assert!(!file.exists());
    assert!(restarted.view().await.turns.is_empty());
}
