//! TOML-based ConversationRepository implementation

use crate::dto::ConversationV1_0_0;
use crate::paths::{MervinPaths, is_safe_component};
use crate::storage::AtomicTomlFile;
use anyhow::Context;
use async_trait::async_trait;
use mervin_core::conversation::{
    Conversation, ConversationListItem, ConversationRepository, ListFilter,
};
use mervin_core::{MervinError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each conversation as its own TOML file.
///
/// ```text
/// base_dir/
/// └── conversations/
///     └── <user_id>/
///         ├── <conversation_id>.toml
///         └── <conversation_id>.lock
/// ```
///
/// File I/O runs on the blocking pool so callers stay on the async executor.
#[derive(Debug, Clone)]
pub struct TomlConversationRepository {
    base_dir: PathBuf,
}

impl TomlConversationRepository {
    /// Creates a repository rooted at `base_dir`, creating the directory
    /// structure if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("conversations"))
            .context("Failed to create conversations directory")?;
        Ok(Self { base_dir })
    }

    /// Creates a repository at the default location (`~/.config/mervin`).
    pub fn default_location() -> anyhow::Result<Self> {
        let base_dir = MervinPaths::conversations_base()
            .map_err(|e| anyhow::anyhow!("Failed to get config directory: {}", e))?;
        Self::new(base_dir)
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf> {
        if !is_safe_component(user_id) {
            return Err(MervinError::persistence(format!(
                "invalid user id '{}'",
                user_id
            )));
        }
        Ok(self.base_dir.join("conversations").join(user_id))
    }

    fn conversation_file(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<AtomicTomlFile<ConversationV1_0_0>> {
        if !is_safe_component(conversation_id) {
            return Err(MervinError::persistence(format!(
                "invalid conversation id '{}'",
                conversation_id
            )));
        }
        let path = self
            .user_dir(user_id)?
            .join(format!("{}.toml", conversation_id));
        Ok(AtomicTomlFile::new(path))
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MervinError::internal(format!("storage task failed: {}", e)))?
}

fn list_dir(dir: &Path, filter: &ListFilter) -> Result<Vec<ConversationListItem>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }

        // One unreadable file must not hide the rest of the history.
        match AtomicTomlFile::<ConversationV1_0_0>::new(path.clone()).load() {
            Ok(Some(dto)) => match dto.into_domain() {
                Ok(conversation) => {
                    let item = conversation.to_list_item();
                    if filter.matches(&item) {
                        items.push(item);
                    }
                }
                Err(e) => tracing::warn!(target: "history", "Skipping {}: {}", path.display(), e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(target: "history", "Skipping {}: {}", path.display(), e),
        }
    }

    Ok(items)
}

#[async_trait]
impl ConversationRepository for TomlConversationRepository {
    async fn find_by_id(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>> {
        let file = self.conversation_file(user_id, conversation_id)?;
        let dto = blocking(move || Ok(file.load()?)).await?;

        match dto {
            Some(dto) if dto.user_id != user_id => Err(MervinError::persistence(format!(
                "conversation {} belongs to another user",
                conversation_id
            ))),
            Some(dto) => dto.into_domain().map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        let file = self.conversation_file(&conversation.user_id, &conversation.conversation_id)?;
        let dto = ConversationV1_0_0::from(conversation.clone());

        tracing::debug!(
            target: "history",
            "Writing conversation {} ({} turns) to {}",
            dto.conversation_id,
            dto.messages.len(),
            file.path().display()
        );

        blocking(move || Ok(file.save(&dto)?)).await
    }

    async fn delete(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        let file = self.conversation_file(user_id, conversation_id)?;
        blocking(move || {
            file.remove()?;
            let _ = fs::remove_file(file.path().with_extension("lock"));
            Ok(())
        })
        .await
    }

    async fn list(&self, user_id: &str, filter: &ListFilter) -> Result<Vec<ConversationListItem>> {
        let dir = self.user_dir(user_id)?;
        let filter = filter.clone();
        blocking(move || list_dir(&dir, &filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mervin_core::conversation::Turn;
    use tempfile::TempDir;

    fn conversation(id: &str, category: &str, pinned: bool) -> Conversation {
        Conversation {
            conversation_id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("Conversation {}", id),
            category: category.to_string(),
            messages: vec![Turn::user("Hola")],
            is_pinned: pinned,
            ai_model: "mervin-legacy".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_activity_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_find_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlConversationRepository::new(temp_dir.path()).unwrap();

        repo.save(&conversation("c1", "general", false)).await.unwrap();

        let found = repo.find_by_id("u1", "c1").await.unwrap().unwrap();
        assert_eq!(found.title, "Conversation c1");
        assert_eq!(found.messages.len(), 1);

        repo.delete("u1", "c1").await.unwrap();
        assert!(repo.find_by_id("u1", "c1").await.unwrap().is_none());
        repo.delete("u1", "c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_applies_filter_and_skips_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlConversationRepository::new(temp_dir.path()).unwrap();

        repo.save(&conversation("c1", "general", false)).await.unwrap();
        repo.save(&conversation("c2", "estimate", true)).await.unwrap();
        fs::write(
            temp_dir.path().join("conversations/u1/broken.toml"),
            "not = [valid",
        )
        .unwrap();

        let all = repo.list("u1", &ListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let pinned = repo
            .list(
                "u1",
                &ListFilter {
                    category: None,
                    pinned_only: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].conversation_id, "c2");

        assert!(repo.list("nobody", &ListFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlConversationRepository::new(temp_dir.path()).unwrap();

        let err = repo.find_by_id("u1", "../secrets").await.unwrap_err();
        assert!(matches!(err, MervinError::Persistence(_)));
    }
}
