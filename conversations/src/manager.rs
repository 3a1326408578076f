use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use shop_store::{
    ChatRole, Conversation, ConversationRepo, ConversationStatus, Locale, Message, MessageDraft,
    MessageRepo, StoreError, with_store_timeout,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConversationConfig;

/// Titles are cut at this many characters, not bytes.
const TITLE_MAX_CHARS: usize = 60;

/// Session-addressable chat threads over [`ConversationRepo`] /
/// [`MessageRepo`].
///
/// Every storage call runs under the configured deadline so a stalled store
/// surfaces as [`StoreError::Timeout`] instead of hanging the turn. Unlike
/// the search path, storage errors here always propagate to the caller.
pub struct ConversationManager {
    conversations: Arc<dyn ConversationRepo>,
    messages: Arc<dyn MessageRepo>,
    cfg: ConversationConfig,
}

impl ConversationManager {
    pub fn new(
        conversations: Arc<dyn ConversationRepo>,
        messages: Arc<dyn MessageRepo>,
        cfg: ConversationConfig,
    ) -> Self {
        Self {
            conversations,
            messages,
            cfg,
        }
    }

    /// Returns the conversation for `session_id`, creating an active one if
    /// none exists. An identified user adopting a guest session attaches
    /// their id to it.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        owner_id: Option<&str>,
        locale: Locale,
    ) -> Result<Conversation, StoreError> {
        let deadline = self.cfg.store_timeout;
        if let Some(mut existing) =
            with_store_timeout(deadline, self.conversations.find_by_session(session_id)).await?
        {
            if existing.owner_id.is_none()
                && let Some(owner) = owner_id
            {
                existing.owner_id = Some(owner.to_string());
                with_store_timeout(deadline, self.conversations.update(existing.clone())).await?;
            }
            return Ok(existing);
        }

        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            owner_id: owner_id.map(str::to_string),
            locale,
            status: ConversationStatus::Active,
            title: None,
            message_count: 0,
            last_message_at: None,
            created_at: Utc::now(),
        };
        match with_store_timeout(deadline, self.conversations.create(conversation.clone())).await {
            Ok(()) => {
                info!(target: "conversations::manager", session_id, id = %conversation.id, "created conversation");
                Ok(conversation)
            }
            // Lost a create race for the same session; the winner's row is
            // the one to use.
            Err(StoreError::Conflict(_)) => {
                with_store_timeout(deadline, self.conversations.find_by_session(session_id))
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend(format!("conversation for session {session_id} vanished"))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Persists `draft` as the next message, bumping the conversation's
    /// derived counters in the same operation. The first user message also
    /// becomes the conversation title.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        draft: MessageDraft,
    ) -> Result<Message, StoreError> {
        let deadline = self.cfg.store_timeout;
        let mut conversation =
            with_store_timeout(deadline, self.conversations.get(conversation_id))
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("conversation {conversation_id}")))?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: draft.role,
            content: draft.content,
            function_calls: draft.function_calls,
            function_results: draft.function_results,
            tokens_used: draft.tokens_used,
            seq: conversation.message_count + 1,
            created_at: Utc::now(),
        };
        with_store_timeout(deadline, self.messages.append(message.clone())).await?;

        conversation.message_count += 1;
        conversation.last_message_at = Some(message.created_at);
        if conversation.title.is_none() && message.role == ChatRole::User {
            conversation.title = Some(derive_title(&message.content));
        }
        with_store_timeout(deadline, self.conversations.update(conversation)).await?;

        debug!(
            target: "conversations::manager",
            conversation_id,
            seq = message.seq,
            role = ?message.role,
            "appended message"
        );
        Ok(message)
    }

    /// One page of history in chronological order. Storage pages
    /// most-recent-first; this reverses for delivery.
    pub async fn history(
        &self,
        conversation_id: &str,
        limit: usize,
        offset: usize,
        include_system: bool,
    ) -> Result<Vec<Message>, StoreError> {
        let mut page = with_store_timeout(
            self.cfg.store_timeout,
            self.messages.page(conversation_id, limit, offset, include_system),
        )
        .await?;
        page.reverse();
        Ok(page)
    }

    /// Total tokens spent across the conversation, from per-message counts.
    pub async fn token_usage(&self, conversation_id: &str) -> Result<u64, StoreError> {
        let messages =
            with_store_timeout(self.cfg.store_timeout, self.messages.all(conversation_id)).await?;
        Ok(messages
            .iter()
            .filter_map(|m| m.tokens_used)
            .map(u64::from)
            .sum())
    }

    /// A one-line statistical summary, cheap enough to prepend to every
    /// model prompt when the history is truncated. No model call involved.
    pub async fn summarize(&self, conversation_id: &str) -> Result<String, StoreError> {
        let messages =
            with_store_timeout(self.cfg.store_timeout, self.messages.all(conversation_id)).await?;
        if messages.is_empty() {
            return Ok("No prior messages.".to_string());
        }

        let mut product_lookups = 0usize;
        let mut policy_questions = 0usize;
        for call in messages.iter().flat_map(|m| m.function_calls.iter()) {
            if call.name == "search_knowledge" {
                policy_questions += 1;
            } else {
                product_lookups += 1;
            }
        }
        Ok(format!(
            "{} prior messages, {} about products, {} about policies.",
            messages.len(),
            product_lookups,
            policy_questions
        ))
    }

    pub async fn set_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<(), StoreError> {
        let deadline = self.cfg.store_timeout;
        let mut conversation =
            with_store_timeout(deadline, self.conversations.get(conversation_id))
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("conversation {conversation_id}")))?;
        conversation.status = status;
        with_store_timeout(deadline, self.conversations.update(conversation)).await
    }

    /// Removes the conversation and all of its messages. Returns how many
    /// messages went with it.
    pub async fn delete(&self, conversation_id: &str) -> Result<usize, StoreError> {
        let deadline = self.cfg.store_timeout;
        let removed = with_store_timeout(
            deadline,
            self.messages.delete_for_conversation(conversation_id),
        )
        .await?;
        with_store_timeout(deadline, self.conversations.delete(conversation_id)).await?;
        info!(target: "conversations::manager", conversation_id, removed, "deleted conversation");
        Ok(removed)
    }

    /// Retention sweep: drops archived conversations whose last activity is
    /// older than `days`. Returns how many conversations were removed.
    pub async fn cleanup_older_than(&self, days: i64) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let stale = with_store_timeout(
            self.cfg.store_timeout,
            self.conversations.list_archived_before(cutoff),
        )
        .await?;

        let mut removed = 0usize;
        for conversation in stale {
            match self.delete(&conversation.id).await {
                Ok(_) => removed += 1,
                // Keep sweeping; the next run retries whatever failed.
                Err(e) => {
                    warn!(
                        target: "conversations::manager",
                        id = %conversation.id,
                        "retention delete failed: {e}"
                    );
                }
            }
        }
        Ok(removed)
    }
}

/// First-user-message title: whitespace collapsed, cut on a char boundary.
fn derive_title(content: &str) -> String {
    let collapsed: Vec<&str> = content.split_whitespace().collect();
    let joined = collapsed.join(" ");
    if joined.chars().count() <= TITLE_MAX_CHARS {
        return joined;
    }
    let cut: String = joined.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shop_store::MemoryStore;

    use super::*;

    fn manager() -> (ConversationManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mgr = ConversationManager::new(
            store.clone(),
            store.clone(),
            ConversationConfig::default(),
        );
        (mgr, store)
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_session() {
        let (mgr, _store) = manager();
        let a = mgr.get_or_create("sess-1", None, Locale::En).await.unwrap();
        let b = mgr.get_or_create("sess-1", None, Locale::En).await.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn identified_user_adopts_guest_session() {
        let (mgr, _store) = manager();
        let guest = mgr.get_or_create("sess-2", None, Locale::En).await.unwrap();
        assert!(guest.owner_id.is_none());

        let adopted = mgr
            .get_or_create("sess-2", Some("cust-7"), Locale::En)
            .await
            .unwrap();
        assert_eq!(adopted.id, guest.id);
        assert_eq!(adopted.owner_id.as_deref(), Some("cust-7"));
    }

    #[tokio::test]
    async fn append_assigns_monotonic_seq_and_bumps_counters() {
        let (mgr, _store) = manager();
        let conv = mgr.get_or_create("sess-3", None, Locale::En).await.unwrap();

        for expected_seq in 1..=3u64 {
            let msg = mgr
                .append_message(&conv.id, MessageDraft::user(format!("m{expected_seq}")))
                .await
                .unwrap();
            assert_eq!(msg.seq, expected_seq);
        }

        let reloaded = mgr.get_or_create("sess-3", None, Locale::En).await.unwrap();
        assert_eq!(reloaded.message_count, 3);
        assert!(reloaded.last_message_at.is_some());
    }

    #[tokio::test]
    async fn first_user_message_titles_the_conversation() {
        let (mgr, _store) = manager();
        let conv = mgr.get_or_create("sess-4", None, Locale::Ar).await.unwrap();

        let long = "هل لديكم أنابيب بولي إيثيلين عالية الكثافة بمقاسات كبيرة متوفرة للشحن الفوري إلى جدة";
        mgr.append_message(&conv.id, MessageDraft::user(long))
            .await
            .unwrap();

        let titled = mgr.get_or_create("sess-4", None, Locale::Ar).await.unwrap();
        let title = titled.title.expect("title derived from first user message");
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 1);
        assert!(title.ends_with('…'));
        assert!(title.starts_with("هل لديكم"));

        // A later message must not retitle.
        mgr.append_message(&conv.id, MessageDraft::user("شكرا"))
            .await
            .unwrap();
        let again = mgr.get_or_create("sess-4", None, Locale::Ar).await.unwrap();
        assert_eq!(again.title, Some(title));
    }

    #[tokio::test]
    async fn history_is_chronological_and_paged() {
        let (mgr, _store) = manager();
        let conv = mgr.get_or_create("sess-5", None, Locale::En).await.unwrap();
        for i in 1..=5 {
            mgr.append_message(&conv.id, MessageDraft::user(format!("m{i}")))
                .await
                .unwrap();
        }

        let latest = mgr.history(&conv.id, 3, 0, false).await.unwrap();
        let contents: Vec<&str> = latest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);

        let older = mgr.history(&conv.id, 3, 3, false).await.unwrap();
        let contents: Vec<&str> = older.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn history_can_exclude_system_messages() {
        let (mgr, _store) = manager();
        let conv = mgr.get_or_create("sess-6", None, Locale::En).await.unwrap();
        mgr.append_message(&conv.id, MessageDraft::system("ctx"))
            .await
            .unwrap();
        mgr.append_message(&conv.id, MessageDraft::user("hi"))
            .await
            .unwrap();

        let visible = mgr.history(&conv.id, 10, 0, false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, "hi");

        let full = mgr.history(&conv.id, 10, 0, true).await.unwrap();
        assert_eq!(full.len(), 2);
    }

    #[tokio::test]
    async fn token_usage_sums_per_message_counts() {
        let (mgr, _store) = manager();
        let conv = mgr.get_or_create("sess-7", None, Locale::En).await.unwrap();

        let mut draft = MessageDraft::assistant("a");
        draft.tokens_used = Some(120);
        mgr.append_message(&conv.id, draft).await.unwrap();

        let mut draft = MessageDraft::assistant("b");
        draft.tokens_used = Some(80);
        mgr.append_message(&conv.id, draft).await.unwrap();

        // User messages without counts contribute nothing.
        mgr.append_message(&conv.id, MessageDraft::user("c"))
            .await
            .unwrap();

        assert_eq!(mgr.token_usage(&conv.id).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn delete_cascades_messages() {
        let (mgr, store) = manager();
        let conv = mgr.get_or_create("sess-8", None, Locale::En).await.unwrap();
        mgr.append_message(&conv.id, MessageDraft::user("a"))
            .await
            .unwrap();
        mgr.append_message(&conv.id, MessageDraft::assistant("b"))
            .await
            .unwrap();

        let removed = mgr.delete(&conv.id).await.unwrap();
        assert_eq!(removed, 2);

        assert!(
            ConversationRepo::get(&*store, &conv.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.all(&conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_archived_conversations() {
        let (mgr, store) = manager();

        let old = mgr.get_or_create("sess-old", None, Locale::En).await.unwrap();
        mgr.append_message(&old.id, MessageDraft::user("old"))
            .await
            .unwrap();
        mgr.set_status(&old.id, ConversationStatus::Archived)
            .await
            .unwrap();
        // Backdate the last activity past the retention window.
        let mut stale = ConversationRepo::get(&*store, &old.id)
            .await
            .unwrap()
            .unwrap();
        stale.last_message_at = Some(Utc::now() - ChronoDuration::days(120));
        ConversationRepo::update(&*store, stale).await.unwrap();

        let fresh = mgr.get_or_create("sess-new", None, Locale::En).await.unwrap();
        mgr.append_message(&fresh.id, MessageDraft::user("new"))
            .await
            .unwrap();

        let removed = mgr.cleanup_older_than(90).await.unwrap();
        assert_eq!(removed, 1);
        assert!(
            ConversationRepo::get(&*store, &old.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            ConversationRepo::get(&*store, &fresh.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn titles_cut_on_char_boundaries() {
        let short = derive_title("hello   world");
        assert_eq!(short, "hello world");

        let long: String = "م".repeat(200);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 1);
        assert!(title.ends_with('…'));
    }
}
