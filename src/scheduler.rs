use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::ChatAnalysisEngine;
use crate::error::AppError;
use crate::store::{ChatActivity, ConversationStore};

/// Picks the single chat most overdue for analysis. Designed to be invoked
/// repeatedly (cron or by hand), doing at most one unit of work per call.
/// Overlapping invocations are not serialized here; worst case the same chat
/// is analyzed twice, which is wasteful but harmless since Analysis rows are
/// append-only.
pub struct PendingWorkSelector {
    store: Arc<dyn ConversationStore>,
}

impl PendingWorkSelector {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        PendingWorkSelector { store }
    }

    pub async fn next_chat_for_analysis(&self) -> Result<Option<Uuid>, AppError> {
        let rows = self.store.open_chat_activity().await?;
        Ok(select_next(rows))
    }
}

/// The selection policy itself: among chats with user activity newer than
/// their last analysis (or never analyzed), pick the one with the oldest
/// last analysis, never-analyzed first, then the oldest last message.
pub fn select_next(mut rows: Vec<ChatActivity>) -> Option<Uuid> {
    rows.retain(|row| match row.last_analysis_at {
        Some(analyzed_at) => row.last_message_at > analyzed_at,
        None => true,
    });
    // None sorts before Some, so never-analyzed chats win ties
    rows.sort_by(|a, b| {
        a.last_analysis_at
            .cmp(&b.last_analysis_at)
            .then(a.last_message_at.cmp(&b.last_message_at))
    });
    rows.first().map(|row| row.chat_id)
}

/// One scheduling tick: select at most one pending chat and analyze it.
/// A parse failure still stored its marker row, so the tick counts the chat
/// as handled instead of failing the job.
pub async fn run_analysis_tick(
    selector: &PendingWorkSelector,
    engine: &ChatAnalysisEngine,
) -> Result<Option<Uuid>, AppError> {
    let Some(chat_id) = selector.next_chat_for_analysis().await? else {
        debug!("analysis tick: nothing pending");
        return Ok(None);
    };

    info!("analysis tick: analyzing chat {}", chat_id);
    match engine.analyze(chat_id).await {
        Ok(outcome) => {
            info!(
                "analysis tick: chat {} analyzed as {}",
                chat_id, outcome.analysis.id
            );
            Ok(Some(chat_id))
        }
        Err(AppError::Parse { context, .. }) => {
            warn!(
                "analysis tick: chat {} stored a failed-analysis marker ({})",
                chat_id, context
            );
            Ok(Some(chat_id))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn row(
        minutes_since_message: i64,
        minutes_since_analysis: Option<i64>,
    ) -> ChatActivity {
        let now = Utc::now();
        ChatActivity {
            chat_id: Uuid::new_v4(),
            last_message_at: now - Duration::minutes(minutes_since_message),
            last_analysis_at: minutes_since_analysis.map(|m| now - Duration::minutes(m)),
        }
    }

    #[test]
    fn never_analyzed_chats_win_over_stale_ones() {
        let never = row(10, None);
        let stale = row(10, Some(60));
        let expected = never.chat_id;
        assert_eq!(select_next(vec![stale, never]), Some(expected));
    }

    #[test]
    fn oldest_last_analysis_goes_first() {
        let older = row(5, Some(120));
        let newer = row(5, Some(30));
        let expected = older.chat_id;
        assert_eq!(select_next(vec![newer, older]), Some(expected));
    }

    #[test]
    fn ties_break_on_oldest_last_message() {
        let now = Utc::now();
        let analyzed_at = now - Duration::hours(2);
        let mut a = row(90, None);
        let mut b = row(30, None);
        a.last_analysis_at = Some(analyzed_at);
        b.last_analysis_at = Some(analyzed_at);
        let expected = a.chat_id;
        assert_eq!(select_next(vec![b, a]), Some(expected));
    }

    #[test]
    fn caught_up_chats_are_not_selected() {
        // analysis newer than the last message
        let caught_up = row(60, Some(5));
        assert_eq!(select_next(vec![caught_up]), None);
        assert_eq!(select_next(Vec::new()), None);
    }

    #[test]
    fn selection_does_not_repeat_after_a_fresh_analysis() {
        let mut chat = row(10, None);
        let picked = select_next(vec![chat.clone()]);
        assert_eq!(picked, Some(chat.chat_id));

        // analyze() appended a row just now; the chat is caught up
        chat.last_analysis_at = Some(Utc::now());
        assert_eq!(select_next(vec![chat]), None);
    }
}
