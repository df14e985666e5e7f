use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::CompletionClient;
use crate::models::{Analysis, NewAnalysis, Role};
use crate::prompts::Prompts;
use crate::store::ConversationStore;

const ANALYSIS_MAX_TOKENS: u32 = 2048;

/// Quality sub-scores as contracted with the model. Stored as a JSON string
/// on the Analysis row, returned structured to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationQuality {
    pub clarity: Option<i32>,
    pub speed: Option<i32>,
    pub solution: Option<i32>,
}

/// The model's contracted response shape. Every field is optional so a
/// partially filled object still normalizes instead of failing wholesale.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    sentiment: Option<i32>,
    summary: Option<String>,
    keyfindings: Option<Vec<String>>,
    tags: Option<Vec<String>>,
    topics: Option<Vec<String>>,
    customer_satisfaction: Option<i32>,
    agent_effectiveness: Option<i32>,
    improvement_suggestions: Option<Vec<String>>,
    conversation_quality: Option<ConversationQuality>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// The persisted row, with array fields already flattened to text.
    pub analysis: Analysis,
    pub quality: Option<ConversationQuality>,
}

/// Runs one structured assessment of a finished (or in-flight) conversation:
/// one JSON-only model call, strict parse, normalized Analysis row.
pub struct ChatAnalysisEngine {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn ConversationStore>,
}

impl ChatAnalysisEngine {
    pub fn new(llm: Arc<dyn CompletionClient>, store: Arc<dyn ConversationStore>) -> Self {
        ChatAnalysisEngine { llm, store }
    }

    pub async fn analyze(&self, chat_id: Uuid) -> Result<AnalysisOutcome, AppError> {
        let chat = self
            .store
            .chat_by_id(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("chat {}", chat_id)))?;

        let history = self.store.visible_history(chat.id).await?;
        if !history.iter().any(|m| m.role == Role::User) {
            return Err(AppError::NoUserActivity(chat_id));
        }

        let transcript: String = history
            .iter()
            .map(|m| match m.role {
                Role::User => format!("Customer: {}", m.content),
                Role::Assistant => format!("Assistant: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let raw = self
            .llm
            .complete(Prompts::ANALYSIS_SYSTEM, &transcript, ANALYSIS_MAX_TOKENS)
            .await?;

        match parse_analysis(&raw) {
            Some(parsed) => {
                let quality = parsed.conversation_quality.clone();
                let conversation_quality = match &quality {
                    Some(q) => Some(serde_json::to_string(q).map_err(anyhow::Error::from)?),
                    None => None,
                };

                let new = NewAnalysis {
                    chat_id,
                    sentiment: parsed.sentiment,
                    summary: parsed.summary,
                    key_findings: parsed.keyfindings.as_deref().map(bullets),
                    tags: parsed.tags.as_deref().map(comma_join),
                    topics: parsed.topics.as_deref().map(comma_join),
                    customer_satisfaction: parsed.customer_satisfaction,
                    agent_effectiveness: parsed.agent_effectiveness,
                    improvement_suggestions: parsed.improvement_suggestions.as_deref().map(bullets),
                    conversation_quality,
                };
                let analysis = self.store.insert_analysis(&new).await?;
                info!("chat {}: analysis {} stored", chat_id, analysis.id);
                Ok(AnalysisOutcome { analysis, quality })
            }
            None => {
                // Persist an all-null marker row so the chat still counts as
                // analyzed for scheduling, then report the parse failure with
                // the raw response for diagnostics.
                warn!("chat {}: analysis response did not parse", chat_id);
                let marker = NewAnalysis {
                    chat_id,
                    ..Default::default()
                };
                self.store.insert_analysis(&marker).await?;
                Err(AppError::parse("chat analysis response", raw))
            }
        }
    }
}

/// Strict parse: the response must be a single JSON object matching the
/// contracted field types. Anything else is a failed analysis.
fn parse_analysis(raw: &str) -> Option<RawAnalysis> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// "• A\n• B" flattening for array-valued text fields.
fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn comma_join(items: &[String]) -> String {
    items.join(", ")
}
