#![allow(dead_code)] // not every test binary exercises every fixture

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::StreamExt;
use uuid::Uuid;

use audita::broadcast::{ChatEvent, EventPublisher};
use audita::error::AppError;
use audita::llm::{ChatTurn, CompletionClient, TextStream};
use audita::models::report::ReportTree;
use audita::models::{Analysis, Audit, Chat, ChatState, Message, NewAnalysis, Role};
use audita::store::{ChatActivity, ConversationStore, ReportStore};

/// Scripted model provider: `complete` pops responses in call order,
/// `stream_chat` replays the configured fragment sequence once.
#[derive(Default)]
pub struct FakeLlm {
    completions: Mutex<VecDeque<Result<String, String>>>,
    stream: Mutex<Option<Vec<Result<String, String>>>>,
    pub complete_calls: Mutex<Vec<(String, String)>>,
}

impl FakeLlm {
    pub fn push_completion(&self, response: impl Into<String>) {
        self.completions
            .lock()
            .unwrap()
            .push_back(Ok(response.into()));
    }

    pub fn push_completion_error(&self, reason: impl Into<String>) {
        self.completions
            .lock()
            .unwrap()
            .push_back(Err(reason.into()));
    }

    pub fn set_stream(&self, fragments: Vec<Result<String, String>>) {
        *self.stream.lock().unwrap() = Some(fragments);
    }
}

#[async_trait]
impl CompletionClient for FakeLlm {
    async fn stream_chat(
        &self,
        _history: &[ChatTurn],
        _system_prompt: Option<&str>,
    ) -> Result<TextStream, AppError> {
        let fragments = self
            .stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| AppError::UpstreamProvider("connection refused".to_string()))?;
        Ok(futures::stream::iter(
            fragments
                .into_iter()
                .map(|fragment| fragment.map_err(AppError::UpstreamProvider)),
        )
        .boxed())
    }

    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        _max_tokens: u32,
    ) -> Result<String, AppError> {
        self.complete_calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no completion scripted".to_string()))
            .map_err(AppError::UpstreamProvider)
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<(String, ChatEvent)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(String, ChatEvent)> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, channel: &str, event: ChatEvent) {
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), event));
    }
}

/// In-memory stand-in for the Postgres store.
#[derive(Default)]
pub struct InMemoryStore {
    pub audits: Mutex<HashMap<Uuid, Audit>>,
    pub chats: Mutex<HashMap<Uuid, Chat>>,
    pub messages: Mutex<Vec<Message>>,
    pub analyses: Mutex<Vec<Analysis>>,
    pub report: Mutex<Option<(Uuid, ReportTree)>>,
    next_analysis_id: AtomicI64,
}

impl InMemoryStore {
    pub fn add_audit(&self) -> Audit {
        let audit = Audit {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            company_name: "Acme s.r.o.".to_string(),
            employee_count_limit: 50,
            description: "Employee satisfaction audit".to_string(),
            system_prompt: "You are an empathetic interviewer.".to_string(),
            instruction_prompt: String::new(),
            audit_data: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.audits.lock().unwrap().insert(audit.id, audit.clone());
        audit
    }

    pub fn add_chat(&self, audit_id: Uuid) -> Chat {
        let chat = Chat {
            id: Uuid::new_v4(),
            audit_id,
            state: ChatState::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.chats.lock().unwrap().insert(chat.id, chat.clone());
        chat
    }

    /// Appends a message a minute after the previous one so ordering by
    /// `created_at` is deterministic.
    pub fn add_message(&self, chat_id: Uuid, role: Role, content: &str, hidden: bool) -> Message {
        let mut messages = self.messages.lock().unwrap();
        let created_at = Utc::now() + Duration::minutes(messages.len() as i64);
        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            content: content.to_string(),
            role,
            hidden,
            created_at,
        };
        messages.push(message.clone());
        message
    }

    pub fn add_tagged_analysis(&self, chat_id: Uuid, summary: &str, tags: &str) -> Analysis {
        let analysis = Analysis {
            id: self.next_analysis_id.fetch_add(1, Ordering::SeqCst),
            chat_id,
            sentiment: Some(40),
            summary: Some(summary.to_string()),
            key_findings: Some("• finding".to_string()),
            tags: Some(tags.to_string()),
            topics: Some("pay".to_string()),
            customer_satisfaction: None,
            agent_effectiveness: None,
            improvement_suggestions: None,
            conversation_quality: None,
            created_at: Utc::now(),
        };
        self.analyses.lock().unwrap().push(analysis.clone());
        analysis
    }

    pub fn analyses_for(&self, chat_id: Uuid) -> Vec<Analysis> {
        self.analyses
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn committed_report(&self) -> Option<(Uuid, ReportTree)> {
        self.report.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.lock().unwrap().get(&chat_id).cloned())
    }

    async fn create_chat(&self, audit_id: Uuid) -> Result<Chat, AppError> {
        Ok(self.add_chat(audit_id))
    }

    async fn create_message(
        &self,
        chat_id: Uuid,
        role: Role,
        content: &str,
        hidden: bool,
    ) -> Result<Message, AppError> {
        Ok(self.add_message(chat_id, role, content, hidden))
    }

    async fn visible_history(&self, chat_id: Uuid) -> Result<Vec<Message>, AppError> {
        let mut history: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id && !m.hidden)
            .cloned()
            .collect();
        history.sort_by_key(|m| m.created_at);
        Ok(history)
    }

    async fn insert_analysis(&self, new: &NewAnalysis) -> Result<Analysis, AppError> {
        let analysis = Analysis {
            id: self.next_analysis_id.fetch_add(1, Ordering::SeqCst),
            chat_id: new.chat_id,
            sentiment: new.sentiment,
            summary: new.summary.clone(),
            key_findings: new.key_findings.clone(),
            tags: new.tags.clone(),
            topics: new.topics.clone(),
            customer_satisfaction: new.customer_satisfaction,
            agent_effectiveness: new.agent_effectiveness,
            improvement_suggestions: new.improvement_suggestions.clone(),
            conversation_quality: new.conversation_quality.clone(),
            created_at: Utc::now(),
        };
        self.analyses.lock().unwrap().push(analysis.clone());
        Ok(analysis)
    }

    async fn open_chat_activity(&self) -> Result<Vec<ChatActivity>, AppError> {
        let chats = self.chats.lock().unwrap();
        let messages = self.messages.lock().unwrap();
        let analyses = self.analyses.lock().unwrap();

        let mut rows = Vec::new();
        for chat in chats.values() {
            if chat.state != ChatState::Open {
                continue;
            }
            let visible: Vec<&Message> = messages
                .iter()
                .filter(|m| m.chat_id == chat.id && !m.hidden)
                .collect();
            if !visible.iter().any(|m| m.role == Role::User) {
                continue;
            }
            let last_message_at = visible.iter().map(|m| m.created_at).max().unwrap();
            let last_analysis_at = analyses
                .iter()
                .filter(|a| a.chat_id == chat.id)
                .map(|a| a.created_at)
                .max();
            rows.push(ChatActivity {
                chat_id: chat.id,
                last_message_at,
                last_analysis_at,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn audit_by_id(&self, audit_id: Uuid) -> Result<Option<Audit>, AppError> {
        Ok(self.audits.lock().unwrap().get(&audit_id).cloned())
    }

    async fn analyses_with_tags(&self, audit_id: Uuid) -> Result<Vec<Analysis>, AppError> {
        let chats = self.chats.lock().unwrap();
        let mut rows: Vec<Analysis> = self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.tags.is_some()
                    && chats
                        .get(&a.chat_id)
                        .map(|c| c.audit_id == audit_id)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        Ok(rows)
    }

    async fn replace_report(&self, audit_id: Uuid, tree: &ReportTree) -> Result<(), AppError> {
        *self.report.lock().unwrap() = Some((audit_id, tree.clone()));
        Ok(())
    }
}
